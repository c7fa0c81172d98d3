//! File persistence for the pre- and post-transform documents

use super::codec::{read_document, write_document};
use super::model::Document;
use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// The two named document slots a run reads and writes
#[derive(Debug, Clone)]
pub struct DocumentStore {
    source_path: PathBuf,
    transformed_path: PathBuf,
}

impl DocumentStore {
    pub fn new(source_path: impl Into<PathBuf>, transformed_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            transformed_path: transformed_path.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.source_doc_path.clone(),
            config.transformed_doc_path.clone(),
        )
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn transformed_path(&self) -> &Path {
        &self.transformed_path
    }

    pub fn write_source(&self, doc: &Document) -> PipelineResult<()> {
        save(&self.source_path, doc)
    }

    pub fn write_transformed(&self, doc: &Document) -> PipelineResult<()> {
        save(&self.transformed_path, doc)
    }

    pub fn read_source(&self) -> PipelineResult<Document> {
        read_document(self.open_source()?)
    }

    pub fn open_source(&self) -> PipelineResult<BufReader<File>> {
        Ok(BufReader::new(File::open(&self.source_path)?))
    }

    /// Fresh read handle on the post-transform document
    pub fn open_transformed(&self) -> PipelineResult<BufReader<File>> {
        Ok(BufReader::new(File::open(&self.transformed_path)?))
    }

    /// Drop a post-transform document left over from an earlier run
    pub fn remove_transformed(&self) -> PipelineResult<()> {
        match fs::remove_file(&self.transformed_path) {
            Ok(()) => {
                log::debug!("🗑️  Removed stale {}", self.transformed_path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn save(path: &Path, doc: &Document) -> PipelineResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut out = BufWriter::new(File::create(path)?);
    write_document(&mut out, doc)?;
    out.flush()?;

    log::info!("💾 Saved {}", path.display());
    Ok(())
}
