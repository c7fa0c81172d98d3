use crate::error::{PipelineError, PipelineResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub row_count: usize,
    pub streaming_sum: i64,
    pub query_sum: i64,
    pub ruleset: String,
    pub field_query: String,
    pub source_doc: PathBuf,
    pub transformed_doc: PathBuf,
    pub parallel_aggregators: bool,
    pub completed_at: DateTime<Utc>,
}

impl RunReport {
    /// Save report to JSON file
    pub fn save(&self, file_path: impl AsRef<Path>) -> PipelineResult<()> {
        let file_path = file_path.as_ref();
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::Encoding(e.to_string()))?;
        fs::write(file_path, json)?;

        log::debug!("Saved run report to {}", file_path.display());
        Ok(())
    }

    /// Load report from JSON file
    pub fn load(file_path: impl AsRef<Path>) -> PipelineResult<Self> {
        let json = fs::read_to_string(file_path)?;
        serde_json::from_str(&json).map_err(|e| PipelineError::Parse(e.to_string()))
    }
}
