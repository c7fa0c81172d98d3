//! Stage-by-stage driver
//!
//! ```text
//! seed (RowSource) → build → 1.xml → transform → 2.xml → {streaming, tree-query} → cross_check
//! ```
//!
//! Each stage finishes and persists before the next one reads. Documents are
//! re-opened from disk by every consumer; no tree is shared between stages.

use super::report::RunReport;
use crate::aggregator::{cross_check, sum_by_query, sum_streaming, PathQuery};
use crate::config::PipelineConfig;
use crate::document::{build, Document, DocumentStore, ENTRY_ELEMENT};
use crate::error::{PipelineError, PipelineResult};
use crate::row_source::RowSource;
use crate::transform::{self, TransformRuleSet};

/// Results of the two aggregation passes, before cross-checking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateSums {
    pub streaming: i64,
    pub query: i64,
}

pub struct PipelineRunner<S: RowSource> {
    config: PipelineConfig,
    source: S,
    store: DocumentStore,
    ruleset: TransformRuleSet,
    query: PathQuery,
}

impl<S: RowSource> PipelineRunner<S> {
    /// Validate config, load the rule set and compile the path query
    ///
    /// Nothing touches the row source or documents until `run`.
    pub fn new(config: PipelineConfig, source: S) -> PipelineResult<Self> {
        config.validate()?;
        let ruleset = TransformRuleSet::load(&config.ruleset_path)?;
        Self::assemble(config, source, ruleset)
    }

    /// Same as `new` with an in-code rule set
    pub fn with_ruleset(
        config: PipelineConfig,
        source: S,
        ruleset: TransformRuleSet,
    ) -> PipelineResult<Self> {
        config.validate()?;
        Self::assemble(config, source, ruleset)
    }

    // Expects `config` already validated
    fn assemble(config: PipelineConfig, source: S, ruleset: TransformRuleSet) -> PipelineResult<Self> {
        ruleset.validate()?;
        let query = PathQuery::compile(&config.field_query)?;
        let store = DocumentStore::from_config(&config);

        Ok(Self {
            config,
            source,
            store,
            ruleset,
            query,
        })
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub async fn run(&mut self) -> PipelineResult<RunReport> {
        log::info!(
            "🚀 Starting run: {} rows, rule set '{}', query {}",
            self.config.row_count,
            self.ruleset.name,
            self.query
        );

        let rows = self.seed().await?;
        build_stage(&self.store, &rows)?;
        transform_stage(&self.store, &self.ruleset)?;

        let sums = aggregate_stage(&self.store, &self.query, self.config.parallel_aggregators).await?;
        cross_check(sums.streaming, sums.query)?;

        let report = RunReport {
            row_count: rows.len(),
            streaming_sum: sums.streaming,
            query_sum: sums.query,
            ruleset: self.ruleset.name.clone(),
            field_query: self.query.to_string(),
            source_doc: self.store.source_path().to_path_buf(),
            transformed_doc: self.store.transformed_path().to_path_buf(),
            parallel_aggregators: self.config.parallel_aggregators,
            completed_at: chrono::Utc::now(),
        };
        report.save(&self.config.report_path)?;

        log::info!("🏁 Run complete");
        Ok(report)
    }

    async fn seed(&mut self) -> PipelineResult<Vec<i64>> {
        let values: Vec<i64> = (1..=i64::from(self.config.row_count)).collect();

        self.source.ensure_schema().await?;
        self.source.bulk_insert(&values).await?;
        let rows = self.source.fetch_all().await?;

        log::info!(
            "🌱 Seeded {} rows via {} row source",
            rows.len(),
            self.source.backend_type()
        );
        Ok(rows)
    }
}

/// Build the pre-transform document from `rows` and persist it
pub fn build_stage(store: &DocumentStore, rows: &[i64]) -> PipelineResult<Document> {
    let doc = build(rows);
    store.write_source(&doc)?;
    log::info!("🧱 Pre-transform document: {} entries", rows.len());
    Ok(doc)
}

/// Re-read the persisted source document, apply `ruleset`, persist the result
///
/// A stale post-transform document is removed first, so a failed transform
/// leaves none behind.
pub fn transform_stage(store: &DocumentStore, ruleset: &TransformRuleSet) -> PipelineResult<Document> {
    store.remove_transformed()?;

    let source = store.read_source()?;
    let transformed = transform::apply(&source, ruleset)?;
    store.write_transformed(&transformed)?;

    log::info!(
        "🔁 Post-transform document: {} entries, rule set '{}'",
        transformed.count_elements(ENTRY_ELEMENT),
        ruleset.name
    );
    Ok(transformed)
}

/// Run both aggregators over the persisted post-transform document
///
/// With `parallel`, each pass runs on its own blocking task with its own file handle.
pub async fn aggregate_stage(
    store: &DocumentStore,
    query: &PathQuery,
    parallel: bool,
) -> PipelineResult<AggregateSums> {
    let sums = if parallel {
        let streaming_store = store.clone();
        let query_store = store.clone();
        let query = query.clone();

        let streaming = tokio::task::spawn_blocking(move || -> PipelineResult<i64> {
            sum_streaming(streaming_store.open_transformed()?)
        });
        let tree = tokio::task::spawn_blocking(move || -> PipelineResult<i64> {
            sum_by_query(query_store.open_transformed()?, &query)
        });

        let (streaming, tree) = tokio::join!(streaming, tree);
        AggregateSums {
            streaming: streaming.map_err(|e| PipelineError::Runtime(e.to_string()))??,
            query: tree.map_err(|e| PipelineError::Runtime(e.to_string()))??,
        }
    } else {
        AggregateSums {
            streaming: sum_streaming(store.open_transformed()?)?,
            query: sum_by_query(store.open_transformed()?, query)?,
        }
    };

    log::info!("📊 Streaming sum: {}", sums.streaming);
    log::info!("📊 Tree-query sum: {}", sums.query);
    Ok(sums)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use std::fs;
    use tempfile::tempdir;

    fn store_in(dir: &std::path::Path) -> DocumentStore {
        DocumentStore::new(dir.join("1.xml"), dir.join("2.xml"))
    }

    #[test]
    fn test_malformed_source_produces_no_transformed_document() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        // Leftover from an earlier successful run
        store.write_transformed(&build(&[1])).unwrap();

        fs::write(
            store.source_path(),
            "<entries><entry><field>1</field></entry><entry></entry></entries>",
        )
        .unwrap();

        let err = transform_stage(&store, &TransformRuleSet::entries_field()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Transform(TransformError::MissingChild { position: 2, .. })
        ));
        assert!(!store.transformed_path().exists());
    }

    #[test]
    fn test_transform_stage_keeps_every_entry() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let source = build_stage(&store, &[4, 5, 6]).unwrap();
        let transformed = transform_stage(&store, &TransformRuleSet::entries_field()).unwrap();

        assert_eq!(source.count_elements(ENTRY_ELEMENT), 3);
        assert_eq!(transformed.count_elements(ENTRY_ELEMENT), 3);
        assert_eq!(transformed.count_elements("field"), 0);

        let persisted = crate::document::read_document(store.open_transformed().unwrap()).unwrap();
        assert_eq!(persisted.count_elements(ENTRY_ELEMENT), 3);
    }

    #[tokio::test]
    async fn test_parallel_and_sequential_agree() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        let query = PathQuery::compile("//entries/entry/@field").unwrap();

        let values: Vec<i64> = (1..=100).collect();
        build_stage(&store, &values).unwrap();
        transform_stage(&store, &TransformRuleSet::entries_field()).unwrap();

        let sequential = aggregate_stage(&store, &query, false).await.unwrap();
        let parallel = aggregate_stage(&store, &query, true).await.unwrap();

        assert_eq!(sequential, AggregateSums { streaming: 5050, query: 5050 });
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_invalid_config_rejected_before_ruleset_load() {
        let dir = tempdir().unwrap();
        let mut config = PipelineConfig::default();
        config.source_doc_path = dir.path().join("same.xml");
        config.transformed_doc_path = dir.path().join("same.xml");
        // Would be an Io error if the rule set were loaded first
        config.ruleset_path = dir.path().join("missing.json");

        let source = crate::row_source::SqliteRowSource::open_in_memory().unwrap();
        let err = PipelineRunner::new(config.clone(), source).err().unwrap();
        assert!(matches!(err, PipelineError::Config(_)));

        let source = crate::row_source::SqliteRowSource::open_in_memory().unwrap();
        let err = PipelineRunner::with_ruleset(config, source, TransformRuleSet::entries_field())
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[tokio::test]
    async fn test_missing_transformed_document_is_io_error() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        let query = PathQuery::compile("//entries/entry/@field").unwrap();

        let err = aggregate_stage(&store, &query, false).await.unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));

        let err = aggregate_stage(&store, &query, true).await.unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
