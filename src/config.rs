//! Pipeline configuration from environment variables
//!
//! Passed explicitly into every stage; nothing is read from process state after startup.

use crate::error::{PipelineError, PipelineResult};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_ROW_COUNT: u32 = 10;
pub const DEFAULT_FIELD_QUERY: &str = "//entries/entry/@field";

/// Configuration for a single pipeline run
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Path to SQLite database file
    pub db_path: PathBuf,

    /// Number of rows to seed (values 1..=N)
    pub row_count: u32,

    /// Pre-transform document (entries/entry/field)
    pub source_doc_path: PathBuf,

    /// Post-transform document (entries/entry/@field)
    pub transformed_doc_path: PathBuf,

    /// Declarative transform rule set (JSON)
    pub ruleset_path: PathBuf,

    /// Path expression used by the tree-query aggregator
    pub field_query: String,

    /// Run both aggregators on blocking tasks concurrently
    pub parallel_aggregators: bool,

    /// Where the run report is saved
    pub report_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/rowxml.db"),
            row_count: DEFAULT_ROW_COUNT,
            source_doc_path: PathBuf::from("data/1.xml"),
            transformed_doc_path: PathBuf::from("data/2.xml"),
            ruleset_path: PathBuf::from("config/ruleset.json"),
            field_query: DEFAULT_FIELD_QUERY.to_string(),
            parallel_aggregators: false,
            report_path: PathBuf::from("data/run_report.json"),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `ROWXML_DB_PATH` (default: data/rowxml.db)
    /// - `ROWXML_ROW_COUNT` (default: 10)
    /// - `ROWXML_SOURCE_DOC` (default: data/1.xml)
    /// - `ROWXML_TRANSFORMED_DOC` (default: data/2.xml)
    /// - `ROWXML_RULESET_PATH` (default: config/ruleset.json)
    /// - `ROWXML_FIELD_QUERY` (default: //entries/entry/@field)
    /// - `ROWXML_PARALLEL_AGGREGATORS` (default: false)
    /// - `ROWXML_REPORT_PATH` (default: data/run_report.json)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            db_path: env::var("ROWXML_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),

            row_count: parse_or_default("ROWXML_ROW_COUNT", defaults.row_count),

            source_doc_path: env::var("ROWXML_SOURCE_DOC")
                .map(PathBuf::from)
                .unwrap_or(defaults.source_doc_path),

            transformed_doc_path: env::var("ROWXML_TRANSFORMED_DOC")
                .map(PathBuf::from)
                .unwrap_or(defaults.transformed_doc_path),

            ruleset_path: env::var("ROWXML_RULESET_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ruleset_path),

            field_query: env::var("ROWXML_FIELD_QUERY").unwrap_or(defaults.field_query),

            parallel_aggregators: parse_or_default(
                "ROWXML_PARALLEL_AGGREGATORS",
                defaults.parallel_aggregators,
            ),

            report_path: env::var("ROWXML_REPORT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.report_path),
        }
    }

    /// Reject configurations that cannot possibly run
    pub fn validate(&self) -> PipelineResult<()> {
        let paths = [
            ("db_path", &self.db_path),
            ("source_doc_path", &self.source_doc_path),
            ("transformed_doc_path", &self.transformed_doc_path),
            ("ruleset_path", &self.ruleset_path),
            ("report_path", &self.report_path),
        ];

        for (name, path) in paths {
            if path.as_os_str().is_empty() {
                return Err(PipelineError::Config(format!("{} must not be empty", name)));
            }
        }

        if self.source_doc_path == self.transformed_doc_path {
            return Err(PipelineError::Config(
                "source and transformed documents must use different paths".to_string(),
            ));
        }

        if self.field_query.trim().is_empty() {
            return Err(PipelineError::Config("field_query must not be empty".to_string()));
        }

        Ok(())
    }
}

fn parse_or_default<T>(var: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Debug,
{
    match env::var(var) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("⚠️  Ignoring invalid {}={:?}, using {:?}", var, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both scenarios live in one test: env vars are process-global and tests run in parallel.
    #[test]
    fn test_config_from_env() {
        for var in [
            "ROWXML_DB_PATH",
            "ROWXML_ROW_COUNT",
            "ROWXML_SOURCE_DOC",
            "ROWXML_TRANSFORMED_DOC",
            "ROWXML_RULESET_PATH",
            "ROWXML_FIELD_QUERY",
            "ROWXML_PARALLEL_AGGREGATORS",
            "ROWXML_REPORT_PATH",
        ] {
            env::remove_var(var);
        }

        let config = PipelineConfig::from_env();
        assert_eq!(config.db_path, PathBuf::from("data/rowxml.db"));
        assert_eq!(config.row_count, 10);
        assert_eq!(config.source_doc_path, PathBuf::from("data/1.xml"));
        assert_eq!(config.transformed_doc_path, PathBuf::from("data/2.xml"));
        assert_eq!(config.field_query, "//entries/entry/@field");
        assert!(!config.parallel_aggregators);

        env::set_var("ROWXML_DB_PATH", "/tmp/test.db");
        env::set_var("ROWXML_ROW_COUNT", "25");
        env::set_var("ROWXML_PARALLEL_AGGREGATORS", "true");

        let config = PipelineConfig::from_env();
        assert_eq!(config.db_path, PathBuf::from("/tmp/test.db"));
        assert_eq!(config.row_count, 25);
        assert!(config.parallel_aggregators);

        // Garbage falls back to the default
        env::set_var("ROWXML_ROW_COUNT", "ten");
        assert_eq!(PipelineConfig::from_env().row_count, DEFAULT_ROW_COUNT);

        env::remove_var("ROWXML_DB_PATH");
        env::remove_var("ROWXML_ROW_COUNT");
        env::remove_var("ROWXML_PARALLEL_AGGREGATORS");
    }

    #[test]
    fn test_validate_rejects_shared_document_path() {
        let config = PipelineConfig {
            transformed_doc_path: PathBuf::from("data/1.xml"),
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
        assert!(PipelineConfig::default().validate().is_ok());
    }
}
