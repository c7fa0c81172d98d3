//! Row source trait
//!
//! The relational store seen from the pipeline: a target that holds integer rows.

use crate::error::PipelineError;
use async_trait::async_trait;

/// Backend trait for the tabular store feeding the pipeline
#[async_trait]
pub trait RowSource: Send {
    /// Idempotently create the storage target and clear prior contents
    async fn ensure_schema(&mut self) -> Result<(), PipelineError>;

    /// Insert all values in one transaction; nothing is visible on failure
    async fn bulk_insert(&mut self, values: &[i64]) -> Result<(), PipelineError>;

    /// Every stored value, in creation order
    async fn fetch_all(&mut self) -> Result<Vec<i64>, PipelineError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}
