//! Aggregators over the post-transform document
//!
//! # Architecture
//!
//! ```text
//! 2.xml ─┬→ sum_streaming()  (pull reader, one event buffer)
//!        └→ sum_by_query()   (full tree + path query)
//!                 ↓
//!           cross_check()
//! ```
//!
//! Both select the value attribute by name, so an extra attribute ahead of
//! `field` cannot make them disagree.

pub mod path;
pub mod streaming;
pub mod tree_query;

pub use path::PathQuery;
pub use streaming::sum_streaming;
pub use tree_query::sum_by_query;

use crate::error::{PipelineError, PipelineResult};

/// Parse one value as a signed 64-bit decimal
pub(crate) fn parse_value(raw: &str) -> PipelineResult<i64> {
    raw.parse::<i64>().map_err(|e| {
        PipelineError::Parse(format!("{:?} is not a 64-bit integer: {}", raw, e))
    })
}

/// Add `value` to `total`, failing on overflow
pub(crate) fn accumulate(total: i64, value: i64) -> PipelineResult<i64> {
    total.checked_add(value).ok_or_else(|| {
        PipelineError::Parse(format!("sum overflows i64 ({} + {})", total, value))
    })
}

/// Compare the two aggregates; a mismatch is a pipeline defect
pub fn cross_check(streaming: i64, query: i64) -> PipelineResult<i64> {
    if streaming == query {
        log::info!("✅ Aggregates agree: {}", streaming);
        Ok(streaming)
    } else {
        log::error!(
            "❌ Aggregates disagree: streaming={} tree-query={}",
            streaming,
            query
        );
        Err(PipelineError::Consistency { streaming, query })
    }
}
