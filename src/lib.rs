//! rowxml - relational rows → XML → declarative restructure → dual aggregation
//!
//! ```text
//! SQLite 'numbers' → entries/entry/field (1.xml)
//!     ↓ rule set (config/ruleset.json)
//! entries/entry/@field (2.xml)
//!     ↓
//! streaming sum  ==  tree-query sum
//! ```

pub mod aggregator;
pub mod config;
pub mod document;
pub mod error;
pub mod pipeline;
pub mod row_source;
pub mod sqlite_pragma;
pub mod transform;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult, TransformError};
pub use pipeline::{PipelineRunner, RunReport};
