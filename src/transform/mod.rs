//! Structural transform
//!
//! The shape change lives in a rule set file, not in code: swapping
//! `config/ruleset.json` changes the output shape without touching the pipeline.

pub mod engine;
pub mod ruleset;

pub use engine::apply;
pub use ruleset::{PromoteRule, TransformRuleSet};
