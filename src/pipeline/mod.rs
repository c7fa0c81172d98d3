//! # Pipeline runtime
//!
//! Drives one run end to end:
//!
//! 1. Seed the row source with `1..=N` (single transaction)
//! 2. Build `entries/entry/field` and save it as the pre-transform document
//! 3. Apply the rule set and save the post-transform document
//! 4. Sum `entry/@field` with the streaming and tree-query aggregators
//! 5. Cross-check the two sums and save a run report
//!
//! The first failing stage aborts the run. Documents written by completed
//! stages stay on disk.

pub mod report;
pub mod runner;

pub use report::RunReport;
pub use runner::{aggregate_stage, build_stage, transform_stage, AggregateSums, PipelineRunner};
