//! Aggregate evaluation metrics across independently-seeded experiment runs.
//!
//! Pipeline: [`collector`] reads each run log and hands its text to
//! [`parser`]; [`aggregate`] merges the per-run metrics into mean ± sample
//! standard deviation; [`report`] renders and persists the summary.
//! [`pipeline`] wires the stages together.

pub mod aggregate;
pub mod collector;
pub mod config;
pub mod parser;
pub mod pipeline;
pub mod report;
