//! Core types and utilities for farm-hypothesis.
//!
//! This crate provides the tabular dataset model, the group-comparison
//! statistics (normality, variance homogeneity, ANOVA, Kruskal-Wallis and
//! their post-hoc tests) and the reporters shared by the farm-hypothesis CLI.

pub mod dataset;
pub mod report;
pub mod stats;

// Re-export main types for convenience
pub use dataset::{Dataset, DatasetError, Group, Value};
pub use report::{
    ColumnReport, GroupComparison, JsonReporter, PostHoc, ReportError, Reporter,
    TerminalReporter, TextReporter,
};
pub use stats::{PValue, StatsError, TestDecision, TestOutcome};
