//! farm-hypothesis: automatic group-comparison tests for farm measurements
//!
//! This library loads a tabular JSON dataset, picks ANOVA, an HC3-robust
//! ANOVA or Kruskal-Wallis for every numeric column from normality and
//! variance diagnostics, and writes a plain-text report with post-hoc tests.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod runner;
pub mod source;

// Re-export core types for convenience
pub use farm_hypothesis_core::report::{
    ColumnReport, GroupComparison, JsonReporter, PostHoc, ReportError, Reporter,
    TerminalReporter, TextReporter,
};
pub use farm_hypothesis_core::{Dataset, TestDecision, TestOutcome};

// Re-export main types from this crate
pub use analysis::analyze;
pub use cli::Cli;
pub use config::{Config, NormalityBasis};
pub use runner::{run, RunError, RunOutput};
pub use source::{DataSource, DirectorySource, SourceError};
