use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::stats::{DunnMatrix, TestDecision, TestOutcome, TukeyHsd};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Pairwise follow-up after a significant group effect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PostHoc {
    Tukey(TukeyHsd),
    Dunn(DunnMatrix),
    /// Fewer than two levels had complete rows.
    NotEnoughGroups,
    Failed { error: String },
}

impl fmt::Display for PostHoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostHoc::Tukey(table) => write!(f, "{}", table),
            PostHoc::Dunn(matrix) => write!(f, "{}", matrix),
            PostHoc::NotEnoughGroups => write!(f, "not enough groups."),
            PostHoc::Failed { error } => write!(f, "failed ({}).", error),
        }
    }
}

/// Result of testing one column against one grouping field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupComparison {
    pub column: String,
    pub group_by: String,
    pub decision: TestDecision,
    /// Normality of within-group deviations, when that basis drove the decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub residual_normality_p: Option<f64>,
    pub variance_p: Option<f64>,
    pub outcome: TestOutcome,
    pub post_hoc: Option<PostHoc>,
}

/// Everything reported for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ColumnReport {
    /// Too few values or too many missing; never tested.
    Skipped {
        column: String,
        n: usize,
        na_ratio: f64,
    },
    Analyzed {
        column: String,
        n: usize,
        na_ratio: f64,
        normality_p: Option<f64>,
        comparisons: Vec<GroupComparison>,
    },
}

impl ColumnReport {
    pub fn column(&self) -> &str {
        match self {
            ColumnReport::Skipped { column, .. } | ColumnReport::Analyzed { column, .. } => column,
        }
    }

    /// Group comparisons run for this column; empty when skipped.
    pub fn comparisons(&self) -> &[GroupComparison] {
        match self {
            ColumnReport::Skipped { .. } => &[],
            ColumnReport::Analyzed { comparisons, .. } => comparisons,
        }
    }
}

pub trait Reporter {
    fn report(&self, reports: &[ColumnReport]) -> Result<(), ReportError>;
}

mod json;
mod terminal;
mod text;
pub use json::JsonReporter;
pub use terminal::TerminalReporter;
pub use text::{render_block, render_report, TextReporter};
