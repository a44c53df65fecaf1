use std::fs;
use std::path::{Path, PathBuf};

use super::{ColumnReport, GroupComparison, ReportError, Reporter};
use crate::stats::TestOutcome;

/// Writes the plain-text comparison report to a file.
#[derive(Debug, Clone)]
pub struct TextReporter {
    path: PathBuf,
    alpha: f64,
}

impl TextReporter {
    pub fn new(path: impl Into<PathBuf>, alpha: f64) -> Self {
        Self {
            path: path.into(),
            alpha,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Reporter for TextReporter {
    /// Create the parent directory if needed and overwrite the report file.
    fn report(&self, reports: &[ColumnReport]) -> Result<(), ReportError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, render_report(reports, self.alpha))?;
        Ok(())
    }
}

/// Shortest round-trip rendering that keeps a `.0` on integral values and
/// uses a signed two-digit exponent outside `[1e-4, 1e16)`.
fn format_value(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    let debug = format!("{:?}", x);
    match debug.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => debug,
    }
}

fn format_optional(p: Option<f64>) -> String {
    match p {
        Some(p) => format_value(p),
        None => "None".to_string(),
    }
}

fn conclusion(comparison: &GroupComparison, alpha: f64) -> String {
    let column = &comparison.column;
    let group = &comparison.group_by;
    match (&comparison.outcome, comparison.outcome.p_value()) {
        (TestOutcome::Failed { error }, _) => {
            format!("{} by {}: test failed ({}).", column, group, error)
        }
        (_, Some(p)) if p < alpha => {
            format!("{} differs between groups {} (p={:.4}).", column, group, p)
        }
        (_, Some(p)) => format!(
            "{} does not differ between groups {} (p={:.4}).",
            column, group, p
        ),
        (_, None) => format!("{} by {}: not enough data.", column, group),
    }
}

/// Render the text block for one column.
pub fn render_block(report: &ColumnReport, alpha: f64) -> String {
    match report {
        ColumnReport::Skipped { column, .. } => format!("[SKIP] {}: insufficient data\n", column),
        ColumnReport::Analyzed {
            column,
            n,
            na_ratio,
            normality_p,
            comparisons,
        } => {
            let mut lines = vec![
                format!("\n=== {} ===", column),
                format!(
                    "n={}, NA ratio={:.2}, normality_p={}",
                    n,
                    na_ratio,
                    format_optional(*normality_p)
                ),
            ];
            for comparison in comparisons {
                let mut summary = format!(
                    "{} by {}: test={}, variance_p={}, p={}",
                    column,
                    comparison.group_by,
                    comparison.decision,
                    format_optional(comparison.variance_p),
                    format_optional(comparison.outcome.p_value())
                );
                if let Some(p) = comparison.residual_normality_p {
                    summary.push_str(&format!(", residual normality_p={}", format_value(p)));
                }
                lines.push(summary);
                lines.push(conclusion(comparison, alpha));
                if let Some(post_hoc) = &comparison.post_hoc {
                    lines.push(format!("Post-hoc:\n{}", post_hoc));
                }
            }
            lines.join("\n")
        }
    }
}

/// Render every block in column order, separated by newlines.
pub fn render_report(reports: &[ColumnReport], alpha: f64) -> String {
    reports
        .iter()
        .map(|report| render_block(report, alpha))
        .collect::<Vec<_>>()
        .join("\n")
}
