use std::io::{self, Write};

use colored::Colorize;

use super::{ColumnReport, GroupComparison, ReportError, Reporter};
use crate::stats::TestOutcome;

/// Verdict shown in the result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Differs,
    NoDifference,
    NotEnoughData,
    Failed,
}

impl Verdict {
    fn of(comparison: &GroupComparison, alpha: f64) -> Self {
        match (&comparison.outcome, comparison.outcome.p_value()) {
            (TestOutcome::Failed { .. }, _) => Verdict::Failed,
            (_, Some(p)) if p < alpha => Verdict::Differs,
            (_, Some(_)) => Verdict::NoDifference,
            (_, None) => Verdict::NotEnoughData,
        }
    }

    fn text(self) -> &'static str {
        match self {
            Verdict::Differs => "differs",
            Verdict::NoDifference => "no difference",
            Verdict::NotEnoughData => "not enough data",
            Verdict::Failed => "failed",
        }
    }
}

/// A reporter that prints a one-line-per-comparison summary to the terminal.
#[derive(Debug, Clone)]
pub struct TerminalReporter {
    /// Whether to use colors in output (defaults to true).
    use_colors: bool,
    alpha: f64,
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new(0.05)
    }
}

impl TerminalReporter {
    /// Create a new terminal reporter with colored output.
    pub fn new(alpha: f64) -> Self {
        Self {
            use_colors: true,
            alpha,
        }
    }

    /// Create a terminal reporter with color output disabled.
    pub fn without_colors(alpha: f64) -> Self {
        Self {
            use_colors: false,
            alpha,
        }
    }

    fn truncate(name: &str, width: usize) -> String {
        if name.chars().count() > width {
            let kept: String = name.chars().take(width - 3).collect();
            format!("{}...", kept)
        } else {
            name.to_string()
        }
    }

    fn format_p(p: Option<f64>) -> String {
        match p {
            Some(p) => format!("{:.4}", p),
            None => "-".to_string(),
        }
    }

    /// Format the result column, padded before coloring so ANSI codes do
    /// not disturb alignment.
    fn format_verdict(&self, verdict: Verdict) -> String {
        let text = format!("{:>16}", verdict.text());
        if !self.use_colors {
            return text;
        }
        match verdict {
            Verdict::Differs => text.green().bold().to_string(),
            Verdict::NoDifference => text.yellow().to_string(),
            Verdict::NotEnoughData => text.dimmed().to_string(),
            Verdict::Failed => text.red().bold().to_string(),
        }
    }

    fn print_header(&self, writer: &mut impl Write) -> io::Result<()> {
        writeln!(writer)?;
        let header = format!(
            "{:<32} {:<20} {:>8} {:>10} {:>16}",
            "Column", "Group", "Test", "p-value", "Result"
        );
        if self.use_colors {
            writeln!(writer, "{}", header.bold())?;
        } else {
            writeln!(writer, "{}", header)?;
        }
        writeln!(writer, "{}", "-".repeat(90))?;
        Ok(())
    }

    fn print_row(&self, writer: &mut impl Write, comparison: &GroupComparison) -> io::Result<()> {
        writeln!(
            writer,
            "{:<32} {:<20} {:>8} {:>10} {}",
            Self::truncate(&comparison.column, 32),
            Self::truncate(&comparison.group_by, 20),
            comparison.decision.as_str(),
            Self::format_p(comparison.outcome.p_value()),
            self.format_verdict(Verdict::of(comparison, self.alpha)),
        )
    }

    fn print_skipped(&self, writer: &mut impl Write, column: &str) -> io::Result<()> {
        let text = format!("{:>16}", "skipped");
        let verdict = if self.use_colors {
            text.dimmed().to_string()
        } else {
            text
        };
        writeln!(
            writer,
            "{:<32} {:<20} {:>8} {:>10} {}",
            Self::truncate(column, 32),
            "",
            "-",
            "-",
            verdict
        )
    }

    fn print_summary(&self, writer: &mut impl Write, reports: &[ColumnReport]) -> io::Result<()> {
        let mut differ = 0;
        let mut same = 0;
        let mut undetermined = 0;
        let mut skipped = 0;

        for report in reports {
            if let ColumnReport::Skipped { .. } = report {
                skipped += 1;
            }
            for comparison in report.comparisons() {
                match Verdict::of(comparison, self.alpha) {
                    Verdict::Differs => differ += 1,
                    Verdict::NoDifference => same += 1,
                    Verdict::NotEnoughData | Verdict::Failed => undetermined += 1,
                }
            }
        }

        writeln!(writer)?;
        writeln!(writer, "{}", "-".repeat(90))?;

        let summary_label = "Summary:";
        if self.use_colors {
            write!(writer, "{} ", summary_label.bold())?;
        } else {
            write!(writer, "{} ", summary_label)?;
        }

        let differ_text = format!("{} differ", differ);
        let same_text = format!("{} no difference", same);
        let undetermined_text = format!("{} undetermined", undetermined);
        let skipped_text = format!("{} skipped", skipped);

        if self.use_colors {
            writeln!(
                writer,
                "{}, {}, {}, {}",
                differ_text.green(),
                same_text.yellow(),
                undetermined_text.red(),
                skipped_text.dimmed()
            )?;
        } else {
            writeln!(
                writer,
                "{}, {}, {}, {}",
                differ_text, same_text, undetermined_text, skipped_text
            )?;
        }

        writeln!(writer)?;
        Ok(())
    }

    fn write_all(&self, writer: &mut impl Write, reports: &[ColumnReport]) -> io::Result<()> {
        self.print_header(writer)?;
        for report in reports {
            match report {
                ColumnReport::Skipped { column, .. } => self.print_skipped(writer, column)?,
                ColumnReport::Analyzed { comparisons, .. } => {
                    for comparison in comparisons {
                        self.print_row(writer, comparison)?;
                    }
                }
            }
        }
        self.print_summary(writer, reports)
    }
}

impl Reporter for TerminalReporter {
    fn report(&self, reports: &[ColumnReport]) -> Result<(), ReportError> {
        let stdout = io::stdout();
        let mut writer = stdout.lock();
        self.write_all(&mut writer, reports)?;
        Ok(())
    }
}
