//! Command-line interface for farm-hypothesis.

use crate::config::{Config, NormalityBasis};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "farm-hypothesis")]
#[command(about = "Compare farm measurements across groups with automatic test selection")]
#[command(version)]
pub struct Cli {
    /// Directory containing the input dataset
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Directory the text report is written to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Grouping column (repeatable, replaces the configured list)
    #[arg(short, long)]
    pub group: Vec<String>,

    /// Significance level for all tests (0.0-1.0)
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Minimum non-missing values for a column to be analyzed
    #[arg(long)]
    pub min_sample: Option<usize>,

    /// Largest fraction of missing values a column may have
    #[arg(long)]
    pub max_na_ratio: Option<f64>,

    /// Sample the normality test runs on
    #[arg(long, value_enum)]
    pub normality_basis: Option<NormalityBasis>,

    /// Also write the report as JSON to this path
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Disable colored terminal output
    #[arg(long)]
    pub no_color: bool,

    /// Do not print the summary table
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to config file (defaults to .farm-hypothesis.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Apply CLI overrides to the configuration.
    ///
    /// CLI arguments take precedence over config file values.
    /// Only non-None optional values will override the config.
    pub fn apply_to_config(&self, config: &mut Config) {
        if let Some(input_dir) = &self.input_dir {
            config.input.dir = input_dir.clone();
        }

        if let Some(output_dir) = &self.output_dir {
            config.output.dir = output_dir.clone();
        }

        if !self.group.is_empty() {
            config.columns.group = self.group.clone();
        }

        if let Some(alpha) = self.alpha {
            config.analysis.alpha = alpha;
        }

        if let Some(min_sample) = self.min_sample {
            config.analysis.min_sample = min_sample;
        }

        if let Some(max_na_ratio) = self.max_na_ratio {
            config.analysis.max_na_ratio = max_na_ratio;
        }

        if let Some(basis) = self.normality_basis {
            config.analysis.normality_basis = basis;
        }

        if let Some(json) = &self.json {
            config.output.json = Some(json.clone());
        }
    }
}
