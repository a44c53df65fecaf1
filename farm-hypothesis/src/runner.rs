//! One end-to-end pass: load the dataset, analyze it, write the reports.

use std::path::PathBuf;

use farm_hypothesis_core::{ColumnReport, JsonReporter, ReportError, Reporter, TextReporter};
use thiserror::Error;
use tracing::info;

use crate::analysis::analyze;
use crate::config::Config;
use crate::source::{DataSource, DirectorySource, SourceError};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("Failed to write report {}: {source}", .path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: ReportError,
    },
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// The data file that was analyzed.
    pub input: PathBuf,
    /// Where the text report was written.
    pub report_path: PathBuf,
    pub reports: Vec<ColumnReport>,
}

/// Run the comparison with `config` and write the text report, plus the
/// JSON report when one is configured.
pub fn run(config: &Config) -> Result<RunOutput, RunError> {
    let source = DirectorySource::new(&config.input.dir, config.input.skip_files.clone());
    let (input, dataset) = source.load()?;

    info!(
        columns = dataset.columns().len(),
        rows = dataset.len(),
        "Analyzing dataset"
    );
    let reports = analyze(&dataset, &config.columns, &config.analysis);

    let report_path = config.output.report_path();
    write(
        &TextReporter::new(&report_path, config.analysis.alpha),
        &report_path,
        &reports,
    )?;
    info!(path = %report_path.display(), "Saved result");

    if let Some(json_path) = &config.output.json {
        write(&JsonReporter::new(json_path), json_path, &reports)?;
        info!(path = %json_path.display(), "Saved JSON result");
    }

    Ok(RunOutput {
        input,
        report_path,
        reports,
    })
}

fn write(
    reporter: &impl Reporter,
    path: &std::path::Path,
    reports: &[ColumnReport],
) -> Result<(), RunError> {
    reporter.report(reports).map_err(|source| RunError::Report {
        path: path.to_path_buf(),
        source,
    })
}
