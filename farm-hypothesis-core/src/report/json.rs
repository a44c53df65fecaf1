use std::fs;
use std::path::PathBuf;

use super::{ColumnReport, ReportError, Reporter};

/// Writes the structured report as pretty-printed JSON.
#[derive(Debug, Clone)]
pub struct JsonReporter {
    path: PathBuf,
}

impl JsonReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Reporter for JsonReporter {
    fn report(&self, reports: &[ColumnReport]) -> Result<(), ReportError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(reports)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}
