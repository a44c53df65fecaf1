use std::fs;
use std::path::{Path, PathBuf};

use farm_hypothesis_core::Dataset;
use tracing::{debug, info};

use super::{DataSource, SourceError};

/// A data source that takes the first eligible file from a directory.
///
/// Files are considered in directory listing order, which is platform
/// defined. Names in the skip list and anything that is not a regular file
/// are passed over.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
    skip_files: Vec<String>,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>, skip_files: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            skip_files,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn is_skipped(&self, name: &str) -> bool {
        self.skip_files.iter().any(|skip| skip == name)
    }

    fn read_error(&self, source: std::io::Error) -> SourceError {
        SourceError::Read {
            path: self.dir.clone(),
            source,
        }
    }
}

impl DataSource for DirectorySource {
    fn locate(&self) -> Result<PathBuf, SourceError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| self.read_error(e))?;

        for entry in entries {
            let entry = entry.map_err(|e| self.read_error(e))?;
            let path = entry.path();
            let name = entry.file_name();

            if self.is_skipped(&name.to_string_lossy()) {
                debug!(file = %path.display(), "Skipping listed file");
                continue;
            }
            if !path.is_file() {
                debug!(path = %path.display(), "Skipping non-file entry");
                continue;
            }
            return Ok(path);
        }

        Err(SourceError::NoUsableInput(self.dir.clone()))
    }

    fn load(&self) -> Result<(PathBuf, Dataset), SourceError> {
        let path = self.locate()?;
        info!(file = %path.display(), "Using data file");

        let text = fs::read_to_string(&path).map_err(|source| SourceError::Read {
            path: path.clone(),
            source,
        })?;
        let dataset = Dataset::from_json_str(&text).map_err(|source| SourceError::Parse {
            path: path.clone(),
            source,
        })?;

        debug!(
            rows = dataset.len(),
            columns = dataset.columns().len(),
            "Loaded dataset"
        );
        Ok((path, dataset))
    }
}
