//! Locating and parsing the input dataset.

use std::io;
use std::path::PathBuf;

use farm_hypothesis_core::{Dataset, DatasetError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("No usable input file found in {}", .0.display())]
    NoUsableInput(PathBuf),
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: DatasetError,
    },
}

/// Provides the dataset a run analyzes.
pub trait DataSource {
    /// Path of the file that would be loaded.
    fn locate(&self) -> Result<PathBuf, SourceError>;

    /// Locate and parse the dataset.
    fn load(&self) -> Result<(PathBuf, Dataset), SourceError>;
}

mod directory;
pub use directory::DirectorySource;
