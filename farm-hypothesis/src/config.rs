//! Configuration loading for farm-hypothesis.
//!
//! Supports loading configuration from TOML files. Every setting defaults to
//! the fixed behaviour of the comparison script, so running without a file
//! reads `/data/inputs` and writes `/data/outputs`.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for farm-hypothesis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the input dataset is found.
    pub input: InputConfig,
    /// Where reports are written.
    pub output: OutputConfig,
    /// Which columns group and which are left out.
    pub columns: ColumnsConfig,
    /// Thresholds for test selection.
    pub analysis: AnalysisConfig,
}

/// Configuration for locating the input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Directory holding the dataset; the first eligible file is used.
    pub dir: PathBuf,
    /// File names in the input directory that are never treated as data.
    pub skip_files: Vec<String>,
}

/// Configuration for report output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for the text report; created if absent.
    pub dir: PathBuf,
    /// File name of the text report.
    pub file_name: String,
    /// Optional path for a JSON copy of the report.
    pub json: Option<PathBuf>,
}

/// Configuration for column roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
    /// Categorical columns whose levels define the groups.
    pub group: Vec<String>,
    /// Identifier and metadata columns that are never tested.
    pub exclude: Vec<String>,
}

/// Which sample the normality test runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NormalityBasis {
    /// All non-missing values of the column.
    #[default]
    Column,
    /// Deviations from each group's mean.
    Residuals,
}

/// Configuration for test selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Minimum non-missing values for a column, and for a group to count in
    /// the variance and rank tests.
    pub min_sample: usize,
    /// Largest fraction of missing values a column may have.
    pub max_na_ratio: f64,
    /// Significance level for diagnostics, tests and post-hoc.
    pub alpha: f64,
    /// Sample used by the normality test.
    pub normality_basis: NormalityBasis,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/data/inputs"),
            skip_files: vec!["algoCustomData.json".to_string()],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/data/outputs"),
            file_name: "comparison_by_farm_type.txt".to_string(),
            json: None,
        }
    }
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            group: vec!["Kind of farm".to_string()],
            exclude: ["Farm ID", "Plot", "Time of sampling", "Soil type"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_sample: 4,
            max_na_ratio: 0.5,
            alpha: 0.05,
            normality_basis: NormalityBasis::Column,
        }
    }
}

/// Default configuration file name.
const DEFAULT_CONFIG_FILE: &str = ".farm-hypothesis.toml";

impl OutputConfig {
    /// Full path of the text report.
    pub fn report_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration from `.farm-hypothesis.toml` in the current
    /// directory, or use defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be parsed.
    pub fn load_or_default() -> Result<Config> {
        let path = Path::new(DEFAULT_CONFIG_FILE);

        if path.exists() {
            Self::load(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load configuration from the specified path, or try the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the specified file cannot be read or parsed.
    pub fn load_from(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(p) => Self::load(p),
            None => Self::load_or_default(),
        }
    }

    /// Check that thresholds are usable.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        let analysis = &self.analysis;
        if !(analysis.alpha > 0.0 && analysis.alpha < 1.0) {
            bail!(
                "alpha must be between 0 and 1 (exclusive), got {}",
                analysis.alpha
            );
        }
        if !(0.0..=1.0).contains(&analysis.max_na_ratio) {
            bail!(
                "max_na_ratio must be between 0 and 1, got {}",
                analysis.max_na_ratio
            );
        }
        if analysis.min_sample < 3 {
            bail!(
                "min_sample must be at least 3 for the normality test, got {}",
                analysis.min_sample
            );
        }
        if self.columns.group.is_empty() {
            bail!("at least one grouping column is required");
        }
        if self.output.file_name.is_empty() {
            bail!("output file name must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.input.dir, PathBuf::from("/data/inputs"));
        assert_eq!(config.input.skip_files, vec!["algoCustomData.json"]);
        assert_eq!(
            config.output.report_path(),
            PathBuf::from("/data/outputs/comparison_by_farm_type.txt")
        );
        assert!(config.output.json.is_none());
        assert_eq!(config.columns.group, vec!["Kind of farm"]);
        assert_eq!(
            config.columns.exclude,
            vec!["Farm ID", "Plot", "Time of sampling", "Soil type"]
        );
        assert_eq!(config.analysis.min_sample, 4);
        assert_eq!(config.analysis.max_na_ratio, 0.5);
        assert_eq!(config.analysis.alpha, 0.05);
        assert_eq!(config.analysis.normality_basis, NormalityBasis::Column);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_config() {
        let toml_content = r#"
[analysis]
alpha = 0.01

[columns]
group = ["Region"]
"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();

        // Overridden values
        assert_eq!(config.analysis.alpha, 0.01);
        assert_eq!(config.columns.group, vec!["Region"]);

        // Default values
        assert_eq!(config.analysis.min_sample, 4);
        assert_eq!(config.columns.exclude.len(), 4);
        assert_eq!(config.input.dir, PathBuf::from("/data/inputs"));
    }

    #[test]
    fn test_load_full_config() {
        let toml_content = r#"
[input]
dir = "in"
skip_files = ["meta.json", "README"]

[output]
dir = "out"
file_name = "report.txt"
json = "out/report.json"

[columns]
group = ["Kind of farm", "Region"]
exclude = ["Farm ID"]

[analysis]
min_sample = 5
max_na_ratio = 0.25
alpha = 0.1
normality_basis = "residuals"
"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.input.dir, PathBuf::from("in"));
        assert_eq!(config.input.skip_files, vec!["meta.json", "README"]);
        assert_eq!(config.output.report_path(), PathBuf::from("out/report.txt"));
        assert_eq!(config.output.json, Some(PathBuf::from("out/report.json")));
        assert_eq!(config.columns.group, vec!["Kind of farm", "Region"]);
        assert_eq!(config.columns.exclude, vec!["Farm ID"]);
        assert_eq!(config.analysis.min_sample, 5);
        assert_eq!(config.analysis.max_na_ratio, 0.25);
        assert_eq!(config.analysis.alpha, 0.1);
        assert_eq!(config.analysis.normality_basis, NormalityBasis::Residuals);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"this is not valid toml {{{{").unwrap();

        let result = Config::load(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_thresholds() {
        let mut config = Config::default();
        config.analysis.alpha = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.analysis.max_na_ratio = -0.1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.analysis.min_sample = 2;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.columns.group.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.analysis.alpha, parsed.analysis.alpha);
        assert_eq!(config.columns.group, parsed.columns.group);
        assert_eq!(config.output.file_name, parsed.output.file_name);
        assert_eq!(config.input.dir, parsed.input.dir);
    }
}
