//! Pipeline configuration.
//!
//! The defaults reproduce the fixed file names and column list of the
//! analysis; the builder exists so callers (and tests) can redirect paths.

use std::path::PathBuf;

use tracing::debug;

use crate::error::{CommonError, Result};

/// Default input CSV path.
pub const DEFAULT_INPUT_FILE: &str = "bank_dataset.csv";
/// Default path of the per-column statistics of the loaded table.
pub const DEFAULT_COLUMN_STATS_FILE: &str = "column_stats_unoptimized.json";
/// Default path of the original-vs-optimized memory totals.
pub const DEFAULT_MEMORY_COMPARISON_FILE: &str = "memory_comparison.json";
/// Default path of the column-filtered CSV.
pub const DEFAULT_FILTERED_DATA_FILE: &str = "filtered_data.csv";
/// Default path of the six-panel figure.
pub const DEFAULT_PLOTS_FILE: &str = "plots.png";

/// Rows per chunk when re-reading the CSV for the filtered export.
pub const FILTER_CHUNK_ROWS: usize = 10_000;

/// A string column becomes categorical when `distinct / rows` is below this.
pub const CATEGORICAL_RATIO_THRESHOLD: f64 = 0.5;

/// Figure size in pixels.
pub const DEFAULT_FIGURE_SIZE: (u32, u32) = (1500, 1000);

/// Columns written to the filtered CSV, in output order.
pub const SELECTED_COLUMNS: [&str; 10] = [
    "fraud_bool",
    "income",
    "name_email_similarity",
    "customer_age",
    "payment_type",
    "zip_count_4w",
    "employment_status",
    "credit_risk_score",
    "housing_status",
    "source",
];

/// Configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Source CSV.
    pub input_path: PathBuf,
    /// Per-column statistics before optimization.
    pub column_stats_path: PathBuf,
    /// Memory totals before and after optimization.
    pub memory_comparison_path: PathBuf,
    /// Per-column statistics after optimization, written only when set.
    pub optimized_stats_path: Option<PathBuf>,
    /// Column-filtered CSV.
    pub filtered_data_path: PathBuf,
    /// Six-panel PNG.
    pub plots_path: PathBuf,
    /// Columns kept by the filtered export, in output order.
    pub selected_columns: Vec<String>,
    /// Distinct-value ratio below which strings become categorical.
    pub categorical_threshold: f64,
    /// Rows per chunk for the filtered export.
    pub chunk_size: usize,
    /// Figure width and height in pixels.
    pub figure_size: (u32, u32),
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_FILE),
            column_stats_path: PathBuf::from(DEFAULT_COLUMN_STATS_FILE),
            memory_comparison_path: PathBuf::from(DEFAULT_MEMORY_COMPARISON_FILE),
            optimized_stats_path: None,
            filtered_data_path: PathBuf::from(DEFAULT_FILTERED_DATA_FILE),
            plots_path: PathBuf::from(DEFAULT_PLOTS_FILE),
            selected_columns: SELECTED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            categorical_threshold: CATEGORICAL_RATIO_THRESHOLD,
            chunk_size: FILTER_CHUNK_ROWS,
            figure_size: DEFAULT_FIGURE_SIZE,
        }
    }
}

impl PipelineConfig {
    /// Check that the configuration can drive a run.
    pub fn validate(&self) -> Result<()> {
        if self.selected_columns.is_empty() {
            return Err(CommonError::configuration_error(
                "selected column list must not be empty",
            ));
        }
        if self.chunk_size == 0 {
            return Err(CommonError::configuration_error(
                "chunk size must be greater than zero",
            ));
        }
        if !(self.categorical_threshold > 0.0 && self.categorical_threshold <= 1.0) {
            return Err(CommonError::configuration_error(format!(
                "categorical threshold must be in (0, 1], got {}",
                self.categorical_threshold
            )));
        }
        if self.figure_size.0 == 0 || self.figure_size.1 == 0 {
            return Err(CommonError::configuration_error(format!(
                "figure size must be non-zero, got {}x{}",
                self.figure_size.0, self.figure_size.1
            )));
        }
        Ok(())
    }
}

/// Builder for creating pipeline configurations.
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    /// Set the source CSV.
    pub fn input_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.input_path = path.into();
        self
    }

    /// Set the path of the unoptimized column statistics.
    pub fn column_stats_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.column_stats_path = path.into();
        self
    }

    /// Set the path of the memory comparison report.
    pub fn memory_comparison_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.memory_comparison_path = path.into();
        self
    }

    /// Also write the optimized column statistics to this path.
    pub fn optimized_stats_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.optimized_stats_path = Some(path.into());
        self
    }

    /// Set the path of the filtered CSV.
    pub fn filtered_data_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.filtered_data_path = path.into();
        self
    }

    /// Set the path of the figure.
    pub fn plots_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.plots_path = path.into();
        self
    }

    /// Place every output file inside `dir` under its default name.
    pub fn output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        let dir = dir.into();
        self.config.column_stats_path = dir.join(DEFAULT_COLUMN_STATS_FILE);
        self.config.memory_comparison_path = dir.join(DEFAULT_MEMORY_COMPARISON_FILE);
        self.config.filtered_data_path = dir.join(DEFAULT_FILTERED_DATA_FILE);
        self.config.plots_path = dir.join(DEFAULT_PLOTS_FILE);
        self
    }

    /// Set the columns kept by the filtered export.
    pub fn selected_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.selected_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the categorical threshold.
    pub fn categorical_threshold(mut self, threshold: f64) -> Self {
        self.config.categorical_threshold = threshold;
        self
    }

    /// Set the rows per chunk of the filtered export.
    pub fn chunk_size(mut self, rows: usize) -> Self {
        self.config.chunk_size = rows;
        self
    }

    /// Set the figure size in pixels.
    pub fn figure_size(mut self, width: u32, height: u32) -> Self {
        self.config.figure_size = (width, height);
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        debug!("Built pipeline configuration: {:?}", self.config);
        Ok(self.config)
    }
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fixed_file_names() {
        let config = PipelineConfig::default();
        assert_eq!(config.input_path, PathBuf::from("bank_dataset.csv"));
        assert_eq!(
            config.column_stats_path,
            PathBuf::from("column_stats_unoptimized.json")
        );
        assert_eq!(
            config.memory_comparison_path,
            PathBuf::from("memory_comparison.json")
        );
        assert_eq!(config.filtered_data_path, PathBuf::from("filtered_data.csv"));
        assert_eq!(config.plots_path, PathBuf::from("plots.png"));
        assert!(config.optimized_stats_path.is_none());
        assert_eq!(config.chunk_size, 10_000);
        assert_eq!(config.selected_columns.len(), 10);
        assert_eq!(config.selected_columns[0], "fraud_bool");
        assert_eq!(config.selected_columns[9], "source");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = PipelineConfigBuilder::new()
            .input_path("/data/in.csv")
            .output_dir("/tmp/out")
            .optimized_stats_path("/tmp/out/opt.json")
            .selected_columns(["a", "b"])
            .chunk_size(3)
            .build()
            .unwrap();

        assert_eq!(config.input_path, PathBuf::from("/data/in.csv"));
        assert_eq!(config.plots_path, PathBuf::from("/tmp/out/plots.png"));
        assert_eq!(
            config.optimized_stats_path,
            Some(PathBuf::from("/tmp/out/opt.json"))
        );
        assert_eq!(config.selected_columns, vec!["a", "b"]);
        assert_eq!(config.chunk_size, 3);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let empty: [&str; 0] = [];
        assert!(PipelineConfigBuilder::new()
            .selected_columns(empty)
            .build()
            .is_err());
        assert!(PipelineConfigBuilder::new().chunk_size(0).build().is_err());
        assert!(PipelineConfigBuilder::new()
            .categorical_threshold(0.0)
            .build()
            .is_err());
        assert!(PipelineConfigBuilder::new()
            .categorical_threshold(f64::NAN)
            .build()
            .is_err());
        assert!(PipelineConfigBuilder::new()
            .figure_size(0, 100)
            .build()
            .is_err());

        let err = PipelineConfigBuilder::new().chunk_size(0).build().unwrap_err();
        assert!(matches!(err, CommonError::ConfigurationError { .. }));
    }
}
