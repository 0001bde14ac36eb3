//! End-to-end analysis run.
//!
//! Steps run strictly in order and the first failure aborts the run.
//! Outputs written by earlier steps are left in place.

use std::fs;
use std::path::Path;

use framelens_common::{ErrorContext, PipelineConfig, Result};
use tracing::info;

use crate::dataset::load_csv;
use crate::export::{ExportSummary, FilteredExporter};
use crate::memory::{MemoryProfile, analyze_memory_usage};
use crate::optimizer::TypeOptimizer;
use crate::report::{MemoryComparison, save_to_json};
use crate::visualize::Visualizer;

/// What a pipeline run produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub input_bytes: u64,
    pub rows: usize,
    pub columns: usize,
    pub original: MemoryProfile,
    pub optimized: MemoryProfile,
    pub comparison: MemoryComparison,
    pub export: ExportSummary,
}

/// Drives load, analysis, optimization, export and plotting
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self) -> Result<PipelineReport> {
        let config = &self.config;
        config.validate()?;

        let input_bytes = file_size(&config.input_path)?;
        info!(
            "Reading {} ({} bytes)",
            config.input_path.display(),
            input_bytes
        );
        let dataset = load_csv(&config.input_path)?;
        let (rows, columns) = (dataset.num_rows(), dataset.num_columns());
        info!("Loaded {} rows x {} columns", rows, columns);

        let original = analyze_memory_usage(&dataset);
        save_to_json(&original.columns, &config.column_stats_path)?;
        info!(
            "Unoptimized memory usage: {} bytes, statistics in {}",
            original.total_bytes,
            config.column_stats_path.display()
        );

        let optimized_dataset =
            TypeOptimizer::new(config.categorical_threshold).optimize(dataset)?;
        let optimized = analyze_memory_usage(&optimized_dataset);
        let comparison = MemoryComparison::new(original.total_bytes, optimized.total_bytes);
        save_to_json(&comparison, &config.memory_comparison_path)?;
        info!(
            "Optimized memory usage: {} bytes ({} bytes saved)",
            comparison.optimized,
            comparison.saved_bytes()
        );
        if let Some(path) = &config.optimized_stats_path {
            save_to_json(&optimized.columns, path)?;
            info!("Optimized statistics in {}", path.display());
        }

        let export = FilteredExporter::new(config.selected_columns.iter().cloned())
            .with_chunk_size(config.chunk_size)
            .export(&config.input_path, &config.filtered_data_path)?;

        let (width, height) = config.figure_size;
        Visualizer::new(width, height).render(&optimized_dataset, &config.plots_path)?;

        info!("Pipeline finished");
        Ok(PipelineReport {
            input_bytes,
            rows,
            columns,
            original,
            optimized,
            comparison,
            export,
        })
    }
}

/// Size of a file on disk in bytes
pub fn file_size(path: impl AsRef<Path>) -> Result<u64> {
    let path = path.as_ref();
    let metadata =
        fs::metadata(path).with_io_context(|| format!("Failed to stat {}", path.display()))?;
    Ok(metadata.len())
}
