use std::path::PathBuf;

use clap::Parser;
use framelens_common::config::{
    DEFAULT_COLUMN_STATS_FILE, DEFAULT_FILTERED_DATA_FILE, DEFAULT_INPUT_FILE,
    DEFAULT_MEMORY_COMPARISON_FILE, DEFAULT_PLOTS_FILE,
};
use framelens_common::{Diagnose, PipelineConfigBuilder};
use framelens_core::Pipeline;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Profile the memory of a CSV dataset, shrink its column types and plot it
#[derive(Debug, Parser)]
#[command(name = "framelens", version, about)]
struct Cli {
    /// Source CSV file with a header row
    #[arg(long, default_value = DEFAULT_INPUT_FILE)]
    input: PathBuf,

    /// Per-column memory statistics before optimization
    #[arg(long, default_value = DEFAULT_COLUMN_STATS_FILE)]
    column_stats: PathBuf,

    /// Memory totals before and after optimization
    #[arg(long, default_value = DEFAULT_MEMORY_COMPARISON_FILE)]
    memory_comparison: PathBuf,

    /// CSV restricted to the selected columns
    #[arg(long, default_value = DEFAULT_FILTERED_DATA_FILE)]
    filtered: PathBuf,

    /// Six-panel PNG figure
    #[arg(long, default_value = DEFAULT_PLOTS_FILE)]
    plots: PathBuf,

    /// Also write per-column statistics after optimization
    #[arg(long)]
    optimized_stats: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut builder = PipelineConfigBuilder::new()
        .input_path(cli.input)
        .column_stats_path(cli.column_stats)
        .memory_comparison_path(cli.memory_comparison)
        .filtered_data_path(cli.filtered)
        .plots_path(cli.plots);
    if let Some(path) = cli.optimized_stats {
        builder = builder.optimized_stats_path(path);
    }

    let result = builder.build().and_then(|config| Pipeline::new(config).run());
    match result {
        Ok(report) => {
            info!(
                "Memory usage went from {} to {} bytes across {} rows",
                report.comparison.original, report.comparison.optimized, report.rows
            );
            Ok(())
        }
        Err(e) => {
            error!(
                severity = ?e.severity(),
                category = ?e.category(),
                "{}",
                e
            );
            for line in e.context() {
                error!("  {}", line);
            }
            for suggestion in e.suggestions() {
                info!("hint: {}", suggestion);
            }
            Err(e.into())
        }
    }
}
