//! Framelens Core - memory profiling and storage optimization for tabular data
//!
//! Loads a CSV into an Arrow table, reports how much memory each column
//! takes, narrows column storage types, writes a column-filtered copy of the
//! source and renders an overview figure.

pub mod dataset;
pub mod export;
pub mod memory;
pub mod optimizer;
pub mod pipeline;
pub mod report;
pub mod stats;
pub mod types;
pub mod visualize;

pub use dataset::{Dataset, load_csv};
pub use export::{ExportSummary, FilteredExporter};
pub use memory::{ColumnStat, MemoryProfile, analyze_memory_usage, deep_memory_size};
pub use optimizer::TypeOptimizer;
pub use pipeline::{Pipeline, PipelineReport, file_size};
pub use report::{MemoryComparison, save_to_json};
pub use types::{ColumnKind, dtype_tag};
pub use visualize::Visualizer;
