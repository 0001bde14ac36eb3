//! Common utilities and abstractions for the framelens project.
//!
//! This crate provides the error taxonomy and the pipeline configuration
//! shared by the rest of the workspace.

pub mod config;
pub mod error;

pub use config::{
    CATEGORICAL_RATIO_THRESHOLD, FILTER_CHUNK_ROWS, PipelineConfig, PipelineConfigBuilder,
    SELECTED_COLUMNS,
};
pub use error::{CommonError, Diagnose, ErrorCategory, ErrorContext, ErrorSeverity, Result};
