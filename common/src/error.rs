//! Error handling for the framelens-common crate.

use thiserror::Error;

/// Common error type that abstracts over underlying library errors.
///
/// Every variant carries a human readable message and, optionally, the
/// library error that caused it so the full chain survives to the binary.
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO operation failed: {message}")]
    IoError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Parsing failed: {message}")]
    ParseError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Type conversion failed: {message}")]
    ConversionError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Serialization failed: {message}")]
    SerializationError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Rendering failed: {message}")]
    RenderError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Resource not found: {message}")]
    NotFoundError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Invalid configuration: {message}")]
    ConfigurationError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

/// Result type alias for common operations.
pub type Result<T> = std::result::Result<T, CommonError>;

/// Error severity levels for categorizing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Low severity - the input can be corrected and the run repeated
    Low,
    /// Medium severity - an output could not be produced
    Medium,
    /// High severity - the run cannot start or its environment is broken
    High,
    /// Critical severity - an invariant of the program itself was violated
    Critical,
}

/// Error category for grouping related error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// File system errors
    Infrastructure,
    /// Parsing, conversion, serialization and rendering errors
    DataProcessing,
    /// Configuration and setup errors
    Configuration,
    /// Missing files or columns
    Resource,
    /// Internal errors
    Internal,
}

/// Diagnostic information attached to an error.
pub trait Diagnose {
    /// Get the severity level of the error.
    fn severity(&self) -> ErrorSeverity;

    /// Get the category of the error.
    fn category(&self) -> ErrorCategory;

    /// Get additional context about the error.
    fn context(&self) -> Vec<String>;

    /// Get suggestions for resolving the error.
    fn suggestions(&self) -> Vec<String>;
}

impl CommonError {
    /// Create an IO error with a custom message and source error.
    pub fn io_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::IoError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a parse error with a custom message and source error.
    pub fn parse_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::ParseError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a conversion error with a custom message and source error.
    pub fn conversion_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::ConversionError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a serialization error with a custom message and source error.
    pub fn serialization_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a render error with a custom message and source error.
    pub fn render_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::RenderError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a not found error with a custom message.
    pub fn not_found_error<S: Into<String>>(message: S) -> Self {
        Self::NotFoundError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with a custom message.
    pub fn configuration_error<S: Into<String>>(message: S) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            source: None,
        }
    }

    /// Create an internal error with a custom message.
    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        Self::InternalError {
            message: message.into(),
            source: None,
        }
    }
}

impl Diagnose for CommonError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            CommonError::IoError { .. } => ErrorSeverity::High,
            CommonError::ParseError { .. } => ErrorSeverity::Low,
            CommonError::ConversionError { .. } => ErrorSeverity::Medium,
            CommonError::SerializationError { .. } => ErrorSeverity::Medium,
            CommonError::RenderError { .. } => ErrorSeverity::Medium,
            CommonError::NotFoundError { .. } => ErrorSeverity::Low,
            CommonError::ConfigurationError { .. } => ErrorSeverity::High,
            CommonError::InternalError { .. } => ErrorSeverity::Critical,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            CommonError::IoError { .. } => ErrorCategory::Infrastructure,
            CommonError::ParseError { .. } => ErrorCategory::DataProcessing,
            CommonError::ConversionError { .. } => ErrorCategory::DataProcessing,
            CommonError::SerializationError { .. } => ErrorCategory::DataProcessing,
            CommonError::RenderError { .. } => ErrorCategory::DataProcessing,
            CommonError::NotFoundError { .. } => ErrorCategory::Resource,
            CommonError::ConfigurationError { .. } => ErrorCategory::Configuration,
            CommonError::InternalError { .. } => ErrorCategory::Internal,
        }
    }

    fn context(&self) -> Vec<String> {
        let mut context = Vec::new();

        match self {
            CommonError::IoError { message, .. } => {
                context.push(format!("I/O operation context: {}", message));
                context.push("This may indicate a missing file or an unwritable path".to_string());
            }
            CommonError::ParseError { message, .. } => {
                context.push(format!("Parsing context: {}", message));
                context.push(
                    "This may indicate a malformed CSV or inconsistent column types".to_string(),
                );
            }
            CommonError::ConversionError { message, .. } => {
                context.push(format!("Conversion context: {}", message));
                context.push("This indicates a column could not change its storage type".to_string());
            }
            CommonError::SerializationError { message, .. } => {
                context.push(format!("Serialization context: {}", message));
                context.push("This indicates a report could not be encoded".to_string());
            }
            CommonError::RenderError { message, .. } => {
                context.push(format!("Rendering context: {}", message));
                context.push(
                    "This may indicate an unwritable image path or an unusable font".to_string(),
                );
            }
            CommonError::NotFoundError { message, .. } => {
                context.push(format!("Resource not found context: {}", message));
                context.push("This indicates a requested column or file does not exist".to_string());
            }
            CommonError::ConfigurationError { message, .. } => {
                context.push(format!("Configuration context: {}", message));
                context
                    .push("This indicates invalid or missing configuration parameters".to_string());
            }
            CommonError::InternalError { message, .. } => {
                context.push(format!("Internal error context: {}", message));
                context.push("This indicates an unexpected internal condition".to_string());
            }
        }

        context
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            CommonError::IoError { .. } => vec![
                "Check that the input file exists".to_string(),
                "Check file system permissions and disk space".to_string(),
            ],
            CommonError::ParseError { .. } => vec![
                "Verify the file is comma separated with a header row".to_string(),
                "Check that every row has the same number of fields".to_string(),
            ],
            CommonError::ConversionError { .. } => vec![
                "Inspect the column for values outside the expected range".to_string(),
            ],
            CommonError::SerializationError { .. } => vec![
                "Check that report values are finite numbers".to_string(),
            ],
            CommonError::RenderError { .. } => vec![
                "Verify the output directory exists and is writable".to_string(),
                "Build without the `fonts` feature to draw the figure without text".to_string(),
            ],
            CommonError::NotFoundError { .. } => vec![
                "Verify the column names in the CSV header".to_string(),
                "Check for leading or trailing whitespace in header fields".to_string(),
            ],
            CommonError::ConfigurationError { .. } => vec![
                "Review command line arguments".to_string(),
                "Check for missing required configuration parameters".to_string(),
            ],
            CommonError::InternalError { .. } => vec![
                "Report this issue to the development team".to_string(),
                "Re-run with RUST_LOG=debug for additional details".to_string(),
            ],
        }
    }
}

/// Context helpers for adding rich context to errors.
pub mod context {
    use super::*;

    /// Extension trait for adding context to Results.
    pub trait ErrorContext<T> {
        /// Add context to an error with specific error type.
        fn with_io_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String;

        /// Add context to an error with specific error type.
        fn with_parse_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String;

        /// Add context to an error with specific error type.
        fn with_conversion_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String;

        /// Add context to an error with specific error type.
        fn with_serialization_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String;
    }

    impl<T, E> ErrorContext<T> for std::result::Result<T, E>
    where
        E: Into<anyhow::Error>,
    {
        fn with_io_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String,
        {
            self.map_err(|e| CommonError::io_error_with_source(f(), e.into()))
        }

        fn with_parse_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String,
        {
            self.map_err(|e| CommonError::parse_error_with_source(f(), e.into()))
        }

        fn with_conversion_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String,
        {
            self.map_err(|e| CommonError::conversion_error_with_source(f(), e.into()))
        }

        fn with_serialization_context<F>(self, f: F) -> Result<T>
        where
            F: FnOnce() -> String,
        {
            self.map_err(|e| CommonError::serialization_error_with_source(f(), e.into()))
        }
    }
}

pub use context::ErrorContext;
