//! Error types for the installation dashboard pipeline.
//!
//! - [`CsvError`] - CSV reading and decoding errors
//! - [`MetricsError`] - schema errors raised by the metrics pipeline
//! - [`ConfigError`] - configuration loading and validation errors
//! - [`PipelineError`] - top-level error for a single upload
//! - [`ServerError`] - HTTP server errors
//!
//! Malformed individual cells are never errors: they coerce to zero inside
//! the pipeline. Only structural problems surface here.

use thiserror::Error;

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while reading an uploaded CSV.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// A row could not be read (bad quoting, invalid UTF-8 in a field...).
    #[error("Line {line}: {message}")]
    Malformed { line: u64, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        CsvError::Malformed {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Metrics Errors
// =============================================================================

/// Errors raised by the metrics pipeline.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MetricsError {
    /// One or more mapped columns are absent from the input schema.
    #[error("Missing required column(s): {}", .columns.join(", "))]
    MissingColumn { columns: Vec<String> },
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading a pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON.
    #[error("Config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config does not match the embedded schema.
    #[error("Invalid config: {}", .0.join("; "))]
    Invalid(Vec<String>),

    /// Unknown dedupe policy name.
    #[error("Unknown dedupe policy '{0}' (expected 'first-wins' or 'none')")]
    UnknownDedupe(String),

    /// Delimiter must be exactly one character.
    #[error("Invalid delimiter '{0}' (expected a single character)")]
    InvalidDelimiter(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level error for one dashboard computation.
///
/// Returned by [`crate::metrics::pipeline::dashboard_from_bytes`] and friends.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV reading error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Metrics error (missing columns).
    #[error("{0}")]
    Metrics(#[from] MetricsError),
}

impl PipelineError {
    /// Columns reported missing, if this is a schema error.
    pub fn missing_columns(&self) -> Option<&[String]> {
        match self {
            PipelineError::Metrics(MetricsError::MissingColumn { columns }) => Some(columns.as_slice()),
            PipelineError::Csv(_) => None,
        }
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
///
/// Per-request failures are answered with an error payload, not surfaced here.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Could not bind or serve.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for metrics operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let csv_err = CsvError::EmptyFile;
        let pipeline_err: PipelineError = csv_err.into();
        assert!(pipeline_err.to_string().contains("empty"));
        assert!(pipeline_err.missing_columns().is_none());

        let metrics_err = MetricsError::MissingColumn {
            columns: vec!["# Installed".into()],
        };
        let pipeline_err: PipelineError = metrics_err.into();
        assert!(pipeline_err.to_string().contains("# Installed"));
        assert_eq!(
            pipeline_err.missing_columns(),
            Some(&["# Installed".to_string()][..])
        );
    }

    #[test]
    fn test_missing_column_lists_all() {
        let err = MetricsError::MissingColumn {
            columns: vec!["Cluster".into(), "Hospital".into()],
        };
        assert_eq!(err.to_string(), "Missing required column(s): Cluster, Hospital");
    }

    #[test]
    fn test_config_invalid_format() {
        let err = ConfigError::Invalid(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Invalid config: a; b");
    }
}
