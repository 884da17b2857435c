use std::path::PathBuf;

use thiserror::Error;

use crate::types::Statistic;

/// Convenience result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Error type returned by sources, folds, sinks and the runner.
///
/// This is a single error enum shared across every stage of a pipeline.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The input file is missing or cannot be opened for reading.
    ///
    /// Raised once by the liveness precheck, before any pipeline starts.
    #[error("input file '{}' is not readable: {source}", path.display())]
    Path {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Underlying I/O error while streaming an already-opened file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A line could not be decoded into a structured record.
    #[error("failed to decode record at line {line}: {message}")]
    Decode { line: usize, message: String },

    /// A decoded record lacks a field the projector needs.
    #[error("record at line {line} is missing required field '{field}'")]
    MissingField { line: usize, field: &'static str },

    /// No records of a category were seen, so its average is undefined.
    #[error("cannot average username length for category '{category}': no records seen")]
    DivisionByZero { category: &'static str },

    /// The run was cancelled before the fold finished. Any output is partial.
    #[error("interrupted after {records} records; output is incomplete")]
    Interrupted { records: u64 },

    /// The rendering collaborator failed to produce its artifact.
    #[error("sink failed for {statistic}: {message}")]
    Sink {
        statistic: Statistic,
        message: String,
    },

    /// Invalid or unloadable configuration.
    #[error("configuration error: {message}")]
    Config { message: String },
}

/// Severity classification used by observers to pick a log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// The run stopped early on request; nothing is wrong with the data.
    Warning,
    /// The owning pipeline failed.
    Error,
    /// Infrastructure failure (file system, I/O).
    Critical,
}

impl AnalysisError {
    /// Classify this error for logging/alerting.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AnalysisError::Path { .. } | AnalysisError::Io(_) => ErrorSeverity::Critical,
            AnalysisError::Interrupted { .. } => ErrorSeverity::Warning,
            AnalysisError::Decode { .. }
            | AnalysisError::MissingField { .. }
            | AnalysisError::DivisionByZero { .. }
            | AnalysisError::Sink { .. }
            | AnalysisError::Config { .. } => ErrorSeverity::Error,
        }
    }

    /// `true` if this error is the result of cancellation.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, AnalysisError::Interrupted { .. })
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        AnalysisError::Config {
            message: message.into(),
        }
    }
}
