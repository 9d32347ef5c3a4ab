//! Error types for polarway-fusion
//!
//! Every fallible operation returns `Result<T, FusionError>`. Errors that
//! originate on the native side of the boundary keep the native message
//! verbatim; [`FusionError::message`] hands it back without the prefix.

use thiserror::Error;

/// Unified error type for all bridge operations
#[derive(Error, Debug)]
pub enum FusionError {
    // ─── Boundary Errors ───

    /// A synchronous native factory call wrote an error into its slot
    #[error("Creation failed: {0}")]
    Creation(String),

    /// An asynchronous query-like operation was rejected by the engine
    #[error("Query failed: {0}")]
    Query(String),

    /// An asynchronous or synchronous registration was rejected by the engine
    #[error("Registration failed: {0}")]
    Registration(String),

    /// Native destroy failed for the resource or one of its children
    #[error("Teardown failed for {resource}: {}", .failures.join("; "))]
    Teardown {
        resource: String,
        failures: Vec<String>,
    },

    // ─── Host-side Errors ───

    /// Use of a closed resource, or a structural change after close began
    #[error("Usage error: {0}")]
    Usage(String),

    /// A single-fire completion was invoked a second time
    #[error("Completion delivered twice: {0}")]
    DoubleCompletion(String),

    // ─── Infrastructure Errors ───

    #[error("Arrow error: {0}")]
    Arrow(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FusionError {
    /// The message carried by the error, without the display prefix.
    ///
    /// For boundary errors this is exactly the string the native side produced.
    pub fn message(&self) -> String {
        match self {
            FusionError::Creation(msg)
            | FusionError::Query(msg)
            | FusionError::Registration(msg)
            | FusionError::Usage(msg)
            | FusionError::DoubleCompletion(msg)
            | FusionError::Arrow(msg)
            | FusionError::Config(msg)
            | FusionError::Internal(msg) => msg.clone(),
            FusionError::Teardown { failures, .. } => failures.join("; "),
            FusionError::Io(err) => err.to_string(),
        }
    }

    /// True for errors raised on the host side before any native call was made
    pub fn is_usage(&self) -> bool {
        matches!(self, FusionError::Usage(_))
    }
}

impl From<arrow::error::ArrowError> for FusionError {
    fn from(err: arrow::error::ArrowError) -> Self {
        FusionError::Arrow(err.to_string())
    }
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, FusionError>;
