//! Error types for redline.

use thiserror::Error;

/// Result type alias using RedlineError.
pub type Result<T> = std::result::Result<T, RedlineError>;

/// Errors that can occur while extracting, indexing, retrieving or analyzing.
#[derive(Error, Debug)]
pub enum RedlineError {
    /// No readable text could be recovered from the source.
    #[error("Could not extract text from {source_name}: {reason}")]
    ExtractionFailed { source_name: String, reason: String },

    /// The embedding or storage layer could not be reached.
    #[error("Document store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// The LLM call failed.
    #[error("LLM gateway error: {message}")]
    Gateway { message: String },

    /// The LLM replied with something that is not a valid analysis.
    #[error("Could not parse LLM output: {message}")]
    Parse { message: String },

    /// Invalid argument provided.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Internal error (unexpected).
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RedlineError {
    /// Create an extraction failure for the named source.
    pub fn extraction_failed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Create a store-unavailable error.
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    /// Create a gateway error.
    pub fn gateway(message: impl Into<String>) -> Self {
        Self::Gateway {
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error came from the embedding/storage layer.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }

    /// Get the machine-readable error code used in HTTP error bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ExtractionFailed { .. } => "extraction_failed",
            Self::StoreUnavailable { .. } => "store_unavailable",
            Self::Gateway { .. } | Self::Parse { .. } => "gateway_error",
            Self::InvalidArgument { .. } => "bad_request",
            Self::Io(_) => "io_error",
            Self::Serialization(_) => "serialization_error",
            Self::Config { .. } => "config_error",
            Self::Internal { .. } => "internal",
        }
    }
}
