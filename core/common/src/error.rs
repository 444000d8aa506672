//! Common error types for picbed.

use thiserror::Error;

/// Top-level error type for upload operations.
///
/// Every strategy surfaces its failure as one of these variants and the
/// dispatcher passes it through unchanged.
#[derive(Debug, Error)]
pub enum Error {
    /// A required configuration field is absent or unparseable.
    #[error("Configuration missing: {0}")]
    ConfigMissing(String),

    /// The backend rejected a signature or token.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Transport-level failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-2xx status.
    #[error("Backend returned {status}: {message}")]
    BackendStatus {
        /// HTTP status code.
        status: u16,
        /// Backend-provided message or raw body.
        message: String,
    },

    /// A successful-looking response lacked an expected field.
    #[error("Unexpected response: {0}")]
    ResponseShape(String),

    /// The git-hosting backend reported the target branch as missing.
    #[error("Branch '{branch}' not found: {message}")]
    BranchNotFound {
        /// Branch the upload was attempted on.
        branch: String,
        /// Backend-provided message.
        message: String,
    },

    /// A trusted extension failed or never reported a result.
    #[error("Extension error: {0}")]
    Extension(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Build a `BackendStatus` error.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::BackendStatus {
            status,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
