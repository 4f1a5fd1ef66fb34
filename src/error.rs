//! Custom error types for In & Out
//!
//! This module defines the error hierarchy for the ledger using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for ledger operations
#[derive(Error, Debug)]
pub enum InoutError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors for records and backup documents
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{collection} record not found: {id}")]
    NotFound {
        collection: &'static str,
        id: String,
    },

    /// A persistence or request deadline elapsed
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The document could not be written to persistence
    #[error("Database save failed: {0}")]
    StoreWrite(String),

    /// Key-value storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Import errors
    #[error("Import error: {0}")]
    Import(String),

    /// Export errors
    #[error("Export error: {0}")]
    Export(String),

    /// Network, API or share failures
    #[error("Transport error: {0}")]
    Transport(String),

    /// The cloud token could not be obtained
    #[error("Failed to get access token. Please sign in again.")]
    SignInRequired,
}

impl InoutError {
    /// Create a "not found" error for a collection
    pub fn not_found(collection: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection,
            id: id.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<std::io::Error> for InoutError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for InoutError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<reqwest::Error> for InoutError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Result type alias for ledger operations
pub type InoutResult<T> = Result<T, InoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InoutError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_not_found_error() {
        let err = InoutError::not_found("transactions", "txn-1");
        assert_eq!(err.to_string(), "transactions record not found: txn-1");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_sign_in_required_message() {
        let err = InoutError::SignInRequired;
        assert!(err.to_string().contains("sign in again"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: InoutError = io_err.into();
        assert!(matches!(err, InoutError::Io(_)));
    }
}
