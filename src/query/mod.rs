//! REST-style query layer over the ledger document
//!
//! Callers describe what they want as a [`Request`]; [`LocalQuery`] runs it
//! against the document store and returns records as JSON. Expected misses
//! (unknown id, unsupported verb) come back as [`QueryError`] values, each
//! with the status a REST endpoint would have answered.

pub mod engine;
pub mod filter;
pub mod request;

pub use engine::{LocalQuery, QueryResponse};
pub use request::{ListQuery, Request, SortOrder, Verb};

use std::fmt;

use thiserror::Error;

use crate::error::InoutError;

/// Status classification of a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Http(u16),
    Timeout,
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(code) => write!(f, "{}", code),
            Self::Timeout => write!(f, "TIMEOUT_ERROR"),
        }
    }
}

/// Why a request produced no data
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Not found: {collection}/{id}")]
    NotFound { collection: &'static str, id: String },

    #[error("Not found: unknown collection '{0}'")]
    UnknownCollection(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Operation timed out")]
    Timeout,

    #[error(transparent)]
    Failed(InoutError),
}

impl QueryError {
    pub fn status(&self) -> QueryStatus {
        match self {
            Self::NotFound { .. } | Self::UnknownCollection(_) => QueryStatus::Http(404),
            Self::MethodNotAllowed(_) => QueryStatus::Http(405),
            Self::BadRequest(_) => QueryStatus::Http(400),
            Self::Timeout => QueryStatus::Timeout,
            Self::Failed(_) => QueryStatus::Http(500),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::UnknownCollection(_))
    }
}

impl From<InoutError> for QueryError {
    fn from(err: InoutError) -> Self {
        match err {
            InoutError::NotFound { collection, id } => Self::NotFound { collection, id },
            InoutError::Validation(msg) => Self::BadRequest(msg),
            InoutError::Timeout(_) => Self::Timeout,
            other => Self::Failed(other),
        }
    }
}

impl From<QueryError> for InoutError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::NotFound { collection, id } => InoutError::NotFound { collection, id },
            QueryError::BadRequest(msg) => InoutError::Validation(msg),
            QueryError::Timeout => InoutError::Timeout("request exceeded its deadline".into()),
            QueryError::Failed(inner) => inner,
            other => InoutError::Validation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let not_found = QueryError::NotFound {
            collection: "accounts",
            id: "x".into(),
        };
        assert_eq!(not_found.status(), QueryStatus::Http(404));
        assert_eq!(
            QueryError::MethodNotAllowed("HEAD".into()).status().to_string(),
            "405"
        );
        assert_eq!(QueryError::Timeout.status().to_string(), "TIMEOUT_ERROR");
        assert_eq!(
            QueryError::Failed(InoutError::StoreWrite("disk".into())).status(),
            QueryStatus::Http(500)
        );
    }

    #[test]
    fn test_store_errors_map_to_statuses() {
        let err: QueryError = InoutError::Timeout("slow".into()).into();
        assert_eq!(err.status(), QueryStatus::Timeout);

        let err: QueryError = InoutError::Validation("bad".into()).into();
        assert_eq!(err.status(), QueryStatus::Http(400));
    }
}
