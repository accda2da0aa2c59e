//! Query translation error types.

use thiserror::Error;

/// Errors raised while translating listing criteria.
///
/// Every variant is produced before any parameter, predicate or pipeline
/// is handed back, so callers never receive a partially built query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("malformed range \"{input}\": {reason}")]
    MalformedRange { input: String, reason: String },

    #[error("type mismatch for '{field}': expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("invalid value for parameter '{key}': {value:?}")]
    InvalidParam { key: String, value: String },
}

impl QueryError {
    pub(crate) fn malformed_range(input: &str, reason: impl Into<String>) -> Self {
        Self::MalformedRange {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_param(key: &str, value: &str) -> Self {
        Self::InvalidParam {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// Result type alias using QueryError.
pub type QueryResult<T> = Result<T, QueryError>;
