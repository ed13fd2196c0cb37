use thiserror::Error;

use crate::llm::LlmError;

/// Errors surfaced by the interview engine to the request layer.
#[derive(Debug, Error)]
pub enum InterviewError {
    /// Missing or malformed caller input.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("interview {0} not found")]
    NotFound(i64),

    /// Operation not valid for the interview's lifecycle state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("generation backend error: {0}")]
    Backend(#[from] LlmError),

    /// Durable-store failure; the turn's writes were rolled back.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for InterviewError {
    fn from(err: RepositoryError) -> Self {
        InterviewError::Storage(err.to_string())
    }
}

/// Errors from repository operations (used by trait definitions in mockloop-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from session cache backends.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interview_error_display() {
        let err = InterviewError::NotFound(42);
        assert_eq!(err.to_string(), "interview 42 not found");
    }

    #[test]
    fn test_repository_error_becomes_storage() {
        let err: InterviewError = RepositoryError::Query("disk I/O error".to_string()).into();
        assert!(matches!(err, InterviewError::Storage(ref msg) if msg.contains("disk I/O")));
    }

    #[test]
    fn test_llm_error_becomes_backend() {
        let err: InterviewError = LlmError::Timeout(60).into();
        assert!(matches!(err, InterviewError::Backend(LlmError::Timeout(60))));
    }

    #[test]
    fn test_cache_error_from_serde() {
        let serde_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: CacheError = serde_err.into();
        assert!(err.to_string().starts_with("cache serialization error"));
    }
}
