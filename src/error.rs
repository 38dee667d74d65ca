//! Error types for the revalidate crate
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tokio_rusqlite::rusqlite;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache, the store and the optimistic coordinator.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Store call failed (connection, busy, closed). Retryable.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Authoritative mutation was rejected by the store
    #[error("Mutation failed: {0}")]
    MutationFailed(String),

    /// Statement could not be prepared or a row could not be decoded
    #[error("Query failed: {0}")]
    Query(String),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// An optimistic action is already in flight for this entity
    #[error("Mutation already pending for {0}")]
    MutationPending(String),

    /// Reducer could not compute a speculative value
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Key is cached with a different value type
    #[error("Type mismatch for cached key {0}")]
    TypeMismatch(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Returns true when retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CacheError::StoreUnavailable(_))
    }
}

// == Store Error Conversions ==
impl From<rusqlite::Error> for CacheError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
                rusqlite::ErrorCode::ConstraintViolation => {
                    CacheError::MutationFailed(err.to_string())
                }
                rusqlite::ErrorCode::DatabaseBusy
                | rusqlite::ErrorCode::DatabaseLocked
                | rusqlite::ErrorCode::CannotOpen
                | rusqlite::ErrorCode::SystemIoFailure => {
                    CacheError::StoreUnavailable(err.to_string())
                }
                _ => CacheError::Query(err.to_string()),
            },
            _ => CacheError::Query(err.to_string()),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for CacheError {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e.into(),
            other => CacheError::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Query(format!("row decode: {}", err))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::MutationFailed(_) => StatusCode::CONFLICT,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::MutationPending(_) => StatusCode::CONFLICT,
            CacheError::InvalidAction(_) => StatusCode::BAD_REQUEST,
            CacheError::Query(_) | CacheError::TypeMismatch(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the crate.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::MutationPending("post:1".to_string());
        assert!(err.to_string().contains("post:1"));
    }

    #[test]
    fn test_only_store_unavailable_is_retryable() {
        assert!(CacheError::StoreUnavailable("busy".into()).is_retryable());
        assert!(!CacheError::MutationFailed("constraint".into()).is_retryable());
        assert!(!CacheError::NotFound("x".into()).is_retryable());
    }

    #[test]
    fn test_status_mapping() {
        let resp = CacheError::StoreUnavailable("down".into()).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let resp = CacheError::MutationFailed("constraint".into()).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = CacheError::InvalidRequest("bad".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_query_returned_no_rows_is_query_error() {
        let err: CacheError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, CacheError::Query(_)));
    }
}
