//! Error types surfaced at the request boundary.

use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// ValidationError
///
/// Field-keyed validation failures. Serialized as a flat JSON object mapping each
/// offending field to its message, e.g.
/// `{"plan": "Plan is required unless subscription is revoked."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("validation failed: {fields:?}")]
pub struct ValidationError {
    pub fields: BTreeMap<String, String>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field error.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut err = Self::new();
        err.add(field, message);
        err
    }

    /// Records a message for `field`. The first message per field is kept.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn message(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Ok(()) when nothing was recorded.
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// RepositoryError
///
/// Failures of persistence writes. Reads log and degrade instead.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A unique or foreign-key constraint rejected the write. Carries the constraint name.
    #[error("constraint violated: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() || db.is_foreign_key_violation() {
                return RepositoryError::Conflict(db.constraint().unwrap_or_default().to_string());
            }
        }
        RepositoryError::Database(e.to_string())
    }
}

/// StorageError
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("presigning failed: {0}")]
    Presign(String),

    #[error("object deletion failed: {0}")]
    Delete(String),

    #[error("storage simulation failure")]
    Simulated,
}

/// ApiError
///
/// Every handler returns `Result<_, ApiError>`; the `IntoResponse` impl below turns
/// it into the status code and JSON body the clients depend on.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Unauthorized(String),

    #[error("You do not have permission to perform this action.")]
    Forbidden,

    #[error("Not found.")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for ApiError {
    fn from(e: RepositoryError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Validation(err) => (status, Json(err.fields)).into_response(),
            ApiError::Storage(ref e) => {
                tracing::error!("storage failure: {}", e);
                (status, Json(json!({ "detail": "Storage backend unavailable." }))).into_response()
            }
            ApiError::Internal(ref e) => {
                tracing::error!("internal failure: {}", e);
                (status, Json(json!({ "detail": "Internal server error." }))).into_response()
            }
            other => (status, Json(json!({ "detail": other.to_string() }))).into_response(),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Storage(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
