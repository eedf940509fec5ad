use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Storage timeout: {0}")]
    StorageTimeout(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable tag so callers can discriminate without parsing messages.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "unauthenticated",
            AppError::Forbidden(_) => "unauthorized",
            AppError::NotFound(_) => "not_found",
            AppError::ValidationError(_) => "validation_error",
            AppError::Conflict(_) => "slot_conflict",
            AppError::InvalidTransition(_) => "invalid_transition",
            AppError::PreconditionFailed(_) => "precondition_failed",
            AppError::StorageTimeout(_) => "storage_timeout",
            AppError::Database(_) => "storage_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidTransition(_) => StatusCode::CONFLICT,
            AppError::PreconditionFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::StorageTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Only storage timeouts are safe to retry blindly, and only on reads.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::StorageTimeout(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Auth(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::ValidationError(msg)
            | AppError::Conflict(msg)
            | AppError::InvalidTransition(msg)
            | AppError::PreconditionFailed(msg)
            | AppError::StorageTimeout(msg)
            | AppError::Database(msg)
            | AppError::Internal(msg) => msg.clone(),
        };

        if status.is_server_error() {
            tracing::error!("Error: {}: {}", status, message);
        } else {
            tracing::debug!("Request rejected: {}: {}", status, message);
        }

        let body = Json(json!({
            "error": message,
            "code": self.code(),
            "retryable": self.is_retryable(),
        }));

        (status, body).into_response()
    }
}

// Malformed request input is reported through the same envelope as domain errors
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_and_timeouts_are_distinguishable() {
        let conflict = AppError::Conflict("taken".into());
        let timeout = AppError::StorageTimeout("slow".into());

        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        assert!(!conflict.is_retryable());
        assert_eq!(timeout.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(timeout.is_retryable());
        assert_ne!(conflict.code(), AppError::InvalidTransition("x".into()).code());
    }
}
