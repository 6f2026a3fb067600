// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::db::StoreError;
use crate::models::ValidationError;
use crate::response::{ApiResponse, ResponseCode};

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Uniqueness violation. Rendered as 409 but with the `BAD_REQUEST` code
    /// existing clients match on.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> ResponseCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) => ResponseCode::BadRequest,
            AppError::NotFound(_) => ResponseCode::NotFound,
            AppError::Unauthorized(_) | AppError::InvalidToken => ResponseCode::Unauthorized,
            AppError::Forbidden(_) => ResponseCode::Forbidden,
            AppError::Upstream(_) | AppError::Internal(_) => ResponseCode::ServerError,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppError::NotFound(format!("{what} not found")),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::Backend(e) => AppError::Internal(e.context("store operation failed")),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Upstream(msg) => {
                tracing::error!(error = %msg, "Upstream provider error");
                "upstream provider error".to_string()
            }
            AppError::Internal(err) => {
                tracing::error!(error = %format!("{err:#}"), "Internal server error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ApiResponse::<()>::new(self.code(), message, None);
        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_keeps_bad_request_code() {
        let err = AppError::Conflict("email already registered".to_string());
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), ResponseCode::BadRequest);
    }

    #[test]
    fn test_store_error_mapping() {
        let err: AppError = StoreError::NotFound("Record").into();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Record not found"));

        let err: AppError = StoreError::Backend(anyhow::anyhow!("connection reset")).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), ResponseCode::ServerError);
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response = AppError::Internal(anyhow::anyhow!("secret dsn")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "SERVER_ERROR");
        assert_eq!(json["message"], "Internal server error");
        assert!(json.get("data").is_none());
    }
}
