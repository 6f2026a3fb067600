// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The `{code, message, data?}` response envelope shared by every endpoint.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::AppError;

/// Outward result code carried in every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseCode {
    Success,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    ServerError,
}

/// JSON body of every API response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: ResponseCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn new(code: ResponseCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
        }
    }
}

/// A successful envelope together with its HTTP status.
pub struct Envelope<T> {
    status: StatusCode,
    body: ApiResponse<T>,
}

impl<T: Serialize> Envelope<T> {
    /// 200 with data.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::OK,
            body: ApiResponse::new(ResponseCode::Success, message, Some(data)),
        }
    }

    /// 201 with data.
    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            body: ApiResponse::new(ResponseCode::Success, message, Some(data)),
        }
    }
}

impl Envelope<()> {
    /// 200 without data.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: ApiResponse::new(ResponseCode::Success, message, None),
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// JSON extractor whose rejection is rendered as a `BAD_REQUEST` envelope.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                let rejection: JsonRejection = rejection;
                tracing::debug!(error = %rejection.body_text(), "Rejected request body");
                Err(AppError::Validation("Invalid request body".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_serialization() {
        let body = ApiResponse::new(ResponseCode::NotFound, "Record not found", None::<()>);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"code": "NOT_FOUND", "message": "Record not found"})
        );

        let body = ApiResponse::new(ResponseCode::Success, "ok", Some(vec![1, 2]));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "SUCCESS");
        assert_eq!(json["data"], serde_json::json!([1, 2]));
    }
}
