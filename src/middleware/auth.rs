// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer-token authentication middleware.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

/// Subprotocol a websocket client offers ahead of its token.
pub const BEARER_PROTOCOL: &str = "bearer";

/// Authenticated user extracted from an access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

/// Middleware that requires a valid access token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = bearer_token(request.headers()) else {
        return Err(AppError::Unauthorized(
            "Authorization header required".to_string(),
        ));
    };

    let auth_user = authenticate(&state, token)?;
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Validate an access token into the caller's identity.
pub fn authenticate(state: &AppState, token: &str) -> Result<AuthUser, AppError> {
    let claims = state.tokens.validate_access(token).map_err(|e| {
        tracing::warn!(error = %e, "Access token rejected");
        AppError::InvalidToken
    })?;
    Ok(AuthUser {
        user_id: claims.user_id,
        email: claims.email,
    })
}

/// Token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Token from `Sec-WebSocket-Protocol`, offered as `bearer, <token>` or as a
/// lone `<token>`.
pub fn subprotocol_token(headers: &HeaderMap) -> Option<&str> {
    let offered = headers
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|h| h.to_str().ok())?;

    let mut parts = offered.split(',').map(str::trim).filter(|p| !p.is_empty());
    match (parts.next(), parts.next()) {
        (Some(first), Some(token)) if first.eq_ignore_ascii_case(BEARER_PROTOCOL) => Some(token),
        (Some(token), None) if !token.eq_ignore_ascii_case(BEARER_PROTOCOL) => Some(token),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(name: header::HeaderName, value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(
            bearer_token(&headers(header::AUTHORIZATION, "Bearer abc.def")),
            Some("abc.def")
        );
        assert_eq!(bearer_token(&headers(header::AUTHORIZATION, "Basic xyz")), None);
        assert_eq!(bearer_token(&headers(header::AUTHORIZATION, "Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_subprotocol_token() {
        let proto = header::SEC_WEBSOCKET_PROTOCOL;
        assert_eq!(
            subprotocol_token(&headers(proto.clone(), "bearer, abc.def")),
            Some("abc.def")
        );
        assert_eq!(
            subprotocol_token(&headers(proto.clone(), "abc.def")),
            Some("abc.def")
        );
        assert_eq!(subprotocol_token(&headers(proto.clone(), "bearer")), None);
        assert_eq!(subprotocol_token(&HeaderMap::new()), None);
    }
}
