// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use peace::config::Config;
use peace::routes::{create_router, create_ws_router};
use peace::services::google::{ExternalProfile, IdentityProvider, OAuthError};
use peace::{AppState, Stores};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

/// Identity provider that accepts any code except `"bad-code"`.
pub struct StubIdentity;

#[async_trait]
impl IdentityProvider for StubIdentity {
    fn name(&self) -> &'static str {
        "google"
    }

    fn authorization_url(&self) -> String {
        "https://accounts.google.com/o/oauth2/v2/auth?client_id=stub".to_string()
    }

    async fn exchange(&self, code: &str) -> Result<ExternalProfile, OAuthError> {
        if code == "bad-code" {
            return Err(OAuthError::InvalidCode);
        }
        Ok(ExternalProfile {
            external_id: "google-123".to_string(),
            email: "jane.doe@gmail.com".to_string(),
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            picture: None,
            email_verified: true,
        })
    }
}

/// Create a test app over in-memory stores.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with(Config::test_default())
}

/// Like [`create_test_app`] with a caller-supplied config.
#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, Stores::in_memory(), Arc::new(StubIdentity)));
    (create_router(state.clone()), state)
}

/// Send a JSON request and return the status and parsed body.
#[allow(dead_code)]
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// A registered, logged-in user.
#[allow(dead_code)]
pub struct TestUser {
    pub id: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// Register `username` at `email` with password `Pass1word`, then log in.
#[allow(dead_code)]
pub async fn register_and_login(app: &Router, email: &str, username: &str) -> TestUser {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(serde_json::json!({
            "email": email,
            "username": username,
            "password": "Pass1word",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(serde_json::json!({"email": email, "password": "Pass1word"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");

    TestUser {
        id: body["data"]["user"]["id"].as_str().unwrap().to_string(),
        access_token: body["data"]["access_token"].as_str().unwrap().to_string(),
        refresh_token: body["data"]["refresh_token"].as_str().unwrap().to_string(),
    }
}

/// Serve the presence router on an ephemeral port.
#[allow(dead_code)]
pub async fn spawn_ws_server(state: Arc<AppState>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_ws_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(state.shutdown.clone().cancelled_owned())
            .await
            .unwrap();
    });
    addr
}
