// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration, login, token refresh and provider sign-in routes.

use crate::error::Result;
use crate::routes::user::UserResponse;
use crate::response::{Envelope, JsonBody};
use crate::services::auth::{LoginOutcome, RegisterCommand};
use crate::services::token::TokenPair;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Public auth routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/{provider}/url", get(provider_url))
        .route("/api/auth/{provider}/login", post(provider_login))
}

#[derive(Deserialize)]
struct RegisterRequest {
    email: String,
    username: String,
    password: String,
    first_name: Option<String>,
    last_name: Option<String>,
}

async fn register(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<Envelope<UserResponse>> {
    let user = state
        .auth
        .register(RegisterCommand {
            email: req.email,
            username: req.username,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
        })
        .await?;
    Ok(Envelope::created(
        "User registered successfully",
        (&user).into(),
    ))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

impl From<LoginOutcome> for LoginResponse {
    fn from(outcome: LoginOutcome) -> Self {
        Self {
            user: (&outcome.user).into(),
            access_token: outcome.tokens.access_token,
            refresh_token: outcome.tokens.refresh_token,
        }
    }
}

async fn login(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Envelope<LoginResponse>> {
    let outcome = state.auth.login(&req.email, &req.password).await?;
    Ok(Envelope::ok("Login successful", outcome.into()))
}

#[derive(Deserialize)]
struct RefreshRequest {
    // Clients also send `access_token`; it is ignored
    refresh_token: String,
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<RefreshRequest>,
) -> Result<Envelope<TokenPair>> {
    let tokens = state.auth.refresh(&req.refresh_token).await?;
    Ok(Envelope::ok("Token refreshed successfully", tokens))
}

#[derive(Serialize)]
struct AuthUrlResponse {
    auth_url: String,
}

async fn provider_url(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
) -> Result<Envelope<AuthUrlResponse>> {
    let auth_url = state.auth.authorization_url(&provider)?;
    Ok(Envelope::ok(
        "Authorization URL generated successfully",
        AuthUrlResponse { auth_url },
    ))
}

#[derive(Deserialize)]
struct ProviderLoginRequest {
    #[serde(default)]
    code: String,
}

async fn provider_login(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    JsonBody(req): JsonBody<ProviderLoginRequest>,
) -> Result<Envelope<LoginResponse>> {
    let outcome = state.auth.login_with_provider(&provider, &req.code).await?;
    Ok(Envelope::ok("Google login successful", outcome.into()))
}
