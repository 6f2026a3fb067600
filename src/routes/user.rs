// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account routes for the signed-in user.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::User;
use crate::response::{Envelope, JsonBody};
use crate::AppState;
use axum::{
    extract::State,
    routing::{delete, get, post, put},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// User routes (require authentication).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/user/me", get(get_me))
        .route("/api/user/profile", put(update_profile))
        .route("/api/user/password", put(update_password))
        .route("/api/user/deactivate", post(deactivate))
        .route("/api/user/account", delete(delete_account))
}

/// Public view of an account.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            full_name: user.full_name(),
        }
    }
}

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Envelope<UserResponse>> {
    let user = state.users.me(auth.user_id).await?;
    Ok(Envelope::ok("Me retrieved successfully", (&user).into()))
}

#[derive(Deserialize)]
struct UpdateProfileRequest {
    first_name: Option<String>,
    last_name: Option<String>,
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(req): JsonBody<UpdateProfileRequest>,
) -> Result<Envelope<UserResponse>> {
    let user = state
        .users
        .update_profile(
            auth.user_id,
            req.first_name.as_deref(),
            req.last_name.as_deref(),
        )
        .await?;
    Ok(Envelope::ok("Profile updated successfully", (&user).into()))
}

#[derive(Deserialize)]
struct UpdatePasswordRequest {
    #[serde(default)]
    new_password: String,
}

async fn update_password(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(req): JsonBody<UpdatePasswordRequest>,
) -> Result<Envelope<()>> {
    state
        .users
        .update_password(auth.user_id, &req.new_password)
        .await?;
    Ok(Envelope::message("Password updated successfully"))
}

async fn deactivate(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Envelope<()>> {
    state.users.deactivate(auth.user_id).await?;
    Ok(Envelope::message("Account deactivated successfully"))
}

async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Envelope<()>> {
    tracing::info!(user_id = %auth.user_id, "User-initiated account deletion");
    state.users.delete_account(auth.user_id).await?;
    Ok(Envelope::message("Account deleted successfully"))
}
