// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tag routes. Reads are public; writes need a signed-in user.

use crate::error::Result;
use crate::models::Tag;
use crate::response::{Envelope, JsonBody};
use crate::routes::quotes::parse_id;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tags", get(list_tags))
        .route("/api/tags/{id}", get(get_tag))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tags", post(create_tag))
        .route("/api/tags/{id}", put(update_tag).delete(delete_tag))
}

#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            description: tag.description,
            created_at: format_utc_rfc3339(tag.created_at),
            updated_at: format_utc_rfc3339(tag.updated_at),
        }
    }
}

#[derive(Deserialize)]
struct TagRequest {
    #[serde(default)]
    name: String,
    description: Option<String>,
}

async fn list_tags(State(state): State<Arc<AppState>>) -> Result<Envelope<Vec<TagResponse>>> {
    let tags = state.tags.list().await?;
    Ok(Envelope::ok(
        "Tags retrieved successfully",
        tags.into_iter().map(TagResponse::from).collect(),
    ))
}

async fn get_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Envelope<TagResponse>> {
    let tag = state.tags.get(parse_id(&id, "tag")?).await?;
    Ok(Envelope::ok("Tag retrieved successfully", tag.into()))
}

async fn create_tag(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<TagRequest>,
) -> Result<Envelope<TagResponse>> {
    let tag = state
        .tags
        .create(&req.name, req.description.as_deref())
        .await?;
    Ok(Envelope::created("Tag created successfully", tag.into()))
}

async fn update_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<TagRequest>,
) -> Result<Envelope<TagResponse>> {
    let tag = state
        .tags
        .update(parse_id(&id, "tag")?, &req.name, req.description.as_deref())
        .await?;
    Ok(Envelope::ok("Tag updated successfully", tag.into()))
}

async fn delete_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Envelope<()>> {
    state.tags.delete(parse_id(&id, "tag")?).await?;
    Ok(Envelope::message("Tag deleted successfully"))
}
