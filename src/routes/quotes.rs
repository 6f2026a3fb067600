// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Quote library routes. Reads are public; writes need a signed-in user.

use crate::error::{AppError, Result};
use crate::models::Quote;
use crate::response::{Envelope, JsonBody};
use crate::routes::tags::TagResponse;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/quotes", get(list_quotes))
        .route("/api/quotes/random", get(random_quote))
        .route("/api/quotes/{id}", get(get_quote))
        .route("/api/quotes/{id}/tags", get(quote_tags))
}

/// Write routes; the auth middleware is applied in routes/mod.rs.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/quotes", post(create_quote))
        .route("/api/quotes/{id}", put(update_quote).delete(delete_quote))
        .route(
            "/api/quotes/{id}/tags",
            post(add_quote_tag).delete(remove_quote_tag_body),
        )
        .route("/api/quotes/{id}/tags/{tag_id}", delete(remove_quote_tag))
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub id: i64,
    pub content: String,
    pub author: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Quote> for QuoteResponse {
    fn from(quote: Quote) -> Self {
        Self {
            id: quote.id,
            content: quote.content,
            author: quote.author,
            created_at: format_utc_rfc3339(quote.created_at),
            updated_at: format_utc_rfc3339(quote.updated_at),
        }
    }
}

#[derive(Deserialize)]
struct QuoteRequest {
    #[serde(default)]
    content: String,
    #[serde(default)]
    author: String,
}

#[derive(Deserialize)]
struct QuoteTagRequest {
    tag_id: i64,
}

/// Parse a numeric path id; `what` names it in the error.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::Validation(format!("invalid {what} id")))
}

async fn list_quotes(State(state): State<Arc<AppState>>) -> Result<Envelope<Vec<QuoteResponse>>> {
    let quotes = state.quotes.list().await?;
    Ok(Envelope::ok(
        "Quotes retrieved successfully",
        quotes.into_iter().map(QuoteResponse::from).collect(),
    ))
}

async fn random_quote(State(state): State<Arc<AppState>>) -> Result<Envelope<QuoteResponse>> {
    let quote = state.quotes.random().await?;
    Ok(Envelope::ok(
        "Random quote retrieved successfully",
        quote.into(),
    ))
}

async fn get_quote(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Envelope<QuoteResponse>> {
    let quote = state.quotes.get(parse_id(&id, "quote")?).await?;
    Ok(Envelope::ok("Quote retrieved successfully", quote.into()))
}

async fn create_quote(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<QuoteRequest>,
) -> Result<Envelope<QuoteResponse>> {
    let quote = state.quotes.create(&req.content, &req.author).await?;
    Ok(Envelope::created("Quote created successfully", quote.into()))
}

async fn update_quote(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<QuoteRequest>,
) -> Result<Envelope<QuoteResponse>> {
    let quote = state
        .quotes
        .update(parse_id(&id, "quote")?, &req.content, &req.author)
        .await?;
    Ok(Envelope::ok("Quote updated successfully", quote.into()))
}

async fn delete_quote(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Envelope<()>> {
    state.quotes.delete(parse_id(&id, "quote")?).await?;
    Ok(Envelope::message("Quote deleted successfully"))
}

async fn quote_tags(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Envelope<Vec<TagResponse>>> {
    let tags = state.quotes.tags(parse_id(&id, "quote")?).await?;
    Ok(Envelope::ok(
        "Tags retrieved successfully",
        tags.into_iter().map(TagResponse::from).collect(),
    ))
}

async fn add_quote_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<QuoteTagRequest>,
) -> Result<Envelope<()>> {
    state
        .quotes
        .add_tag(parse_id(&id, "quote")?, req.tag_id)
        .await?;
    Ok(Envelope::message("Tag added to quote successfully"))
}

async fn remove_quote_tag(
    State(state): State<Arc<AppState>>,
    Path((id, tag_id)): Path<(String, String)>,
) -> Result<Envelope<()>> {
    state
        .quotes
        .remove_tag(parse_id(&id, "quote")?, parse_id(&tag_id, "tag")?)
        .await?;
    Ok(Envelope::message("Tag removed from quote successfully"))
}

async fn remove_quote_tag_body(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<QuoteTagRequest>,
) -> Result<Envelope<()>> {
    state
        .quotes
        .remove_tag(parse_id(&id, "quote")?, req.tag_id)
        .await?;
    Ok(Envelope::message("Tag removed from quote successfully"))
}
