// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mood record routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{MoodLevel, MoodRecord, Visibility};
use crate::response::{Envelope, JsonBody};
use crate::services::records::{Heatmap, RecordInput, Streak};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Record routes (require authentication).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/records", get(list_records).post(create_record))
        .route("/api/records/heatmap", get(get_heatmap))
        .route("/api/records/streak", get(get_streak))
        .route(
            "/api/records/{id}",
            get(get_record).put(update_record).delete(delete_record),
        )
}

// ─── Shapes ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct RecordRequest {
    happy_level: Option<i64>,
    energy_level: Option<i64>,
    notes: Option<String>,
    status: Option<String>,
}

impl RecordRequest {
    fn into_input(self) -> Result<RecordInput> {
        let (Some(happy), Some(energy)) = (self.happy_level, self.energy_level) else {
            return Err(AppError::Validation(
                "happy_level and energy_level are required".to_string(),
            ));
        };
        let visibility = match self.status.as_deref() {
            None | Some("") => Visibility::default(),
            Some(status) => Visibility::parse(status)?,
        };
        Ok(RecordInput {
            happy_level: MoodLevel::new(happy, "happy_level")?,
            energy_level: MoodLevel::new(energy, "energy_level")?,
            notes: self.notes,
            visibility,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct RecordResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub happy_level: i16,
    pub energy_level: i16,
    pub notes: Option<String>,
    pub status: Visibility,
    pub created_at: String,
    pub updated_at: String,
}

impl From<MoodRecord> for RecordResponse {
    fn from(record: MoodRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            happy_level: record.happy_level.value(),
            energy_level: record.energy_level.value(),
            notes: record.notes,
            status: record.visibility,
            created_at: format_utc_rfc3339(record.created_at),
            updated_at: format_utc_rfc3339(record.updated_at),
        }
    }
}

/// Optional RFC 3339 window, both ends inclusive.
#[derive(Deserialize)]
struct WindowQuery {
    started_at: Option<String>,
    ended_at: Option<String>,
}

fn record_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::Validation("invalid record id".to_string()))
}

// ─── Handlers ────────────────────────────────────────────────

async fn create_record(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(req): JsonBody<RecordRequest>,
) -> Result<Envelope<RecordResponse>> {
    let record = state.records.create(auth.user_id, req.into_input()?).await?;
    Ok(Envelope::created("Record created successfully", record.into()))
}

async fn get_record(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Envelope<RecordResponse>> {
    let record = state.records.get(auth.user_id, record_id(&id)?).await?;
    Ok(Envelope::ok("Record retrieved successfully", record.into()))
}

async fn update_record(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<RecordRequest>,
) -> Result<Envelope<RecordResponse>> {
    let id = record_id(&id)?;
    let record = state
        .records
        .update(auth.user_id, id, req.into_input()?)
        .await?;
    Ok(Envelope::ok("Record updated successfully", record.into()))
}

async fn delete_record(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Envelope<()>> {
    state.records.delete(auth.user_id, record_id(&id)?).await?;
    Ok(Envelope::message("Record deleted successfully"))
}

async fn list_records(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(window): Query<WindowQuery>,
) -> Result<Envelope<Vec<RecordResponse>>> {
    let records = state
        .records
        .list(
            auth.user_id,
            window.started_at.as_deref(),
            window.ended_at.as_deref(),
        )
        .await?;
    Ok(Envelope::ok(
        "Records retrieved successfully",
        records.into_iter().map(RecordResponse::from).collect(),
    ))
}

async fn get_heatmap(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(window): Query<WindowQuery>,
) -> Result<Envelope<Heatmap>> {
    let heatmap = state
        .records
        .heatmap(
            auth.user_id,
            window.started_at.as_deref(),
            window.ended_at.as_deref(),
        )
        .await?;
    Ok(Envelope::ok("Heatmap retrieved successfully", heatmap))
}

async fn get_streak(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Envelope<Streak>> {
    let streak = state.records.streak(auth.user_id).await?;
    Ok(Envelope::ok("Streak retrieved successfully", streak))
}
