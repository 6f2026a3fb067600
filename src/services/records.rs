// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mood record use cases: ownership-checked CRUD, the daily heatmap and the
//! consecutive-day streak.

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{RecordFilter, RecordStore, StoreError, UserStore};
use crate::error::{AppError, Result};
use crate::models::{MoodLevel, MoodRecord, Visibility};
use crate::time_utils::{format_day, format_utc_rfc3339, parse_bound};

/// Validated mutable fields of a record.
#[derive(Debug, Clone)]
pub struct RecordInput {
    pub happy_level: MoodLevel,
    pub energy_level: MoodLevel,
    pub notes: Option<String>,
    pub visibility: Visibility,
}

/// Per-day aggregate. Means are running integer means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HeatmapBucket {
    pub happy_level: i64,
    pub energy_level: i64,
    pub count: i64,
}

impl HeatmapBucket {
    fn admit(&mut self, happy: i64, energy: i64) {
        self.happy_level = (self.happy_level * self.count + happy) / (self.count + 1);
        self.energy_level = (self.energy_level * self.count + energy) / (self.count + 1);
        self.count += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Heatmap {
    pub data: BTreeMap<String, HeatmapBucket>,
    pub total_records: usize,
    pub date_range: DateRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Streak {
    pub streak: u32,
    pub last_entry_date: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Access {
    View,
    Update,
    Delete,
}

impl Access {
    fn denied(self) -> AppError {
        let verb = match self {
            Access::View => "view",
            Access::Update => "update",
            Access::Delete => "delete",
        };
        AppError::Forbidden(format!("You don't have permission to {verb} this record"))
    }
}

#[derive(Clone)]
pub struct RecordService {
    records: Arc<dyn RecordStore>,
    users: Arc<dyn UserStore>,
}

impl RecordService {
    pub fn new(records: Arc<dyn RecordStore>, users: Arc<dyn UserStore>) -> Self {
        Self { records, users }
    }

    pub async fn create(&self, user_id: Uuid, input: RecordInput) -> Result<MoodRecord> {
        let user = self.users.get(user_id).await.map_err(|e| match e {
            StoreError::NotFound(_) => AppError::Unauthorized("user not found".to_string()),
            other => other.into(),
        })?;
        if !user.can_authenticate() {
            return Err(AppError::Unauthorized(
                "user account is deactivated".to_string(),
            ));
        }

        let record = MoodRecord::new(
            user_id,
            input.happy_level,
            input.energy_level,
            input.notes,
            input.visibility,
        );
        self.records.create(&record).await?;
        tracing::info!(record_id = %record.id, user_id = %user_id, "Record created");

        self.fetch(record.id).await
    }

    pub async fn get(&self, user_id: Uuid, record_id: Uuid) -> Result<MoodRecord> {
        self.owned(user_id, record_id, Access::View).await
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        record_id: Uuid,
        input: RecordInput,
    ) -> Result<MoodRecord> {
        let mut record = self.owned(user_id, record_id, Access::Update).await?;
        record.apply_update(
            input.happy_level,
            input.energy_level,
            input.notes,
            input.visibility,
        );
        self.records.update(&record).await.map_err(not_found)?;
        Ok(record)
    }

    pub async fn delete(&self, user_id: Uuid, record_id: Uuid) -> Result<()> {
        self.owned(user_id, record_id, Access::Delete).await?;
        self.records.delete(record_id).await.map_err(not_found)?;
        tracing::info!(record_id = %record_id, user_id = %user_id, "Record deleted");
        Ok(())
    }

    /// Records in the window, newest first.
    pub async fn list(
        &self,
        user_id: Uuid,
        started_at: Option<&str>,
        ended_at: Option<&str>,
    ) -> Result<Vec<MoodRecord>> {
        let filter = window(user_id, started_at, ended_at)?;
        Ok(self.records.list(&filter).await?)
    }

    pub async fn heatmap(
        &self,
        user_id: Uuid,
        started_at: Option<&str>,
        ended_at: Option<&str>,
    ) -> Result<Heatmap> {
        let filter = RecordFilter {
            // The running mean is order-sensitive; fold in creation order
            ascending: true,
            ..window(user_id, started_at, ended_at)?
        };
        let records = self.records.list(&filter).await?;

        Ok(Heatmap {
            data: fold_heatmap(&records),
            total_records: records.len(),
            date_range: DateRange {
                started_at: filter.started_at.map(format_utc_rfc3339),
                ended_at: filter.ended_at.map(format_utc_rfc3339),
            },
        })
    }

    pub async fn streak(&self, user_id: Uuid) -> Result<Streak> {
        let days = self.records.distinct_days(user_id).await?;
        Ok(compute_streak(&days, Utc::now().date_naive()))
    }

    async fn fetch(&self, record_id: Uuid) -> Result<MoodRecord> {
        self.records.get(record_id).await.map_err(not_found)
    }

    async fn owned(&self, user_id: Uuid, record_id: Uuid, access: Access) -> Result<MoodRecord> {
        let record = self.fetch(record_id).await?;
        if !record.is_owned_by(user_id) {
            tracing::warn!(
                record_id = %record_id,
                user_id = %user_id,
                ?access,
                "Record access denied"
            );
            return Err(access.denied());
        }
        Ok(record)
    }
}

fn not_found(err: StoreError) -> AppError {
    match err {
        StoreError::NotFound(_) => AppError::NotFound("Record not found".to_string()),
        other => other.into(),
    }
}

fn window(user_id: Uuid, started_at: Option<&str>, ended_at: Option<&str>) -> Result<RecordFilter> {
    Ok(RecordFilter {
        started_at: parse_bound(started_at, "start")?,
        ended_at: parse_bound(ended_at, "end")?,
        ..RecordFilter::for_user(user_id)
    })
}

/// Bucket records by UTC day, admitting each into its day's running mean in
/// the order given.
pub fn fold_heatmap(records: &[MoodRecord]) -> BTreeMap<String, HeatmapBucket> {
    let mut buckets: BTreeMap<String, HeatmapBucket> = BTreeMap::new();
    for record in records {
        buckets
            .entry(format_day(record.created_at.date_naive()))
            .or_default()
            .admit(
                i64::from(record.happy_level.value()),
                i64::from(record.energy_level.value()),
            );
    }
    buckets
}

/// Consecutive-day streak ending at the newest day, which must be `today` or
/// the day before. `days` is newest first without duplicates.
pub fn compute_streak(days: &[NaiveDate], today: NaiveDate) -> Streak {
    let Some(&latest) = days.first() else {
        return Streak {
            streak: 0,
            last_entry_date: None,
        };
    };
    let last_entry_date = Some(format_day(latest));

    if latest != today && latest != today - Duration::days(1) {
        return Streak {
            streak: 0,
            last_entry_date,
        };
    }

    let mut streak = 1;
    for pair in days.windows(2) {
        if pair[1] != pair[0] - Duration::days(1) {
            break;
        }
        streak += 1;
    }

    Streak {
        streak,
        last_entry_date,
    }
}
