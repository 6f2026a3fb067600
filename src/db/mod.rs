// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage layer: store traits plus Postgres, Redis and in-memory backends.
//!
//! Postgres holds users, records and the quote library. Redis holds presence.
//! The in-memory backends implement the same traits and back the test suite.

pub mod memory;
pub mod postgres;
pub mod presence;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::time::Duration;
use uuid::Uuid;

use crate::models::quote::{QuoteDraft, TagDraft};
use crate::models::{MoodRecord, OnlineStatus, Quote, Tag, User};

pub use memory::{MemoryPresenceStore, MemoryStore};
pub use postgres::PgStore;
pub use presence::RedisPresenceStore;

/// Errors surfaced by every store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// User lookup key.
#[derive(Debug, Clone, Copy)]
pub enum UserFilter<'a> {
    Id(Uuid),
    Email(&'a str),
    Username(&'a str),
}

/// Credential store. Soft-deleted users are invisible to every method.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` if the email or username is taken.
    async fn create(&self, user: &User) -> StoreResult<()>;
    async fn get(&self, id: Uuid) -> StoreResult<User>;
    async fn find(&self, filter: UserFilter<'_>) -> StoreResult<Option<User>>;
    async fn update(&self, user: &User) -> StoreResult<()>;
    /// Soft delete: frees the email and username for reuse.
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
    async fn email_exists(&self, email: &str) -> StoreResult<bool>;
    async fn username_exists(&self, username: &str) -> StoreResult<bool>;
}

/// Record query. Both bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub user_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Oldest first when set; newest first otherwise
    pub ascending: bool,
}

impl RecordFilter {
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    /// Whether a record timestamp falls inside the window.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.started_at.is_none_or(|start| at >= start)
            && self.ended_at.is_none_or(|end| at <= end)
    }
}

/// Mood record store. Soft-deleted records are invisible to every method.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create(&self, record: &MoodRecord) -> StoreResult<()>;
    async fn get(&self, id: Uuid) -> StoreResult<MoodRecord>;
    async fn update(&self, record: &MoodRecord) -> StoreResult<()>;
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
    async fn list(&self, filter: &RecordFilter) -> StoreResult<Vec<MoodRecord>>;
    /// Each UTC day with at least one record, newest first, no duplicates.
    async fn distinct_days(&self, user_id: Uuid) -> StoreResult<Vec<NaiveDate>>;
}

#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn create(&self, draft: &QuoteDraft) -> StoreResult<Quote>;
    async fn get(&self, id: i64) -> StoreResult<Quote>;
    async fn list(&self) -> StoreResult<Vec<Quote>>;
    async fn random(&self) -> StoreResult<Option<Quote>>;
    async fn update(&self, id: i64, draft: &QuoteDraft) -> StoreResult<Quote>;
    async fn delete(&self, id: i64) -> StoreResult<()>;
    async fn tags_for(&self, quote_id: i64) -> StoreResult<Vec<Tag>>;
    /// Idempotent.
    async fn add_tag(&self, quote_id: i64, tag_id: i64) -> StoreResult<()>;
    async fn remove_tag(&self, quote_id: i64, tag_id: i64) -> StoreResult<()>;
}

#[async_trait]
pub trait TagStore: Send + Sync {
    /// Fails with `Conflict` if the name is taken.
    async fn create(&self, draft: &TagDraft) -> StoreResult<Tag>;
    async fn get(&self, id: i64) -> StoreResult<Tag>;
    async fn list(&self) -> StoreResult<Vec<Tag>>;
    async fn update(&self, id: i64, draft: &TagDraft) -> StoreResult<Tag>;
    async fn delete(&self, id: i64) -> StoreResult<()>;
}

/// TTL-bounded presence registry.
///
/// Each user has one entry that expires after the TTL given to `save`, and the
/// set of online ids is reconciled against live entries by `list_online`.
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Write the entry with `ttl`; add to the online set iff `is_online`,
    /// remove otherwise.
    async fn save(&self, status: &OnlineStatus, ttl: Duration) -> StoreResult<()>;
    async fn get(&self, user_id: Uuid) -> StoreResult<Option<OnlineStatus>>;
    /// Live online entries. Ids whose entry expired are dropped from the set.
    async fn list_online(&self) -> StoreResult<Vec<OnlineStatus>>;
    /// Size of the online set; may briefly include expired ids.
    async fn count(&self) -> StoreResult<i64>;
    async fn delete(&self, user_id: Uuid) -> StoreResult<()>;
    /// Refresh `last_seen` keeping the remaining TTL. No-op if absent.
    async fn update_last_seen(&self, user_id: Uuid) -> StoreResult<()>;
}

/// Redis key names.
pub mod keys {
    use std::fmt::Display;

    pub const ONLINE_SET: &str = "presence:online";

    pub fn user(user_id: impl Display) -> String {
        format!("presence:user:{user_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_filter_bounds_are_inclusive() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 31, 23, 59, 59).unwrap();
        let filter = RecordFilter {
            started_at: Some(start),
            ended_at: Some(end),
            ..RecordFilter::default()
        };

        assert!(filter.contains(start));
        assert!(filter.contains(end));
        assert!(!filter.contains(start - chrono::Duration::seconds(1)));
        assert!(!filter.contains(end + chrono::Duration::seconds(1)));
        assert!(RecordFilter::default().contains(start));
    }

    #[test]
    fn test_presence_keys() {
        let id = Uuid::nil();
        assert_eq!(
            keys::user(id),
            "presence:user:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(keys::ONLINE_SET, "presence:online");
    }
}
