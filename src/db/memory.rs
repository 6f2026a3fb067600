// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process stores.
//!
//! Same contracts as the Postgres and Redis backends, without any external
//! service. Used by the test suite and for local experiments.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dashmap::{DashMap, DashSet};
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use crate::db::{
    PresenceStore, QuoteStore, RecordFilter, RecordStore, StoreError, StoreResult, TagStore,
    UserFilter, UserStore,
};
use crate::models::quote::{QuoteDraft, TagDraft};
use crate::models::{MoodRecord, OnlineStatus, Quote, Tag, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    records: HashMap<Uuid, MoodRecord>,
    quotes: BTreeMap<i64, Quote>,
    tags: BTreeMap<i64, Tag>,
    quote_tags: BTreeSet<(i64, i64)>,
    deleted_quotes: BTreeSet<i64>,
    deleted_tags: BTreeSet<i64>,
    next_quote_id: i64,
    next_tag_id: i64,
}

/// Relational store held in memory.
///
/// One lock guards all tables so uniqueness checks and inserts are atomic.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn live_user<'a>(tables: &'a Tables, filter: &UserFilter<'_>) -> Option<&'a User> {
    tables.users.values().find(|u| {
        !u.is_deleted()
            && match filter {
                UserFilter::Id(id) => u.id == *id,
                UserFilter::Email(email) => u.email == *email,
                UserFilter::Username(name) => u.username == *name,
            }
    })
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if live_user(&tables, &UserFilter::Email(&user.email)).is_some()
            || live_user(&tables, &UserFilter::Username(&user.username)).is_some()
        {
            return Err(StoreError::Conflict(
                "email or username already registered".to_string(),
            ));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<User> {
        self.find(UserFilter::Id(id))
            .await?
            .ok_or(StoreError::NotFound("User"))
    }

    async fn find(&self, filter: UserFilter<'_>) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(live_user(&tables, &filter).cloned())
    }

    async fn update(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let clash = tables.users.values().any(|u| {
            u.id != user.id
                && !u.is_deleted()
                && (u.email == user.email || u.username == user.username)
        });
        if clash {
            return Err(StoreError::Conflict(
                "email or username already registered".to_string(),
            ));
        }
        match tables.users.get_mut(&user.id) {
            Some(existing) if !existing.is_deleted() => {
                *existing = user.clone();
                Ok(())
            }
            _ => Err(StoreError::NotFound("User")),
        }
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some(user) if !user.is_deleted() => {
                let now = Utc::now();
                user.deleted_at = Some(now);
                user.is_active = false;
                user.updated_at = now;
                Ok(())
            }
            _ => Err(StoreError::NotFound("User")),
        }
    }

    async fn email_exists(&self, email: &str) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(live_user(&tables, &UserFilter::Email(email)).is_some())
    }

    async fn username_exists(&self, username: &str) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(live_user(&tables, &UserFilter::Username(username)).is_some())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, record: &MoodRecord) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.records.contains_key(&record.id) {
            return Err(StoreError::Conflict("record already exists".to_string()));
        }
        tables.records.insert(record.id, record.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<MoodRecord> {
        let tables = self.tables.read().await;
        tables
            .records
            .get(&id)
            .filter(|r| r.deleted_at.is_none())
            .cloned()
            .ok_or(StoreError::NotFound("Record"))
    }

    async fn update(&self, record: &MoodRecord) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.records.get_mut(&record.id) {
            Some(existing) if existing.deleted_at.is_none() => {
                existing.happy_level = record.happy_level;
                existing.energy_level = record.energy_level;
                existing.notes = record.notes.clone();
                existing.visibility = record.visibility;
                existing.updated_at = record.updated_at;
                Ok(())
            }
            _ => Err(StoreError::NotFound("Record")),
        }
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.records.get_mut(&id) {
            Some(record) if record.deleted_at.is_none() => {
                record.deleted_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(StoreError::NotFound("Record")),
        }
    }

    async fn list(&self, filter: &RecordFilter) -> StoreResult<Vec<MoodRecord>> {
        let tables = self.tables.read().await;
        let mut records: Vec<MoodRecord> = tables
            .records
            .values()
            .filter(|r| r.deleted_at.is_none())
            .filter(|r| filter.user_id.is_none_or(|id| r.user_id == id))
            .filter(|r| filter.contains(r.created_at))
            .cloned()
            .collect();

        records.sort_by_key(|r| r.created_at);
        if !filter.ascending {
            records.reverse();
        }

        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let limit = filter.limit.map_or(usize::MAX, |l| l.max(0) as usize);
        Ok(records.into_iter().skip(offset).take(limit).collect())
    }

    async fn distinct_days(&self, user_id: Uuid) -> StoreResult<Vec<NaiveDate>> {
        let tables = self.tables.read().await;
        let days: BTreeSet<NaiveDate> = tables
            .records
            .values()
            .filter(|r| r.user_id == user_id && r.deleted_at.is_none())
            .map(|r| r.created_at.date_naive())
            .collect();
        Ok(days.into_iter().rev().collect())
    }
}

#[async_trait]
impl QuoteStore for MemoryStore {
    async fn create(&self, draft: &QuoteDraft) -> StoreResult<Quote> {
        let mut tables = self.tables.write().await;
        tables.next_quote_id += 1;
        let now = Utc::now();
        let quote = Quote {
            id: tables.next_quote_id,
            content: draft.content.clone(),
            author: draft.author.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.quotes.insert(quote.id, quote.clone());
        Ok(quote)
    }

    async fn get(&self, id: i64) -> StoreResult<Quote> {
        let tables = self.tables.read().await;
        tables
            .quotes
            .get(&id)
            .filter(|_| !tables.deleted_quotes.contains(&id))
            .cloned()
            .ok_or(StoreError::NotFound("Quote"))
    }

    async fn list(&self) -> StoreResult<Vec<Quote>> {
        let tables = self.tables.read().await;
        Ok(tables
            .quotes
            .values()
            .filter(|q| !tables.deleted_quotes.contains(&q.id))
            .cloned()
            .collect())
    }

    async fn random(&self) -> StoreResult<Option<Quote>> {
        let quotes = QuoteStore::list(self).await?;
        Ok(quotes.choose(&mut rand::thread_rng()).cloned())
    }

    async fn update(&self, id: i64, draft: &QuoteDraft) -> StoreResult<Quote> {
        let mut tables = self.tables.write().await;
        if tables.deleted_quotes.contains(&id) {
            return Err(StoreError::NotFound("Quote"));
        }
        let quote = tables
            .quotes
            .get_mut(&id)
            .ok_or(StoreError::NotFound("Quote"))?;
        quote.content = draft.content.clone();
        quote.author = draft.author.clone();
        quote.updated_at = Utc::now();
        Ok(quote.clone())
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.quotes.contains_key(&id) || !tables.deleted_quotes.insert(id) {
            return Err(StoreError::NotFound("Quote"));
        }
        Ok(())
    }

    async fn tags_for(&self, quote_id: i64) -> StoreResult<Vec<Tag>> {
        let tables = self.tables.read().await;
        let mut tags: Vec<Tag> = tables
            .quote_tags
            .iter()
            .filter(|(q, t)| *q == quote_id && !tables.deleted_tags.contains(t))
            .filter_map(|(_, t)| tables.tags.get(t).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn add_tag(&self, quote_id: i64, tag_id: i64) -> StoreResult<()> {
        self.tables.write().await.quote_tags.insert((quote_id, tag_id));
        Ok(())
    }

    async fn remove_tag(&self, quote_id: i64, tag_id: i64) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .quote_tags
            .remove(&(quote_id, tag_id));
        Ok(())
    }
}

#[async_trait]
impl TagStore for MemoryStore {
    async fn create(&self, draft: &TagDraft) -> StoreResult<Tag> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .tags
            .values()
            .any(|t| t.name == draft.name && !tables.deleted_tags.contains(&t.id));
        if taken {
            return Err(StoreError::Conflict("tag already exists".to_string()));
        }
        tables.next_tag_id += 1;
        let now = Utc::now();
        let tag = Tag {
            id: tables.next_tag_id,
            name: draft.name.clone(),
            description: draft.description.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn get(&self, id: i64) -> StoreResult<Tag> {
        let tables = self.tables.read().await;
        tables
            .tags
            .get(&id)
            .filter(|_| !tables.deleted_tags.contains(&id))
            .cloned()
            .ok_or(StoreError::NotFound("Tag"))
    }

    async fn list(&self) -> StoreResult<Vec<Tag>> {
        let tables = self.tables.read().await;
        let mut tags: Vec<Tag> = tables
            .tags
            .values()
            .filter(|t| !tables.deleted_tags.contains(&t.id))
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn update(&self, id: i64, draft: &TagDraft) -> StoreResult<Tag> {
        let mut tables = self.tables.write().await;
        if tables.deleted_tags.contains(&id) || !tables.tags.contains_key(&id) {
            return Err(StoreError::NotFound("Tag"));
        }
        let taken = tables.tags.values().any(|t| {
            t.id != id && t.name == draft.name && !tables.deleted_tags.contains(&t.id)
        });
        if taken {
            return Err(StoreError::Conflict("tag already exists".to_string()));
        }
        let tag = tables
            .tags
            .get_mut(&id)
            .ok_or(StoreError::NotFound("Tag"))?;
        tag.name = draft.name.clone();
        tag.description = draft.description.clone();
        tag.updated_at = Utc::now();
        Ok(tag.clone())
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.tags.contains_key(&id) || !tables.deleted_tags.insert(id) {
            return Err(StoreError::NotFound("Tag"));
        }
        Ok(())
    }
}

// ─── Presence ────────────────────────────────────────────────

#[derive(Clone)]
struct PresenceEntry {
    status: OnlineStatus,
    expires_at: Instant,
}

/// Presence store with per-entry expiry, mirroring the Redis key layout:
/// a keyed entry per user plus a separate set of online ids.
#[derive(Clone, Default)]
pub struct MemoryPresenceStore {
    entries: Arc<DashMap<Uuid, PresenceEntry>>,
    online: Arc<DashSet<Uuid>>,
}

impl MemoryPresenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live entry, evicting it if its TTL elapsed.
    fn live(&self, user_id: Uuid) -> Option<OnlineStatus> {
        let now = Instant::now();
        let status = self
            .entries
            .get(&user_id)
            .filter(|e| e.expires_at > now)
            .map(|e| e.status.clone());
        if status.is_none() {
            self.entries.remove_if(&user_id, |_, e| e.expires_at <= now);
        }
        status
    }
}

#[async_trait]
impl PresenceStore for MemoryPresenceStore {
    async fn save(&self, status: &OnlineStatus, ttl: Duration) -> StoreResult<()> {
        self.entries.insert(
            status.user_id,
            PresenceEntry {
                status: status.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        if status.is_online {
            self.online.insert(status.user_id);
        } else {
            self.online.remove(&status.user_id);
        }
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> StoreResult<Option<OnlineStatus>> {
        Ok(self.live(user_id))
    }

    async fn list_online(&self) -> StoreResult<Vec<OnlineStatus>> {
        let ids: Vec<Uuid> = self.online.iter().map(|id| *id).collect();
        let mut statuses = Vec::with_capacity(ids.len());
        for id in ids {
            match self.live(id) {
                Some(status) => statuses.push(status),
                None => {
                    self.online.remove(&id);
                }
            }
        }
        Ok(statuses)
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(self.online.len() as i64)
    }

    async fn delete(&self, user_id: Uuid) -> StoreResult<()> {
        self.entries.remove(&user_id);
        self.online.remove(&user_id);
        Ok(())
    }

    async fn update_last_seen(&self, user_id: Uuid) -> StoreResult<()> {
        let now = Instant::now();
        if let Some(mut entry) = self.entries.get_mut(&user_id) {
            if entry.expires_at > now {
                entry.status.touch();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MoodLevel, Visibility};
    use chrono::{TimeZone, Utc};

    fn record_at(user_id: Uuid, y: i32, m: u32, d: u32, h: u32) -> MoodRecord {
        let mut record = MoodRecord::new(
            user_id,
            MoodLevel::new(5, "happy_level").unwrap(),
            MoodLevel::new(5, "energy_level").unwrap(),
            None,
            Visibility::Private,
        );
        record.created_at = Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap();
        record
    }

    #[tokio::test]
    async fn test_user_uniqueness_ignores_deleted() {
        let store = MemoryStore::new();
        let user = User::new_local("a@x.io".into(), "alice".into(), "h".into(), None, None);
        UserStore::create(&store, &user).await.unwrap();

        let dup = User::new_local("a@x.io".into(), "other".into(), "h".into(), None, None);
        assert!(matches!(
            UserStore::create(&store, &dup).await,
            Err(StoreError::Conflict(_))
        ));

        UserStore::delete(&store, user.id).await.unwrap();
        assert!(!store.email_exists("a@x.io").await.unwrap());
        UserStore::create(&store, &dup).await.unwrap();
        assert!(store.email_exists("a@x.io").await.unwrap());
    }

    #[tokio::test]
    async fn test_distinct_days_newest_first() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        for r in [
            record_at(user, 2024, 5, 1, 8),
            record_at(user, 2024, 5, 1, 22),
            record_at(user, 2024, 5, 3, 9),
            record_at(user, 2024, 4, 30, 23),
            record_at(Uuid::new_v4(), 2024, 5, 4, 9),
        ] {
            RecordStore::create(&store, &r).await.unwrap();
        }

        let days = store.distinct_days(user).await.unwrap();
        assert_eq!(
            days,
            vec![
                NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
                NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_ordering_and_pagination() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        for day in 1..=5 {
            RecordStore::create(&store, &record_at(user, 2024, 5, day, 12))
                .await
                .unwrap();
        }

        let newest_first = RecordStore::list(&store, &RecordFilter::for_user(user))
            .await
            .unwrap();
        assert_eq!(newest_first[0].created_at.date_naive().to_string(), "2024-05-05");

        let page = RecordStore::list(
            &store,
            &RecordFilter {
                ascending: true,
                limit: Some(2),
                offset: Some(1),
                ..RecordFilter::for_user(user)
            },
        )
        .await
        .unwrap();
        let days: Vec<String> = page
            .iter()
            .map(|r| r.created_at.date_naive().to_string())
            .collect();
        assert_eq!(days, vec!["2024-05-02", "2024-05-03"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_presence_entries_expire_and_set_self_heals() {
        let store = MemoryPresenceStore::new();
        let user = Uuid::new_v4();
        store
            .save(&OnlineStatus::online(user, "a@x.io"), Duration::from_secs(20))
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.list_online().await.unwrap().len(), 1);

        tokio::time::advance(Duration::from_secs(21)).await;

        assert!(store.get(user).await.unwrap().is_none());
        // Set drifts until the next list
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.list_online().await.unwrap().is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_presence_offline_save_removes_membership() {
        let store = MemoryPresenceStore::new();
        let user = Uuid::new_v4();
        let ttl = Duration::from_secs(20);
        store
            .save(&OnlineStatus::online(user, "a@x.io"), ttl)
            .await
            .unwrap();
        store
            .save(&OnlineStatus::offline(user, "a@x.io"), ttl)
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 0);
        let status = store.get(user).await.unwrap().unwrap();
        assert!(!status.is_online);
    }
}
