// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Postgres store with typed operations.
//!
//! Provides the user, mood record, quote and tag stores over one pool.
//! Every table is soft-deleted through its `deleted_at` column.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::time::Duration;
use uuid::Uuid;

use crate::db::{
    QuoteStore, RecordFilter, RecordStore, StoreError, StoreResult, TagStore, UserFilter,
    UserStore,
};
use crate::models::quote::{QuoteDraft, TagDraft};
use crate::models::user::AuthProvider;
use crate::models::{MoodLevel, MoodRecord, Quote, Tag, User, Visibility};

const MAX_CONNECTIONS: u32 = 20;

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to Postgres.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .context("failed to connect to Postgres")?;

        tracing::info!("Connected to Postgres");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply embedded migrations.
    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("failed to run migrations")?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Wrap a driver error, mapping unique violations to `Conflict`.
fn db_err(e: sqlx::Error, context: &'static str, conflict: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::Conflict(conflict.to_string());
        }
    }
    StoreError::Backend(anyhow::Error::new(e).context(context))
}

fn backend(e: sqlx::Error, context: &'static str) -> StoreError {
    StoreError::Backend(anyhow::Error::new(e).context(context))
}

// ─── Row structs ─────────────────────────────────────────────

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    username: String,
    first_name: Option<String>,
    last_name: Option<String>,
    password_hash: Option<String>,
    is_active: bool,
    email_verified: bool,
    auth_provider: String,
    google_id: Option<String>,
    google_picture: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl UserRow {
    fn to_domain(self) -> StoreResult<User> {
        let auth_provider = AuthProvider::parse(&self.auth_provider).ok_or_else(|| {
            StoreError::Backend(anyhow::anyhow!(
                "unknown auth provider '{}' for user {}",
                self.auth_provider,
                self.id
            ))
        })?;
        Ok(User {
            id: self.id,
            email: self.email,
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            password_hash: self.password_hash,
            is_active: self.is_active,
            email_verified: self.email_verified,
            auth_provider,
            google_id: self.google_id,
            google_picture: self.google_picture,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

#[derive(FromRow)]
struct RecordRow {
    id: Uuid,
    user_id: Uuid,
    happy_level: i16,
    energy_level: i16,
    notes: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl RecordRow {
    fn to_domain(self) -> StoreResult<MoodRecord> {
        let corrupt = |e: crate::models::ValidationError| {
            StoreError::Backend(anyhow::anyhow!("corrupt record {}: {}", self.id, e))
        };
        Ok(MoodRecord {
            id: self.id,
            user_id: self.user_id,
            happy_level: MoodLevel::new(self.happy_level.into(), "happy_level").map_err(corrupt)?,
            energy_level: MoodLevel::new(self.energy_level.into(), "energy_level")
                .map_err(corrupt)?,
            notes: self.notes.filter(|n| !n.is_empty()),
            visibility: Visibility::parse(&self.status).map_err(corrupt)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

#[derive(FromRow)]
struct QuoteRow {
    id: i64,
    content: String,
    author: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl QuoteRow {
    fn to_domain(self) -> Quote {
        Quote {
            id: self.id,
            content: self.content,
            author: self.author,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct TagRow {
    id: i64,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TagRow {
    fn to_domain(self) -> Tag {
        Tag {
            id: self.id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const USER_COLUMNS: &str = "id, email, username, first_name, last_name, password_hash, \
     is_active, email_verified, auth_provider, google_id, google_picture, \
     created_at, updated_at, deleted_at";

const RECORD_COLUMNS: &str =
    "id, user_id, happy_level, energy_level, notes, status, created_at, updated_at, deleted_at";

// ─── User Operations ─────────────────────────────────────────

#[async_trait]
impl UserStore for PgStore {
    async fn create(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, email, username, first_name, last_name, password_hash, \
             is_active, email_verified, auth_provider, google_id, google_picture, \
             created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.email_verified)
        .bind(user.auth_provider.as_str())
        .bind(&user.google_id)
        .bind(&user.google_picture)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err(e, "insert user", "email or username already registered"))?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<User> {
        self.find(UserFilter::Id(id))
            .await?
            .ok_or(StoreError::NotFound("User"))
    }

    async fn find(&self, filter: UserFilter<'_>) -> StoreResult<Option<User>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL AND "
        ));
        match filter {
            UserFilter::Id(id) => qb.push("id = ").push_bind(id),
            UserFilter::Email(email) => qb.push("email = ").push_bind(email.to_string()),
            UserFilter::Username(name) => qb.push("username = ").push_bind(name.to_string()),
        };

        let row = qb
            .build_query_as::<UserRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| backend(e, "select user"))?;
        row.map(UserRow::to_domain).transpose()
    }

    async fn update(&self, user: &User) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET email = $2, username = $3, first_name = $4, last_name = $5, \
             password_hash = $6, is_active = $7, email_verified = $8, auth_provider = $9, \
             google_id = $10, google_picture = $11, updated_at = $12, deleted_at = $13 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.email_verified)
        .bind(user.auth_provider.as_str())
        .bind(&user.google_id)
        .bind(&user.google_picture)
        .bind(user.updated_at)
        .bind(user.deleted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err(e, "update user", "email or username already registered"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("User"));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = NOW(), is_active = FALSE, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| backend(e, "delete user"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("User"));
        }
        Ok(())
    }

    async fn email_exists(&self, email: &str) -> StoreResult<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 AND deleted_at IS NULL)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| backend(e, "check email"))
    }

    async fn username_exists(&self, username: &str) -> StoreResult<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 AND deleted_at IS NULL)",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| backend(e, "check username"))
    }
}

// ─── Record Operations ───────────────────────────────────────

#[async_trait]
impl RecordStore for PgStore {
    async fn create(&self, record: &MoodRecord) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO mental_health_records \
             (id, user_id, happy_level, energy_level, notes, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(record.happy_level.value())
        .bind(record.energy_level.value())
        .bind(&record.notes)
        .bind(record.visibility.as_str())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err(e, "insert record", "record already exists"))?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<MoodRecord> {
        let row: Option<RecordRow> = sqlx::query_as(&format!(
            "SELECT {RECORD_COLUMNS} FROM mental_health_records \
             WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| backend(e, "select record"))?;

        row.ok_or(StoreError::NotFound("Record"))?.to_domain()
    }

    async fn update(&self, record: &MoodRecord) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE mental_health_records \
             SET happy_level = $2, energy_level = $3, notes = $4, status = $5, updated_at = $6 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(record.id)
        .bind(record.happy_level.value())
        .bind(record.energy_level.value())
        .bind(&record.notes)
        .bind(record.visibility.as_str())
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| backend(e, "update record"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Record"));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE mental_health_records SET deleted_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| backend(e, "delete record"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Record"));
        }
        Ok(())
    }

    async fn list(&self, filter: &RecordFilter) -> StoreResult<Vec<MoodRecord>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {RECORD_COLUMNS} FROM mental_health_records WHERE deleted_at IS NULL"
        ));
        if let Some(user_id) = filter.user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(start) = filter.started_at {
            qb.push(" AND created_at >= ").push_bind(start);
        }
        if let Some(end) = filter.ended_at {
            qb.push(" AND created_at <= ").push_bind(end);
        }
        qb.push(if filter.ascending {
            " ORDER BY created_at ASC"
        } else {
            " ORDER BY created_at DESC"
        });
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
        if let Some(offset) = filter.offset {
            qb.push(" OFFSET ").push_bind(offset);
        }

        let rows = qb
            .build_query_as::<RecordRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| backend(e, "list records"))?;

        rows.into_iter().map(RecordRow::to_domain).collect()
    }

    async fn distinct_days(&self, user_id: Uuid) -> StoreResult<Vec<NaiveDate>> {
        sqlx::query_scalar(
            "SELECT DISTINCT (created_at AT TIME ZONE 'UTC')::date AS day \
             FROM mental_health_records \
             WHERE user_id = $1 AND deleted_at IS NULL \
             ORDER BY day DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| backend(e, "select distinct record days"))
    }
}

// ─── Quote Operations ────────────────────────────────────────

#[async_trait]
impl QuoteStore for PgStore {
    async fn create(&self, draft: &QuoteDraft) -> StoreResult<Quote> {
        let row: QuoteRow = sqlx::query_as(
            "INSERT INTO quotes (content, author) VALUES ($1, $2) \
             RETURNING id, content, author, created_at, updated_at",
        )
        .bind(&draft.content)
        .bind(&draft.author)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| backend(e, "insert quote"))?;
        Ok(row.to_domain())
    }

    async fn get(&self, id: i64) -> StoreResult<Quote> {
        let row: Option<QuoteRow> = sqlx::query_as(
            "SELECT id, content, author, created_at, updated_at FROM quotes \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| backend(e, "select quote"))?;
        row.map(QuoteRow::to_domain)
            .ok_or(StoreError::NotFound("Quote"))
    }

    async fn list(&self) -> StoreResult<Vec<Quote>> {
        let rows: Vec<QuoteRow> = sqlx::query_as(
            "SELECT id, content, author, created_at, updated_at FROM quotes \
             WHERE deleted_at IS NULL ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| backend(e, "list quotes"))?;
        Ok(rows.into_iter().map(QuoteRow::to_domain).collect())
    }

    async fn random(&self) -> StoreResult<Option<Quote>> {
        let row: Option<QuoteRow> = sqlx::query_as(
            "SELECT id, content, author, created_at, updated_at FROM quotes \
             WHERE deleted_at IS NULL ORDER BY RANDOM() LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| backend(e, "select random quote"))?;
        Ok(row.map(QuoteRow::to_domain))
    }

    async fn update(&self, id: i64, draft: &QuoteDraft) -> StoreResult<Quote> {
        let row: Option<QuoteRow> = sqlx::query_as(
            "UPDATE quotes SET content = $2, author = $3, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING id, content, author, created_at, updated_at",
        )
        .bind(id)
        .bind(&draft.content)
        .bind(&draft.author)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| backend(e, "update quote"))?;
        row.map(QuoteRow::to_domain)
            .ok_or(StoreError::NotFound("Quote"))
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE quotes SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| backend(e, "delete quote"))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Quote"));
        }
        Ok(())
    }

    async fn tags_for(&self, quote_id: i64) -> StoreResult<Vec<Tag>> {
        let rows: Vec<TagRow> = sqlx::query_as(
            "SELECT t.id, t.name, t.description, t.created_at, t.updated_at \
             FROM tags t JOIN quote_tags qt ON qt.tag_id = t.id \
             WHERE qt.quote_id = $1 AND t.deleted_at IS NULL ORDER BY t.name",
        )
        .bind(quote_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| backend(e, "select quote tags"))?;
        Ok(rows.into_iter().map(TagRow::to_domain).collect())
    }

    async fn add_tag(&self, quote_id: i64, tag_id: i64) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO quote_tags (quote_id, tag_id) VALUES ($1, $2) \
             ON CONFLICT (quote_id, tag_id) DO NOTHING",
        )
        .bind(quote_id)
        .bind(tag_id)
        .execute(&self.pool)
        .await
        .map_err(|e| backend(e, "insert quote tag"))?;
        Ok(())
    }

    async fn remove_tag(&self, quote_id: i64, tag_id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM quote_tags WHERE quote_id = $1 AND tag_id = $2")
            .bind(quote_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await
            .map_err(|e| backend(e, "delete quote tag"))?;
        Ok(())
    }
}

// ─── Tag Operations ──────────────────────────────────────────

#[async_trait]
impl TagStore for PgStore {
    async fn create(&self, draft: &TagDraft) -> StoreResult<Tag> {
        let row: TagRow = sqlx::query_as(
            "INSERT INTO tags (name, description) VALUES ($1, $2) \
             RETURNING id, name, description, created_at, updated_at",
        )
        .bind(&draft.name)
        .bind(&draft.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_err(e, "insert tag", "tag already exists"))?;
        Ok(row.to_domain())
    }

    async fn get(&self, id: i64) -> StoreResult<Tag> {
        let row: Option<TagRow> = sqlx::query_as(
            "SELECT id, name, description, created_at, updated_at FROM tags \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| backend(e, "select tag"))?;
        row.map(TagRow::to_domain).ok_or(StoreError::NotFound("Tag"))
    }

    async fn list(&self) -> StoreResult<Vec<Tag>> {
        let rows: Vec<TagRow> = sqlx::query_as(
            "SELECT id, name, description, created_at, updated_at FROM tags \
             WHERE deleted_at IS NULL ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| backend(e, "list tags"))?;
        Ok(rows.into_iter().map(TagRow::to_domain).collect())
    }

    async fn update(&self, id: i64, draft: &TagDraft) -> StoreResult<Tag> {
        let row: Option<TagRow> = sqlx::query_as(
            "UPDATE tags SET name = $2, description = $3, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING id, name, description, created_at, updated_at",
        )
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err(e, "update tag", "tag already exists"))?;
        row.map(TagRow::to_domain).ok_or(StoreError::NotFound("Tag"))
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE tags SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| backend(e, "delete tag"))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Tag"));
        }
        Ok(())
    }
}
