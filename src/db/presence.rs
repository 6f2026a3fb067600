// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Redis-backed presence store.
//!
//! Layout:
//! - `presence:user:<id>`: JSON [`OnlineStatus`] with a TTL
//! - `presence:online`: set of user ids believed online (no TTL)

use anyhow::Context;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use uuid::Uuid;

use crate::db::{keys, PresenceStore, StoreError, StoreResult};
use crate::models::OnlineStatus;

#[derive(Clone)]
pub struct RedisPresenceStore {
    conn: ConnectionManager,
}

impl RedisPresenceStore {
    /// Connect and verify the server answers `PING`.
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url).context("invalid Redis URL")?;
        let mut conn = ConnectionManager::new(client)
            .await
            .context("failed to connect to Redis")?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("Redis PING failed")?;

        tracing::info!("Connected to Redis");
        Ok(Self { conn })
    }
}

fn redis_err(e: redis::RedisError, context: &'static str) -> StoreError {
    StoreError::Backend(anyhow::Error::new(e).context(context))
}

fn decode(raw: &str) -> StoreResult<OnlineStatus> {
    serde_json::from_str(raw)
        .context("corrupt presence entry")
        .map_err(StoreError::Backend)
}

fn encode(status: &OnlineStatus) -> StoreResult<String> {
    serde_json::to_string(status)
        .context("encode presence entry")
        .map_err(StoreError::Backend)
}

#[async_trait]
impl PresenceStore for RedisPresenceStore {
    async fn save(&self, status: &OnlineStatus, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let key = keys::user(status.user_id);
        let member = status.user_id.to_string();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .set_ex(&key, encode(status)?, ttl.as_secs().max(1))
            .ignore();
        if status.is_online {
            pipe.sadd(keys::ONLINE_SET, &member).ignore();
        } else {
            pipe.srem(keys::ONLINE_SET, &member).ignore();
        }

        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_err(e, "save presence"))?;
        Ok(())
    }

    async fn get(&self, user_id: Uuid) -> StoreResult<Option<OnlineStatus>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(keys::user(user_id))
            .await
            .map_err(|e| redis_err(e, "get presence"))?;
        raw.as_deref().map(decode).transpose()
    }

    async fn list_online(&self) -> StoreResult<Vec<OnlineStatus>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn
            .smembers(keys::ONLINE_SET)
            .await
            .map_err(|e| redis_err(e, "read online set"))?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let entry_keys: Vec<String> = ids.iter().map(|id| keys::user(id)).collect();
        let values: Vec<Option<String>> = conn
            .mget(&entry_keys)
            .await
            .map_err(|e| redis_err(e, "read presence entries"))?;

        let mut statuses = Vec::with_capacity(ids.len());
        let mut stale = Vec::new();
        for (id, value) in ids.into_iter().zip(values) {
            match value {
                Some(raw) => statuses.push(decode(&raw)?),
                None => stale.push(id),
            }
        }

        if !stale.is_empty() {
            tracing::debug!(count = stale.len(), "Removing expired ids from online set");
            let _: () = conn
                .srem(keys::ONLINE_SET, &stale)
                .await
                .map_err(|e| redis_err(e, "prune online set"))?;
        }

        Ok(statuses)
    }

    async fn count(&self) -> StoreResult<i64> {
        let mut conn = self.conn.clone();
        conn.scard(keys::ONLINE_SET)
            .await
            .map_err(|e| redis_err(e, "count online set"))
    }

    async fn delete(&self, user_id: Uuid) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .del(keys::user(user_id))
            .ignore()
            .srem(keys::ONLINE_SET, user_id.to_string())
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_err(e, "delete presence"))?;
        Ok(())
    }

    async fn update_last_seen(&self, user_id: Uuid) -> StoreResult<()> {
        let Some(mut status) = self.get(user_id).await? else {
            return Ok(());
        };
        status.touch();

        let mut conn = self.conn.clone();
        // KEEPTTL (Redis 6+) leaves the heartbeat-driven expiry untouched
        let _: () = redis::cmd("SET")
            .arg(keys::user(user_id))
            .arg(encode(&status)?)
            .arg("KEEPTTL")
            .arg("XX")
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_err(e, "update last seen"))?;
        Ok(())
    }
}
