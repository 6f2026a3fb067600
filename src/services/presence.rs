// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Online presence on top of a TTL store.
//!
//! A connected socket saves its user online with [`PRESENCE_TTL`] and
//! re-saves on every heartbeat tick, so an entry outlives a missed tick but not
//! a dead task. Closing the socket saves the user offline right away.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::db::{PresenceStore, StoreResult};
use crate::models::OnlineStatus;

/// Interval between server pings and TTL refreshes.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Lifetime of a presence entry. At least twice the heartbeat.
pub const PRESENCE_TTL: Duration = Duration::from_secs(20);

#[derive(Clone)]
pub struct PresenceService {
    store: Arc<dyn PresenceStore>,
    connections: Arc<AtomicUsize>,
}

/// Held by a socket task for its lifetime; counts open sockets.
pub struct ConnectionGuard {
    connections: Arc<AtomicUsize>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.connections.fetch_sub(1, Ordering::Relaxed);
    }
}

impl PresenceService {
    pub fn new(store: Arc<dyn PresenceStore>) -> Self {
        Self {
            store,
            connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Mark the user online and register the socket.
    pub async fn connect(&self, user_id: Uuid, email: &str) -> StoreResult<ConnectionGuard> {
        self.store
            .save(&OnlineStatus::online(user_id, email), PRESENCE_TTL)
            .await?;
        self.connections.fetch_add(1, Ordering::Relaxed);
        tracing::info!(user_id = %user_id, "User online");
        Ok(ConnectionGuard {
            connections: self.connections.clone(),
        })
    }

    /// Re-save the online entry, restarting its TTL.
    pub async fn heartbeat(&self, user_id: Uuid, email: &str) -> StoreResult<()> {
        self.store
            .save(&OnlineStatus::online(user_id, email), PRESENCE_TTL)
            .await
    }

    pub async fn touch(&self, user_id: Uuid) -> StoreResult<()> {
        self.store.update_last_seen(user_id).await
    }

    /// Flip the user offline without waiting for the TTL.
    pub async fn disconnect(&self, user_id: Uuid, email: &str) -> StoreResult<()> {
        self.store
            .save(&OnlineStatus::offline(user_id, email), PRESENCE_TTL)
            .await?;
        tracing::info!(user_id = %user_id, "User offline");
        Ok(())
    }

    pub async fn status(&self, user_id: Uuid) -> StoreResult<Option<OnlineStatus>> {
        self.store.get(user_id).await
    }

    pub async fn online_count(&self) -> StoreResult<i64> {
        self.store.count().await
    }

    pub async fn online_users(&self) -> StoreResult<Vec<OnlineStatus>> {
        self.store.list_online().await
    }

    /// Sockets open in this process.
    pub fn open_connections(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryPresenceStore;

    #[tokio::test(start_paused = true)]
    async fn test_missed_heartbeats_expire_presence() {
        let presence = PresenceService::new(Arc::new(MemoryPresenceStore::new()));
        let user = Uuid::new_v4();
        let _guard = presence.connect(user, "a@x.io").await.unwrap();

        tokio::time::advance(HEARTBEAT_INTERVAL).await;
        presence.heartbeat(user, "a@x.io").await.unwrap();
        tokio::time::advance(HEARTBEAT_INTERVAL + Duration::from_secs(5)).await;
        assert_eq!(presence.online_users().await.unwrap().len(), 1);

        tokio::time::advance(PRESENCE_TTL).await;
        assert!(presence.online_users().await.unwrap().is_empty());
        assert_eq!(presence.online_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_is_immediate() {
        let presence = PresenceService::new(Arc::new(MemoryPresenceStore::new()));
        let user = Uuid::new_v4();
        let guard = presence.connect(user, "a@x.io").await.unwrap();
        assert_eq!(presence.open_connections(), 1);
        assert_eq!(presence.online_count().await.unwrap(), 1);

        presence.disconnect(user, "a@x.io").await.unwrap();
        drop(guard);

        assert_eq!(presence.online_count().await.unwrap(), 0);
        assert_eq!(presence.open_connections(), 0);
        assert!(!presence.status(user).await.unwrap().unwrap().is_online);
    }
}
