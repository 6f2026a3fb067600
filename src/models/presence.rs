// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Online status entries kept in the presence store.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One user's presence. Serialized as JSON under `presence:user:<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineStatus {
    pub user_id: Uuid,
    pub user_email: String,
    pub is_online: bool,
    /// Unix seconds
    pub last_seen: i64,
}

impl OnlineStatus {
    pub fn online(user_id: Uuid, user_email: impl Into<String>) -> Self {
        Self {
            user_id,
            user_email: user_email.into(),
            is_online: true,
            last_seen: chrono::Utc::now().timestamp(),
        }
    }

    pub fn offline(user_id: Uuid, user_email: impl Into<String>) -> Self {
        Self {
            is_online: false,
            ..Self::online(user_id, user_email)
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = chrono::Utc::now().timestamp();
    }
}
