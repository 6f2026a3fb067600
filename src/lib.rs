// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Peace: a mood journaling backend.
//!
//! This crate provides the HTTP API for accounts, mood records and the quote
//! library, plus a websocket presence service backed by a TTL store.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod time_utils;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use config::Config;
use db::{
    MemoryPresenceStore, MemoryStore, PresenceStore, QuoteStore, RecordStore, TagStore, UserStore,
};
use services::{
    AuthService, GoogleOAuth, IdentityProvider, PresenceService, QuoteService, RecordService,
    TagService, TokenService, UserService,
};

/// The backends every service is built on.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub records: Arc<dyn RecordStore>,
    pub quotes: Arc<dyn QuoteStore>,
    pub tags: Arc<dyn TagStore>,
    pub presence: Arc<dyn PresenceStore>,
}

impl Stores {
    /// In-process stores with no external services.
    pub fn in_memory() -> Self {
        let relational = Arc::new(MemoryStore::new());
        Self {
            users: relational.clone(),
            records: relational.clone(),
            quotes: relational.clone(),
            tags: relational,
            presence: Arc::new(MemoryPresenceStore::new()),
        }
    }
}

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub tokens: TokenService,
    pub auth: AuthService,
    pub users: UserService,
    pub records: RecordService,
    pub presence: PresenceService,
    pub quotes: QuoteService,
    pub tags: TagService,
    /// Cancelled once on SIGINT/SIGTERM; socket tasks watch it
    pub shutdown: CancellationToken,
    /// Upgraded presence sockets. `axum::serve` stops tracking a connection
    /// once it upgrades, so shutdown waits on this too.
    pub sockets: TaskTracker,
}

impl AppState {
    pub fn new(config: Config, stores: Stores, identity: Arc<dyn IdentityProvider>) -> Self {
        let tokens = TokenService::from_config(&config);
        Self {
            auth: AuthService::new(stores.users.clone(), tokens.clone(), identity),
            users: UserService::new(stores.users.clone()),
            records: RecordService::new(stores.records, stores.users),
            presence: PresenceService::new(stores.presence),
            quotes: QuoteService::new(stores.quotes, stores.tags.clone()),
            tags: TagService::new(stores.tags),
            tokens,
            config,
            shutdown: CancellationToken::new(),
            sockets: TaskTracker::new(),
        }
    }

    /// State over in-memory stores with the real Google client.
    pub fn in_memory(config: Config) -> Self {
        let google = Arc::new(GoogleOAuth::new(&config));
        Self::new(config, Stores::in_memory(), google)
    }
}
