// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.
//!
//! Constructors validate their inputs so that a value of any of these types
//! already satisfies its invariants.

pub mod presence;
pub mod quote;
pub mod record;
pub mod user;

pub use presence::OnlineStatus;
pub use quote::{Quote, Tag};
pub use record::{MoodLevel, MoodRecord, Visibility};
pub use user::{AuthProvider, User};

/// A rejected input, carrying the message shown to API clients.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}
