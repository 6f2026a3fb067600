// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod google;
pub mod importer;
pub mod presence;
pub mod quotes;
pub mod records;
pub mod tags;
pub mod token;
pub mod users;

pub use auth::AuthService;
pub use google::{GoogleOAuth, IdentityProvider, OAuthError};
pub use presence::PresenceService;
pub use quotes::QuoteService;
pub use records::RecordService;
pub use tags::TagService;
pub use token::{TokenError, TokenService};
pub use users::UserService;
