// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed bearer tokens.
//!
//! Access and refresh tokens are both HS256 JWTs signed with the same secret.
//! The `type` claim keeps them from being used in place of each other.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::config::Config;

/// Accepted clock skew, in seconds.
pub const LEEWAY_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub email: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,

    #[error("token expired")]
    Expired,

    #[error("expected {expected:?} token")]
    WrongType { expected: TokenKind },

    #[error("failed to sign token: {0}")]
    Mint(#[source] jsonwebtoken::errors::Error),
}

/// An access token together with its refresh token.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Mints and validates tokens. Holds no mutable state.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.jwt_secret,
            config.jwt_expiration,
            config.jwt_refresh_expiration,
        )
    }

    pub fn mint_access(&self, user_id: Uuid, email: &str) -> Result<String, TokenError> {
        self.mint(user_id, email, TokenKind::Access)
    }

    pub fn mint_refresh(&self, user_id: Uuid, email: &str) -> Result<String, TokenError> {
        self.mint(user_id, email, TokenKind::Refresh)
    }

    pub fn mint_pair(&self, user_id: Uuid, email: &str) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.mint_access(user_id, email)?,
            refresh_token: self.mint_refresh(user_id, email)?,
        })
    }

    pub fn validate_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate(token, TokenKind::Access)
    }

    pub fn validate_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate(token, TokenKind::Refresh)
    }

    fn mint(&self, user_id: Uuid, email: &str, kind: TokenKind) -> Result<String, TokenError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            user_id,
            email: email.to_string(),
            kind,
            iat: now,
            exp: now + ttl.as_secs() as i64,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Mint)
    }

    fn validate(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = LEEWAY_SECS;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;

        if data.claims.kind != expected {
            return Err(TokenError::WrongType { expected });
        }
        Ok(data.claims)
    }
}
