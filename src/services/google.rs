// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth2 authorization-code exchange.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::Config;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const SCOPES: &str = "openid email profile";

/// Profile returned by an identity provider after a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProfile {
    pub external_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub picture: Option<String>,
    pub email_verified: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Provider answered with a non-2xx status or could not be reached.
    #[error("identity provider error: {0}")]
    Upstream(String),

    /// Provider rejected the authorization code (`invalid_grant`).
    #[error("authorization code rejected")]
    InvalidCode,

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// An external identity provider using the authorization-code flow.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Provider name as used in routes and stored in `auth_provider`.
    fn name(&self) -> &'static str;

    fn authorization_url(&self) -> String;

    async fn exchange(&self, code: &str) -> Result<ExternalProfile, OAuthError>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
}

#[derive(Deserialize)]
struct UserInfo {
    id: String,
    email: String,
    #[serde(default)]
    verified_email: bool,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
}

/// Google sign-in client.
#[derive(Clone)]
pub struct GoogleOAuth {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    token_url: String,
    userinfo_url: String,
}

impl GoogleOAuth {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.google_redirect_uri.clone(),
            token_url: TOKEN_URL.to_string(),
            userinfo_url: USERINFO_URL.to_string(),
        }
    }

    /// Point the exchange at different token and userinfo endpoints.
    pub fn with_endpoints(mut self, token_url: &str, userinfo_url: &str) -> Self {
        self.token_url = token_url.to_string();
        self.userinfo_url = userinfo_url.to_string();
        self
    }

    async fn exchange_code(&self, code: &str) -> Result<String, OAuthError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| OAuthError::Upstream(format!("token exchange failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if serde_json::from_str::<TokenErrorResponse>(&body)
                .is_ok_and(|err| err.error == "invalid_grant")
            {
                tracing::warn!("Google rejected authorization code");
                return Err(OAuthError::InvalidCode);
            }

            tracing::error!(status = %status, body = %body, "Google token exchange failed");
            return Err(OAuthError::Upstream(format!(
                "token exchange failed with status {status}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| OAuthError::Malformed(format!("token response: {e}")))?;
        Ok(token.access_token)
    }

    async fn fetch_userinfo(&self, access_token: &str) -> Result<UserInfo, OAuthError> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OAuthError::Upstream(format!("userinfo request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(status = %status, "Google userinfo request failed");
            return Err(OAuthError::Upstream(format!(
                "userinfo failed with status {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| OAuthError::Malformed(format!("userinfo response: {e}")))
    }
}

#[async_trait]
impl IdentityProvider for GoogleOAuth {
    fn name(&self) -> &'static str {
        "google"
    }

    fn authorization_url(&self) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&scope={}&response_type=code&access_type=offline",
            AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(SCOPES),
        )
    }

    async fn exchange(&self, code: &str) -> Result<ExternalProfile, OAuthError> {
        let access_token = self.exchange_code(code).await?;
        let info = self.fetch_userinfo(&access_token).await?;

        if info.email.is_empty() {
            return Err(OAuthError::Malformed("userinfo has no email".to_string()));
        }

        tracing::info!(google_id = %info.id, "Google profile fetched");
        Ok(ExternalProfile {
            external_id: info.id,
            email: info.email,
            first_name: info.given_name,
            last_name: info.family_name,
            picture: info.picture,
            email_verified: info.verified_email,
        })
    }
}
