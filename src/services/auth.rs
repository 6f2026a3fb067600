// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration, login, token refresh and provider sign-in.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::Arc;

use crate::db::{StoreError, UserFilter, UserStore};
use crate::error::{AppError, Result};
use crate::models::user::{
    normalize_email, provider_name_or_default, username_from_email, username_with_suffix,
    validate_name, validate_password, validate_username,
};
use crate::models::User;
use crate::services::google::{IdentityProvider, OAuthError};
use crate::services::token::{TokenPair, TokenService};

/// The only message returned for any failed password login.
pub const INVALID_CREDENTIALS: &str = "invalid email or password";

/// Collision retries when deriving a username for a provider sign-in.
pub const MAX_USERNAME_ATTEMPTS: u32 = 1000;

/// Input for [`AuthService::register`].
#[derive(Debug, Clone)]
pub struct RegisterCommand {
    pub email: String,
    pub username: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// A signed-in user and their fresh tokens.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: TokenService,
    identity: Arc<dyn IdentityProvider>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: TokenService,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            users,
            tokens,
            identity,
        }
    }

    // ─── Password accounts ───────────────────────────────────────

    pub async fn register(&self, cmd: RegisterCommand) -> Result<User> {
        let email = normalize_email(&cmd.email)?;
        let username = validate_username(&cmd.username)?;
        validate_password(&cmd.password)?;
        let first_name = validate_name(cmd.first_name.as_deref(), "first name")?;
        let last_name = validate_name(cmd.last_name.as_deref(), "last name")?;

        if self.users.email_exists(&email).await? {
            return Err(AppError::Conflict("email already registered".to_string()));
        }
        if self.users.username_exists(&username).await? {
            return Err(AppError::Conflict("username already taken".to_string()));
        }

        let password_hash = hash_password(cmd.password).await?;
        let user = User::new_local(email, username, password_hash, first_name, last_name);

        // A concurrent registration can still win between the check and insert
        match self.users.create(&user).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                return Err(if self.users.email_exists(&user.email).await? {
                    AppError::Conflict("email already registered".to_string())
                } else {
                    AppError::Conflict("username already taken".to_string())
                });
            }
            Err(other) => return Err(other.into()),
        }

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        let invalid = || AppError::Unauthorized(INVALID_CREDENTIALS.to_string());

        let email = normalize_email(email).map_err(|_| invalid())?;
        let Some(user) = self.users.find(UserFilter::Email(&email)).await? else {
            tracing::warn!("Login for unknown email");
            return Err(invalid());
        };

        if !user.can_authenticate() {
            tracing::warn!(user_id = %user.id, "Login for deactivated account");
            return Err(invalid());
        }

        let Some(hash) = user.password_hash.clone() else {
            tracing::warn!(user_id = %user.id, "Password login for provider-only account");
            return Err(invalid());
        };
        if !verify_password(password.to_string(), hash).await? {
            tracing::warn!(user_id = %user.id, "Login with wrong password");
            return Err(invalid());
        }

        let tokens = self.mint(&user)?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(LoginOutcome { user, tokens })
    }

    /// Rotate tokens. Only the refresh token decides; the old one stays valid
    /// until it expires.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.tokens.validate_refresh(refresh_token).map_err(|e| {
            tracing::warn!(error = %e, "Refresh token rejected");
            AppError::Unauthorized("invalid refresh token".to_string())
        })?;

        self.tokens
            .mint_pair(claims.user_id, &claims.email)
            .map_err(|e| AppError::Internal(e.into()))
    }

    // ─── Identity provider ───────────────────────────────────────

    /// Authorization URL for `provider`, or `NotFound` if unsupported.
    pub fn authorization_url(&self, provider: &str) -> Result<String> {
        self.check_provider(provider)?;
        Ok(self.identity.authorization_url())
    }

    pub async fn login_with_provider(&self, provider: &str, code: &str) -> Result<LoginOutcome> {
        self.check_provider(provider)?;
        if code.trim().is_empty() {
            return Err(AppError::Validation("code is required".to_string()));
        }

        let profile = self.identity.exchange(code).await.map_err(|e| match e {
            OAuthError::InvalidCode => {
                AppError::Unauthorized("invalid authorization code".to_string())
            }
            OAuthError::Upstream(msg) | OAuthError::Malformed(msg) => AppError::Upstream(msg),
        })?;

        let email = normalize_email(&profile.email)
            .map_err(|e| AppError::Upstream(format!("provider returned {e}")))?;

        let user = match self.users.find(UserFilter::Email(&email)).await? {
            Some(mut user) => {
                if !user.can_authenticate() {
                    return Err(AppError::Unauthorized(
                        "user account is deactivated".to_string(),
                    ));
                }
                if user.google_id.is_none() {
                    user.google_id = Some(profile.external_id.clone());
                    user.google_picture = profile.picture.clone();
                    user.email_verified = true;
                    user.updated_at = chrono::Utc::now();
                    self.users.update(&user).await?;
                    tracing::info!(user_id = %user.id, "Linked provider identity");
                }
                user
            }
            None => {
                let username = self.available_username(&email).await?;
                let user = User::new_google(
                    email,
                    username,
                    provider_name_or_default(profile.first_name.as_deref(), "first name"),
                    provider_name_or_default(profile.last_name.as_deref(), "last name"),
                    profile.external_id,
                    profile.picture,
                );
                self.users.create(&user).await?;
                tracing::info!(user_id = %user.id, provider, "User created from provider sign-in");
                user
            }
        };

        let tokens = self.mint(&user)?;
        Ok(LoginOutcome { user, tokens })
    }

    fn check_provider(&self, provider: &str) -> Result<()> {
        if provider != self.identity.name() {
            return Err(AppError::NotFound("unsupported provider".to_string()));
        }
        Ok(())
    }

    /// First free username of `base`, `base_1`, `base_2`, ...
    async fn available_username(&self, email: &str) -> Result<String> {
        let base = username_from_email(email);
        if !self.users.username_exists(&base).await? {
            return Ok(base);
        }
        for n in 1..=MAX_USERNAME_ATTEMPTS {
            let candidate = username_with_suffix(&base, n);
            if !self.users.username_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(AppError::Internal(anyhow::anyhow!(
            "no free username for base '{base}' after {MAX_USERNAME_ATTEMPTS} attempts"
        )))
    }

    fn mint(&self, user: &User) -> Result<TokenPair> {
        self.tokens
            .mint_pair(user.id, &user.email)
            .map_err(|e| AppError::Internal(e.into()))
    }
}

// ─── Password hashing ────────────────────────────────────────

/// Argon2id hash in PHC string format. Runs on the blocking pool.
pub async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))
    })
    .await
    .map_err(|e| AppError::Internal(e.into()))?
    .map_err(AppError::Internal)
}

/// Check a password against a stored PHC hash. Runs on the blocking pool.
pub async fn verify_password(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash)
            .map_err(|e| anyhow::anyhow!("stored password hash is invalid: {e}"))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| AppError::Internal(e.into()))?
    .map_err(AppError::Internal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::services::google::ExternalProfile;
    use async_trait::async_trait;
    use std::time::Duration;

    struct StubProvider;

    #[async_trait]
    impl IdentityProvider for StubProvider {
        fn name(&self) -> &'static str {
            "google"
        }

        fn authorization_url(&self) -> String {
            "https://accounts.example/auth".to_string()
        }

        async fn exchange(&self, code: &str) -> std::result::Result<ExternalProfile, OAuthError> {
            match code {
                "bad" => Err(OAuthError::InvalidCode),
                _ => Ok(ExternalProfile {
                    external_id: format!("g-{code}"),
                    email: "Jo@Example.com".to_string(),
                    first_name: Some("J".to_string()),
                    last_name: Some("Smith".to_string()),
                    picture: None,
                    email_verified: true,
                }),
            }
        }
    }

    fn service() -> (AuthService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let tokens = TokenService::new(
            b"test_jwt_secret_32_bytes_minimum!",
            Duration::from_secs(3600),
            Duration::from_secs(7200),
        );
        (
            AuthService::new(store.clone(), tokens, Arc::new(StubProvider)),
            store,
        )
    }

    fn register_cmd(email: &str, username: &str) -> RegisterCommand {
        RegisterCommand {
            email: email.to_string(),
            username: username.to_string(),
            password: "Pass1word".to_string(),
            first_name: None,
            last_name: None,
        }
    }

    #[tokio::test]
    async fn test_register_then_duplicate_conflicts() {
        let (auth, _) = service();
        let user = auth.register(register_cmd("A@X.io", "alice")).await.unwrap();
        assert_eq!(user.email, "a@x.io");
        assert!(user.password_hash.as_deref().unwrap().starts_with("$argon2"));

        let err = auth
            .register(register_cmd("a@x.io", "alice2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "email already registered"));

        let err = auth
            .register(register_cmd("b@x.io", "alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_concurrent_registrations_one_wins() {
        let (auth, _) = service();
        let (a, b) = tokio::join!(
            auth.register(register_cmd("race@x.io", "racer_a")),
            auth.register(register_cmd("race@x.io", "racer_b")),
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let err = a.err().or(b.err()).unwrap();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_concurrent_username_race_reports_username() {
        let (auth, _) = service();
        let (a, b) = tokio::join!(
            auth.register(register_cmd("first@x.io", "same_name")),
            auth.register(register_cmd("second@x.io", "same_name")),
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let err = a.err().or(b.err()).unwrap();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "username already taken"));
    }

    #[tokio::test]
    async fn test_login_failures_are_uniform() {
        let (auth, store) = service();
        let user = auth.register(register_cmd("a@x.io", "alice")).await.unwrap();

        let outcome = auth.login("a@x.io", "Pass1word").await.unwrap();
        assert_eq!(outcome.user.id, user.id);

        let messages: Vec<String> = vec![
            auth.login("a@x.io", "wrong").await.unwrap_err().to_string(),
            auth.login("nobody@x.io", "Pass1word")
                .await
                .unwrap_err()
                .to_string(),
            auth.login("not-an-email", "Pass1word")
                .await
                .unwrap_err()
                .to_string(),
        ];

        let mut deactivated = UserStore::get(&*store, user.id).await.unwrap();
        deactivated.deactivate().unwrap();
        UserStore::update(&*store, &deactivated).await.unwrap();
        let after_deactivate = auth.login("a@x.io", "Pass1word").await.unwrap_err();
        assert!(matches!(after_deactivate, AppError::Unauthorized(_)));

        for msg in messages
            .iter()
            .chain(std::iter::once(&after_deactivate.to_string()))
        {
            assert_eq!(msg, INVALID_CREDENTIALS);
        }
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_rejects_access() {
        let (auth, _) = service();
        auth.register(register_cmd("a@x.io", "alice")).await.unwrap();
        let outcome = auth.login("a@x.io", "Pass1word").await.unwrap();

        let rotated = auth.refresh(&outcome.tokens.refresh_token).await.unwrap();
        assert!(!rotated.access_token.is_empty());
        // Old refresh token is still accepted
        assert!(auth.refresh(&outcome.tokens.refresh_token).await.is_ok());

        let err = auth
            .refresh(&outcome.tokens.access_token)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid refresh token");
    }

    #[tokio::test]
    async fn test_provider_login_creates_then_reuses_account() {
        let (auth, _) = service();

        let first = auth.login_with_provider("google", "code1").await.unwrap();
        assert_eq!(first.user.email, "jo@example.com");
        assert_eq!(first.user.username, "jo0");
        assert_eq!(first.user.first_name.as_deref(), Some("User"));
        assert_eq!(first.user.last_name.as_deref(), Some("Smith"));
        assert!(first.user.email_verified);
        assert!(first.user.password_hash.is_none());

        let second = auth.login_with_provider("google", "code2").await.unwrap();
        assert_eq!(second.user.id, first.user.id);

        assert!(matches!(
            auth.login_with_provider("google", "bad").await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            auth.login_with_provider("github", "code1").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_provider_username_collision_appends_suffix() {
        let (auth, _) = service();
        auth.register(register_cmd("other@x.io", "jo0")).await.unwrap();
        auth.register(register_cmd("other2@x.io", "jo0_1"))
            .await
            .unwrap();

        let outcome = auth.login_with_provider("google", "code").await.unwrap();
        assert_eq!(outcome.user.username, "jo0_2");
    }
}
