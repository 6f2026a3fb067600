// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model and the validation rules for its fields.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use validator::ValidateEmail;

use super::ValidationError;

pub const EMAIL_MAX_LEN: usize = 255;
pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 50;
pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 8;
/// Upper bound in bytes; longer inputs are silently truncated by bcrypt-family KDFs.
pub const PASSWORD_MAX_BYTES: usize = 72;

/// How an account authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Local,
    Google,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Local => "local",
            AuthProvider::Google => "google",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "local" => Some(AuthProvider::Local),
            "google" => Some(AuthProvider::Google),
            _ => None,
        }
    }
}

/// A registered account.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// PHC-format hash; `None` for provider-only accounts
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub email_verified: bool,
    pub auth_provider: AuthProvider,
    pub google_id: Option<String>,
    pub google_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Build a local (password) account from validated parts.
    pub fn new_local(
        email: String,
        username: String,
        password_hash: String,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            username,
            first_name,
            last_name,
            password_hash: Some(password_hash),
            is_active: true,
            email_verified: false,
            auth_provider: AuthProvider::Local,
            google_id: None,
            google_picture: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Build an account for a user first seen through Google sign-in.
    pub fn new_google(
        email: String,
        username: String,
        first_name: Option<String>,
        last_name: Option<String>,
        google_id: String,
        picture: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            username,
            first_name,
            last_name,
            password_hash: None,
            is_active: true,
            email_verified: true,
            auth_provider: AuthProvider::Google,
            google_id: Some(google_id),
            google_picture: picture,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// First and last name joined by a space; empty when neither is set.
    pub fn full_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => String::new(),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether the account may sign in or write data.
    pub fn can_authenticate(&self) -> bool {
        self.is_active && !self.is_deleted()
    }

    pub fn update_profile(
        &mut self,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<(), ValidationError> {
        self.first_name = validate_name(first_name, "first name")?;
        self.last_name = validate_name(last_name, "last name")?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn deactivate(&mut self) -> Result<(), ValidationError> {
        if !self.is_active {
            return Err(ValidationError::new("user is already deactivated"));
        }
        self.is_active = false;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn soft_delete(&mut self) -> Result<(), ValidationError> {
        if self.is_deleted() {
            return Err(ValidationError::new("user is already deleted"));
        }
        let now = Utc::now();
        self.deleted_at = Some(now);
        self.is_active = false;
        self.updated_at = now;
        Ok(())
    }
}

// ─── Field validation ───────────────────────────────────────

/// Trim, lowercase and validate an email address.
pub fn normalize_email(input: &str) -> Result<String, ValidationError> {
    let email = input.trim().to_lowercase();
    if email.is_empty() {
        return Err(ValidationError::new("email cannot be empty"));
    }
    if email.len() > EMAIL_MAX_LEN {
        return Err(ValidationError::new("email too long"));
    }
    if !email.validate_email() || !has_valid_domain(&email) {
        return Err(ValidationError::new("invalid email format"));
    }
    Ok(email)
}

/// The domain must be dotted with an alphabetic TLD of two or more letters.
fn has_valid_domain(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    let local_ok = local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));
    let domain_ok = domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    let tld_ok = domain
        .rsplit_once('.')
        .is_some_and(|(_, tld)| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_lowercase()));
    local_ok && domain_ok && tld_ok
}

pub fn validate_username(input: &str) -> Result<String, ValidationError> {
    let username = input.trim();
    if username.is_empty() {
        return Err(ValidationError::new("username cannot be empty"));
    }
    if username.chars().count() < USERNAME_MIN_LEN {
        return Err(ValidationError::new("username must be at least 3 characters"));
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(ValidationError::new("username too long"));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ValidationError::new(
            "username can only contain letters, numbers, and underscores",
        ));
    }
    Ok(username.to_string())
}

/// Validate an optional first or last name. Absent or blank input clears it.
pub fn validate_name(
    input: Option<&str>,
    field: &str,
) -> Result<Option<String>, ValidationError> {
    let Some(name) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let len = name.chars().count();
    if len < NAME_MIN_LEN {
        return Err(ValidationError::new(format!(
            "{field} must be at least 2 characters long"
        )));
    }
    if len > NAME_MAX_LEN {
        return Err(ValidationError::new(format!(
            "{field} cannot be longer than 50 characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_alphabetic() || matches!(c, ' ' | '-' | '\'' | '.'))
    {
        return Err(ValidationError::new(format!(
            "{field} contains invalid characters"
        )));
    }
    Ok(Some(name.to_string()))
}

/// Password strength rules. Hashing happens elsewhere.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(ValidationError::new(
            "password must be at least 8 characters",
        ));
    }
    if password.len() > PASSWORD_MAX_BYTES {
        return Err(ValidationError::new("password too long"));
    }
    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        return Err(ValidationError::new(
            "password must contain at least one uppercase letter, one lowercase letter, and one digit",
        ));
    }
    Ok(())
}

/// Derive a username candidate from the local part of an email address.
///
/// The result always satisfies [`validate_username`].
pub fn username_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let mut name: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();

    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        name = format!("user_{name}");
    }
    while name.len() < USERNAME_MIN_LEN {
        name.push('0');
    }
    name.truncate(USERNAME_MAX_LEN);
    name
}

/// Append `_<n>` to a base username, keeping within the length limit.
pub fn username_with_suffix(base: &str, n: u32) -> String {
    let suffix = format!("_{n}");
    let keep = USERNAME_MAX_LEN.saturating_sub(suffix.len()).min(base.len());
    format!("{}{}", &base[..keep], suffix)
}

/// Names from an identity provider that fail validation fall back to `"User"`.
pub fn provider_name_or_default(input: Option<&str>, field: &str) -> Option<String> {
    match validate_name(input, field) {
        Ok(Some(name)) => Some(name),
        _ => Some("User".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  A@X.io ").unwrap(), "a@x.io");
        assert!(normalize_email("").is_err());
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("a@localhost").is_err());
        assert!(normalize_email("a@x.c").is_err());
        let long = format!("{}@x.io", "a".repeat(260));
        assert_eq!(normalize_email(&long).unwrap_err().0, "email too long");
    }

    #[test]
    fn test_validate_username() {
        assert_eq!(validate_username(" alice ").unwrap(), "alice");
        assert!(validate_username("al").is_err());
        assert!(validate_username("alice!").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
        assert!(validate_username("a_1").is_ok());
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name(None, "first name").unwrap(), None);
        assert_eq!(validate_name(Some("   "), "first name").unwrap(), None);
        assert_eq!(
            validate_name(Some(" O'Neil-Smith "), "last name").unwrap(),
            Some("O'Neil-Smith".to_string())
        );
        assert_eq!(
            validate_name(Some("J"), "first name").unwrap_err().0,
            "first name must be at least 2 characters long"
        );
        assert!(validate_name(Some("R2D2"), "first name").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("Pass1word").is_ok());
        assert_eq!(
            validate_password("Pa1").unwrap_err().0,
            "password must be at least 8 characters"
        );
        assert!(validate_password("password1").is_err());
        assert!(validate_password("PASSWORD1").is_err());
        assert!(validate_password("Password").is_err());
        let long = format!("Aa1{}", "x".repeat(70));
        assert_eq!(validate_password(&long).unwrap_err().0, "password too long");
    }

    #[test]
    fn test_username_from_email() {
        assert_eq!(username_from_email("john.doe@example.com"), "johndoe");
        assert_eq!(username_from_email("42@example.com"), "user_42");
        assert_eq!(username_from_email("_x@example.com"), "user__x");
        assert_eq!(username_from_email("a@example.com"), "a00");
        assert_eq!(username_from_email("+++@example.com"), "user_");
        let long = format!("{}@example.com", "b".repeat(80));
        assert_eq!(username_from_email(&long).len(), USERNAME_MAX_LEN);

        for email in ["john.doe@example.com", "42@example.com", "a@example.com"] {
            assert!(validate_username(&username_from_email(email)).is_ok());
        }
    }

    #[test]
    fn test_username_with_suffix() {
        assert_eq!(username_with_suffix("alice", 3), "alice_3");
        let base = "c".repeat(50);
        let suffixed = username_with_suffix(&base, 999);
        assert_eq!(suffixed.len(), USERNAME_MAX_LEN);
        assert!(suffixed.ends_with("_999"));
    }

    #[test]
    fn test_provider_name_fallback() {
        assert_eq!(
            provider_name_or_default(Some("J"), "first name"),
            Some("User".to_string())
        );
        assert_eq!(
            provider_name_or_default(Some("Jane"), "first name"),
            Some("Jane".to_string())
        );
    }

    #[test]
    fn test_full_name_and_lifecycle() {
        let mut user = User::new_local(
            "a@x.io".into(),
            "alice".into(),
            "hash".into(),
            Some("Alice".into()),
            None,
        );
        assert_eq!(user.full_name(), "Alice");
        assert!(user.can_authenticate());

        user.deactivate().unwrap();
        assert!(!user.can_authenticate());
        assert_eq!(
            user.deactivate().unwrap_err().0,
            "user is already deactivated"
        );

        user.soft_delete().unwrap();
        assert!(user.is_deleted());
        assert!(user.soft_delete().is_err());
    }
}
