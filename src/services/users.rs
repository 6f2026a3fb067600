// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account self-service for the signed-in user.

use std::sync::Arc;
use uuid::Uuid;

use crate::db::{StoreError, UserStore};
use crate::error::{AppError, Result};
use crate::models::user::validate_password;
use crate::models::User;
use crate::services::auth::hash_password;

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub async fn me(&self, user_id: Uuid) -> Result<User> {
        self.load(user_id).await
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<User> {
        let mut user = self.load(user_id).await?;
        user.update_profile(first_name, last_name)?;
        self.users.update(&user).await?;
        Ok(user)
    }

    pub async fn update_password(&self, user_id: Uuid, new_password: &str) -> Result<()> {
        if new_password.is_empty() {
            return Err(AppError::Validation("new_password is required".to_string()));
        }
        validate_password(new_password)?;

        let mut user = self.load(user_id).await?;
        user.password_hash = Some(hash_password(new_password.to_string()).await?);
        user.updated_at = chrono::Utc::now();
        self.users.update(&user).await?;

        tracing::info!(user_id = %user_id, "Password updated");
        Ok(())
    }

    pub async fn deactivate(&self, user_id: Uuid) -> Result<()> {
        let mut user = self.load(user_id).await?;
        user.deactivate()?;
        self.users.update(&user).await?;
        tracing::info!(user_id = %user_id, "Account deactivated");
        Ok(())
    }

    /// Soft delete; the email and username become free again.
    pub async fn delete_account(&self, user_id: Uuid) -> Result<()> {
        self.users.delete(user_id).await.map_err(user_not_found)?;
        tracing::info!(user_id = %user_id, "Account deleted");
        Ok(())
    }

    async fn load(&self, user_id: Uuid) -> Result<User> {
        self.users.get(user_id).await.map_err(user_not_found)
    }
}

fn user_not_found(err: StoreError) -> AppError {
    match err {
        StoreError::NotFound(_) => AppError::NotFound("User not found".to_string()),
        other => other.into(),
    }
}
