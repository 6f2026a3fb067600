// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::sync::Arc;

use crate::db::{StoreError, TagStore};
use crate::error::{AppError, Result};
use crate::models::quote::TagDraft;
use crate::models::Tag;

#[derive(Clone)]
pub struct TagService {
    tags: Arc<dyn TagStore>,
}

impl TagService {
    pub fn new(tags: Arc<dyn TagStore>) -> Self {
        Self { tags }
    }

    pub async fn list(&self) -> Result<Vec<Tag>> {
        Ok(self.tags.list().await?)
    }

    pub async fn get(&self, id: i64) -> Result<Tag> {
        self.tags.get(id).await.map_err(tag_error)
    }

    pub async fn create(&self, name: &str, description: Option<&str>) -> Result<Tag> {
        let draft = TagDraft::new(name, description)?;
        let tag = self.tags.create(&draft).await.map_err(tag_error)?;
        tracing::info!(tag_id = tag.id, name = %tag.name, "Tag created");
        Ok(tag)
    }

    pub async fn update(&self, id: i64, name: &str, description: Option<&str>) -> Result<Tag> {
        let draft = TagDraft::new(name, description)?;
        self.tags.update(id, &draft).await.map_err(tag_error)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.tags.delete(id).await.map_err(tag_error)
    }
}

fn tag_error(err: StoreError) -> AppError {
    match err {
        StoreError::NotFound(_) => AppError::NotFound("Tag not found".to_string()),
        StoreError::Conflict(_) => AppError::Conflict("tag already exists".to_string()),
        other => other.into(),
    }
}
