// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Quote library and quote-tag association.

use std::sync::Arc;

use crate::db::{QuoteStore, StoreError, TagStore};
use crate::error::{AppError, Result};
use crate::models::quote::QuoteDraft;
use crate::models::{Quote, Tag};

#[derive(Clone)]
pub struct QuoteService {
    quotes: Arc<dyn QuoteStore>,
    tags: Arc<dyn TagStore>,
}

impl QuoteService {
    pub fn new(quotes: Arc<dyn QuoteStore>, tags: Arc<dyn TagStore>) -> Self {
        Self { quotes, tags }
    }

    pub async fn list(&self) -> Result<Vec<Quote>> {
        Ok(self.quotes.list().await?)
    }

    pub async fn random(&self) -> Result<Quote> {
        self.quotes
            .random()
            .await?
            .ok_or_else(|| AppError::NotFound("No quotes available".to_string()))
    }

    pub async fn get(&self, id: i64) -> Result<Quote> {
        self.quotes.get(id).await.map_err(quote_not_found)
    }

    pub async fn create(&self, content: &str, author: &str) -> Result<Quote> {
        let draft = QuoteDraft::new(content, author)?;
        let quote = self.quotes.create(&draft).await?;
        tracing::info!(quote_id = quote.id, "Quote created");
        Ok(quote)
    }

    pub async fn update(&self, id: i64, content: &str, author: &str) -> Result<Quote> {
        let draft = QuoteDraft::new(content, author)?;
        self.quotes.update(id, &draft).await.map_err(quote_not_found)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.quotes.delete(id).await.map_err(quote_not_found)
    }

    pub async fn tags(&self, quote_id: i64) -> Result<Vec<Tag>> {
        self.get(quote_id).await?;
        Ok(self.quotes.tags_for(quote_id).await?)
    }

    /// Attach a tag. Both must exist; attaching twice is a no-op.
    pub async fn add_tag(&self, quote_id: i64, tag_id: i64) -> Result<()> {
        self.get(quote_id).await?;
        self.tags.get(tag_id).await?;
        self.quotes.add_tag(quote_id, tag_id).await?;
        Ok(())
    }

    pub async fn remove_tag(&self, quote_id: i64, tag_id: i64) -> Result<()> {
        self.get(quote_id).await?;
        self.quotes.remove_tag(quote_id, tag_id).await?;
        Ok(())
    }
}

fn quote_not_found(err: StoreError) -> AppError {
    match err {
        StoreError::NotFound(_) => AppError::NotFound("Quote not found".to_string()),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::services::tags::TagService;

    fn services() -> (QuoteService, TagService) {
        let store = Arc::new(MemoryStore::new());
        (
            QuoteService::new(store.clone(), store.clone()),
            TagService::new(store),
        )
    }

    #[tokio::test]
    async fn test_random_on_empty_library() {
        let (quotes, _) = services();
        let err = quotes.random().await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "No quotes available"));

        let quote = quotes.create("Be here now.", "Ram Dass").await.unwrap();
        assert_eq!(quotes.random().await.unwrap().id, quote.id);
    }

    #[tokio::test]
    async fn test_tagging_requires_both_sides_and_is_idempotent() {
        let (quotes, tags) = services();
        let quote = quotes.create("Breathe.", "Unknown").await.unwrap();
        let tag = tags.create("calm", None).await.unwrap();

        assert!(matches!(
            quotes.add_tag(quote.id, 999).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            quotes.add_tag(999, tag.id).await,
            Err(AppError::NotFound(_))
        ));

        quotes.add_tag(quote.id, tag.id).await.unwrap();
        quotes.add_tag(quote.id, tag.id).await.unwrap();
        assert_eq!(quotes.tags(quote.id).await.unwrap().len(), 1);

        quotes.remove_tag(quote.id, tag.id).await.unwrap();
        assert!(quotes.tags(quote.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_quote_disappears() {
        let (quotes, _) = services();
        let quote = quotes.create("Rest.", "Anon").await.unwrap();
        quotes.delete(quote.id).await.unwrap();

        assert!(quotes.list().await.unwrap().is_empty());
        let err = quotes.get(quote.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Quote not found");
        assert!(quotes.delete(quote.id).await.is_err());
    }
}
