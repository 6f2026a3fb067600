// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Quote library: quotes, tags, and their association.

use chrono::{DateTime, Utc};

use super::ValidationError;

pub const CONTENT_MAX_LEN: usize = 1000;
pub const AUTHOR_MAX_LEN: usize = 2000;
pub const TAG_NAME_MAX_LEN: usize = 100;
pub const DEFAULT_AUTHOR: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub id: i64,
    pub content: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated quote fields, ready to insert or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteDraft {
    pub content: String,
    pub author: String,
}

impl QuoteDraft {
    pub fn new(content: &str, author: &str) -> Result<Self, ValidationError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::new("content cannot be empty"));
        }
        if content.chars().count() > CONTENT_MAX_LEN {
            return Err(ValidationError::new("content cannot exceed 1000 characters"));
        }

        let author = author.trim();
        if author.is_empty() {
            return Err(ValidationError::new("author cannot be empty"));
        }
        if author.chars().count() > AUTHOR_MAX_LEN {
            return Err(ValidationError::new("author cannot exceed 2000 characters"));
        }

        Ok(Self {
            content: content.to_string(),
            author: author.to_string(),
        })
    }
}

/// Validated tag fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDraft {
    pub name: String,
    pub description: String,
}

impl TagDraft {
    pub fn new(name: &str, description: Option<&str>) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::new("tag name cannot be empty"));
        }
        if name.chars().count() > TAG_NAME_MAX_LEN {
            return Err(ValidationError::new(
                "tag name cannot exceed 100 characters",
            ));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        {
            return Err(ValidationError::new("tag name contains invalid characters"));
        }

        Ok(Self {
            name: name.to_string(),
            description: description.unwrap_or_default().trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_draft() {
        let draft = QuoteDraft::new("  Be here now.  ", " Ram Dass ").unwrap();
        assert_eq!(draft.content, "Be here now.");
        assert_eq!(draft.author, "Ram Dass");

        assert_eq!(
            QuoteDraft::new("   ", "x").unwrap_err().0,
            "content cannot be empty"
        );
        assert!(QuoteDraft::new(&"q".repeat(1001), "x").is_err());
        assert!(QuoteDraft::new(&"q".repeat(1000), "x").is_ok());
        assert!(QuoteDraft::new("q", "").is_err());
        assert!(QuoteDraft::new("q", &"a".repeat(2001)).is_err());
    }

    #[test]
    fn test_tag_draft() {
        let draft = TagDraft::new(" self-care_2 ", None).unwrap();
        assert_eq!(draft.name, "self-care_2");
        assert_eq!(draft.description, "");

        assert!(TagDraft::new("", None).is_err());
        assert_eq!(
            TagDraft::new("calm!", None).unwrap_err().0,
            "tag name contains invalid characters"
        );
        assert!(TagDraft::new(&"t".repeat(101), None).is_err());
    }
}
