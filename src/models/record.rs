// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mood records: two 1..=10 levels, optional notes, and a visibility flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ValidationError;

pub const LEVEL_MIN: i16 = 1;
pub const LEVEL_MAX: i16 = 10;

/// A level within `LEVEL_MIN..=LEVEL_MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MoodLevel(i16);

impl MoodLevel {
    pub fn new(value: i64, field: &str) -> Result<Self, ValidationError> {
        if !(i64::from(LEVEL_MIN)..=i64::from(LEVEL_MAX)).contains(&value) {
            return Err(ValidationError::new(format!(
                "{field} must be between {LEVEL_MIN} and {LEVEL_MAX}"
            )));
        }
        Ok(Self(value as i16))
    }

    pub fn value(self) -> i16 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(ValidationError::new(format!(
                "invalid mental health record status: {other}"
            ))),
        }
    }
}

/// One journal entry.
#[derive(Debug, Clone)]
pub struct MoodRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub happy_level: MoodLevel,
    pub energy_level: MoodLevel,
    /// Empty notes are stored as `None`
    pub notes: Option<String>,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl MoodRecord {
    pub fn new(
        user_id: Uuid,
        happy_level: MoodLevel,
        energy_level: MoodLevel,
        notes: Option<String>,
        visibility: Visibility,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            happy_level,
            energy_level,
            notes: normalize_notes(notes),
            visibility,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Replace the mutable fields, keeping id, owner and creation time.
    pub fn apply_update(
        &mut self,
        happy_level: MoodLevel,
        energy_level: MoodLevel,
        notes: Option<String>,
        visibility: Visibility,
    ) {
        self.happy_level = happy_level;
        self.energy_level = energy_level;
        self.notes = normalize_notes(notes);
        self.visibility = visibility;
        self.updated_at = Utc::now();
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

/// Absent and empty notes round-trip identically as `None`.
pub fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes.filter(|n| !n.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mood_level_bounds() {
        assert_eq!(MoodLevel::new(1, "happy_level").unwrap().value(), 1);
        assert_eq!(MoodLevel::new(10, "happy_level").unwrap().value(), 10);
        assert_eq!(
            MoodLevel::new(0, "happy_level").unwrap_err().0,
            "happy_level must be between 1 and 10"
        );
        assert_eq!(
            MoodLevel::new(11, "energy_level").unwrap_err().0,
            "energy_level must be between 1 and 10"
        );
        assert!(MoodLevel::new(i64::MAX, "happy_level").is_err());
    }

    #[test]
    fn test_visibility_parse() {
        assert_eq!(Visibility::parse("public").unwrap(), Visibility::Public);
        assert_eq!(Visibility::parse("private").unwrap(), Visibility::Private);
        assert!(Visibility::parse("friends").is_err());
        assert_eq!(Visibility::default(), Visibility::Private);
    }

    #[test]
    fn test_update_preserves_identity() {
        let owner = Uuid::new_v4();
        let mut record = MoodRecord::new(
            owner,
            MoodLevel::new(5, "happy_level").unwrap(),
            MoodLevel::new(5, "energy_level").unwrap(),
            Some(String::new()),
            Visibility::Private,
        );
        assert_eq!(record.notes, None);

        let (id, created) = (record.id, record.created_at);
        record.apply_update(
            MoodLevel::new(8, "happy_level").unwrap(),
            MoodLevel::new(3, "energy_level").unwrap(),
            Some("better".into()),
            Visibility::Public,
        );

        assert_eq!(record.id, id);
        assert_eq!(record.created_at, created);
        assert!(record.is_owned_by(owner));
        assert_eq!(record.happy_level.value(), 8);
        assert_eq!(record.notes.as_deref(), Some("better"));
    }
}
