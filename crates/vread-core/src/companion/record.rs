//! Per-user companion record and its partial update.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Opaque user identifier. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::EmptyUserId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl std::str::FromStr for UserId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Gamified reading progress for one user.
///
/// Created lazily with [`CompanionRecord::new`] the first time a user is
/// seen, and afterwards only changed through [`CompanionUpdate`]s produced by
/// the progress engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanionRecord {
    pub user_id: UserId,
    /// Index into the stage catalog, starting at 1.
    pub current_stage: u32,
    /// Distinct calendar days with at least one validation.
    pub total_reading_days: u32,
    /// Consecutive reading days ending at `last_reading_date`.
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_reading_date: Option<NaiveDate>,
    pub segments_this_week: u32,
    pub has_seen_birth_ritual: bool,
    pub has_seen_week_ritual: bool,
    pub has_seen_return_ritual: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CompanionRecord {
    /// A fresh companion: stage 1, no reading history, no rituals seen.
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            current_stage: 1,
            total_reading_days: 0,
            current_streak: 0,
            longest_streak: 0,
            last_reading_date: None,
            segments_this_week: 0,
            has_seen_birth_ritual: false,
            has_seen_week_ritual: false,
            has_seen_return_ritual: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update in place. Ritual flags only ever latch on.
    pub fn apply(&mut self, update: &CompanionUpdate, now: DateTime<Utc>) {
        if let Some(stage) = update.current_stage {
            self.current_stage = stage;
        }
        if let Some(total) = update.total_reading_days {
            self.total_reading_days = total;
        }
        if let Some(streak) = update.current_streak {
            self.current_streak = streak;
        }
        if let Some(longest) = update.longest_streak {
            self.longest_streak = longest;
        }
        if let Some(date) = update.last_reading_date {
            self.last_reading_date = Some(date);
        }
        if let Some(segments) = update.segments_this_week {
            self.segments_this_week = segments;
        }
        self.has_seen_birth_ritual |= update.has_seen_birth_ritual;
        self.has_seen_week_ritual |= update.has_seen_week_ritual;
        self.has_seen_return_ritual |= update.has_seen_return_ritual;
        self.updated_at = now;
    }
}

/// Partial field update for a [`CompanionRecord`].
///
/// `None` leaves a field untouched. Ritual fields are latches: `true` sets
/// the flag, `false` means "no change", never "clear".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanionUpdate {
    pub current_stage: Option<u32>,
    pub total_reading_days: Option<u32>,
    pub current_streak: Option<u32>,
    pub longest_streak: Option<u32>,
    pub last_reading_date: Option<NaiveDate>,
    pub segments_this_week: Option<u32>,
    pub has_seen_birth_ritual: bool,
    pub has_seen_week_ritual: bool,
    pub has_seen_return_ritual: bool,
}
