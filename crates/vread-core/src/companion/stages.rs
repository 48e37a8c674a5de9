//! Companion evolution stages.
//!
//! A stage is unlocked once the companion has accumulated enough distinct
//! reading days. The catalog is ordered by threshold and always starts at 0,
//! so every day count maps to some stage.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One evolution tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCatalogEntry {
    pub id: u32,
    pub min_reading_days: u32,
    pub name: String,
    pub description: String,
}

impl StageCatalogEntry {
    fn new(id: u32, min_reading_days: u32, name: &str, description: &str) -> Self {
        Self {
            id,
            min_reading_days,
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

/// Progress between the current stage and the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProgress {
    /// Percentage in `0..=100`.
    pub progress: u8,
    pub days_remaining: u32,
}

/// Ordered, validated table of stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageCatalog {
    entries: Vec<StageCatalogEntry>,
}

impl StageCatalog {
    /// Build a catalog from custom entries.
    ///
    /// # Errors
    /// Fails unless the entries are non-empty, numbered `1..=n` in order,
    /// start at threshold 0, and have strictly ascending thresholds.
    pub fn new(entries: Vec<StageCatalogEntry>) -> Result<Self, ValidationError> {
        let first = entries
            .first()
            .ok_or_else(|| ValidationError::InvalidCatalog("catalog is empty".into()))?;
        if first.min_reading_days != 0 {
            return Err(ValidationError::InvalidCatalog(format!(
                "first stage must start at 0 days, got {}",
                first.min_reading_days
            )));
        }
        for (idx, entry) in entries.iter().enumerate() {
            let expected = idx as u32 + 1;
            if entry.id != expected {
                return Err(ValidationError::InvalidCatalog(format!(
                    "stage at position {idx} has id {}, expected {expected}",
                    entry.id
                )));
            }
        }
        for pair in entries.windows(2) {
            if pair[1].min_reading_days <= pair[0].min_reading_days {
                return Err(ValidationError::InvalidCatalog(format!(
                    "stage {} threshold {} is not above stage {} threshold {}",
                    pair[1].id, pair[1].min_reading_days, pair[0].id, pair[0].min_reading_days
                )));
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[StageCatalogEntry] {
        &self.entries
    }

    pub fn first(&self) -> &StageCatalogEntry {
        // Non-empty by construction.
        &self.entries[0]
    }

    pub fn get(&self, id: u32) -> Option<&StageCatalogEntry> {
        let idx = id.checked_sub(1)? as usize;
        self.entries.get(idx)
    }

    /// Highest stage whose threshold is `<= days`.
    pub fn stage_for_reading_days(&self, days: u32) -> &StageCatalogEntry {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.min_reading_days <= days)
            .unwrap_or_else(|| self.first())
    }

    /// The stage after `current_stage_id`, or `None` at the last stage.
    pub fn next_stage(&self, current_stage_id: u32) -> Option<&StageCatalogEntry> {
        self.get(current_stage_id.checked_add(1)?)
    }

    /// Linear progress from the current stage's threshold to the next one.
    ///
    /// Returns `None` when `current_days` already reaches the last stage.
    pub fn progress_to_next_stage(&self, current_days: u32) -> Option<StageProgress> {
        self.progress_from(self.stage_for_reading_days(current_days), current_days)
    }

    /// Progress from `stage` towards the stage right after it.
    ///
    /// The stage may lag behind the day count (a companion that is held at
    /// a lower stage); progress then saturates at 100 with 0 days remaining.
    pub fn progress_from(&self, stage: &StageCatalogEntry, current_days: u32) -> Option<StageProgress> {
        let next = self.next_stage(stage.id)?;

        let span = next.min_reading_days.saturating_sub(stage.min_reading_days);
        let done = current_days.saturating_sub(stage.min_reading_days);
        let pct = (u64::from(done) * 100 / u64::from(span.max(1))).min(100) as u8;

        Some(StageProgress {
            progress: pct,
            days_remaining: next.min_reading_days.saturating_sub(current_days),
        })
    }
}

impl Default for StageCatalog {
    fn default() -> Self {
        Self {
            entries: vec![
                StageCatalogEntry::new(1, 0, "Egg", "Waiting for the first page to be turned."),
                StageCatalogEntry::new(2, 1, "Hatchling", "Cracked open by a first day of reading."),
                StageCatalogEntry::new(3, 7, "Reader", "A week of reading days behind it."),
                StageCatalogEntry::new(4, 21, "Bookworm", "Three weeks of reading days."),
                StageCatalogEntry::new(5, 50, "Sage", "Fifty reading days. Fully grown."),
            ],
        }
    }
}
