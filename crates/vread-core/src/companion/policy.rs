//! Tunable progress rules.
//!
//! The defaults reproduce the production behavior except for stage
//! progression, which follows the stage catalog instead of stopping at
//! stage 2.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const MAX_OFFSET_MINUTES: i32 = 18 * 60;

/// Which date decides whether the weekly segment counter resets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeeklyResetClock {
    /// The wall-clock date at the time of the update.
    #[default]
    WallClock,
    /// The calendar date of the validation being recorded.
    ValidationDate,
}

/// How `current_stage` is recomputed after a new reading day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageProgression {
    /// Highest catalog stage reached by `total_reading_days`.
    #[default]
    Catalog,
    /// Hatch to stage 2 on the first reading day and stop there.
    HatchOnly,
}

/// What to do with a validation dated before `last_reading_date`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackdatedPolicy {
    /// Count the segment, leave streak and day totals alone.
    #[default]
    Ignore,
    /// Fail the update without writing anything.
    Reject,
}

/// Progress engine settings, stored under `[progress]` in `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPolicy {
    #[serde(default)]
    pub weekly_reset_clock: WeeklyResetClock,
    #[serde(default)]
    pub stage_progression: StageProgression,
    #[serde(default)]
    pub backdated_policy: BackdatedPolicy,
    /// Reference time zone for calendar-day normalization, minutes east of UTC.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl ProgressPolicy {
    /// # Errors
    /// Fails if the UTC offset is outside +/-18 hours.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(ValidationError::InvalidValue {
                field: "progress.utc_offset_minutes".into(),
                message: format!(
                    "{} is outside +/-{MAX_OFFSET_MINUTES}",
                    self.utc_offset_minutes
                ),
            });
        }
        Ok(())
    }

    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// Calendar date of `at` in the reference time zone.
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset()).date_naive()
    }
}
