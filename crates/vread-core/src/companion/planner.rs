//! Pure streak / stage / ritual transition.
//!
//! [`plan_progress`] looks only at the record as it was before the update and
//! the two calendar dates involved. It never touches storage, so every rule
//! here is tested without a store.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

use super::events::{ProgressEvent, Ritual};
use super::policy::{BackdatedPolicy, ProgressPolicy, StageProgression, WeeklyResetClock};
use super::record::{CompanionRecord, CompanionUpdate};
use super::stages::StageCatalog;
use crate::error::ProgressError;

/// Streak length that triggers the week ritual.
pub const WEEK_RITUAL_STREAK: u32 = 7;

/// Minimum gap, in days, that counts as a return after a break.
pub const RETURN_RITUAL_GAP_DAYS: i64 = 4;

/// Stage a companion hatches into under [`StageProgression::HatchOnly`].
const HATCHED_STAGE: u32 = 2;

/// Which celebrations fire for this update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Rituals {
    pub is_first_day: bool,
    pub is_first_week: bool,
    pub is_return_after_break: bool,
}

/// The computed outcome of one validation, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressPlan {
    pub update: CompanionUpdate,
    pub rituals: Rituals,
    pub events: Vec<ProgressEvent>,
}

/// How the validation date relates to the last reading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayTransition {
    FirstEver,
    SameDay,
    NextDay,
    Gap(i64),
    Backdated,
}

impl DayTransition {
    fn classify(last: Option<NaiveDate>, date: NaiveDate) -> Self {
        let Some(last) = last else {
            return DayTransition::FirstEver;
        };
        match (date - last).num_days() {
            0 => DayTransition::SameDay,
            1 => DayTransition::NextDay,
            d if d > 1 => DayTransition::Gap(d),
            _ => DayTransition::Backdated,
        }
    }
}

/// Compute the update for a validation on `validation_date`, with `today`
/// as the wall-clock date.
///
/// # Errors
/// Returns [`ProgressError::BackdatedValidation`] when the validation
/// predates the last reading day and the policy is
/// [`BackdatedPolicy::Reject`].
pub fn plan_progress(
    previous: &CompanionRecord,
    validation_date: NaiveDate,
    today: NaiveDate,
    policy: &ProgressPolicy,
    catalog: &StageCatalog,
) -> Result<ProgressPlan, ProgressError> {
    let mut update = CompanionUpdate {
        segments_this_week: Some(previous.segments_this_week.saturating_add(1)),
        ..Default::default()
    };
    let mut events = Vec::new();

    let mut transition = DayTransition::classify(previous.last_reading_date, validation_date);
    if transition == DayTransition::Backdated {
        // classify only yields Backdated when a last date exists.
        let last = previous.last_reading_date.unwrap_or(validation_date);
        match policy.backdated_policy {
            BackdatedPolicy::Reject => {
                return Err(ProgressError::BackdatedValidation {
                    last,
                    attempted: validation_date,
                });
            }
            BackdatedPolicy::Ignore => {
                tracing::warn!(
                    user_id = %previous.user_id,
                    %last,
                    attempted = %validation_date,
                    "ignoring backdated validation for streak purposes"
                );
                events.push(ProgressEvent::BackdatedIgnored {
                    last,
                    attempted: validation_date,
                });
                transition = DayTransition::SameDay;
            }
        }
    }

    let new_streak = match transition {
        DayTransition::FirstEver => {
            events.push(ProgressEvent::StreakStarted {
                date: validation_date,
            });
            Some((1, 1))
        }
        DayTransition::NextDay => {
            let streak = previous.current_streak.saturating_add(1);
            events.push(ProgressEvent::StreakExtended { streak });
            Some((streak, previous.total_reading_days.saturating_add(1)))
        }
        DayTransition::Gap(gap_days) => {
            events.push(ProgressEvent::StreakReset {
                previous_streak: previous.current_streak,
                gap_days,
            });
            Some((1, previous.total_reading_days.saturating_add(1)))
        }
        DayTransition::SameDay | DayTransition::Backdated => None,
    };

    if let Some((streak, total)) = new_streak {
        update.current_streak = Some(streak);
        update.total_reading_days = Some(total);
        update.longest_streak = Some(previous.longest_streak.max(streak));
        update.last_reading_date = Some(validation_date);

        let stage = next_stage_id(previous.current_stage, total, policy, catalog);
        if stage != previous.current_stage {
            events.push(ProgressEvent::StageEvolved {
                from: previous.current_stage,
                to: stage,
            });
        }
        update.current_stage = Some(stage);
    }

    let reference = match policy.weekly_reset_clock {
        WeeklyResetClock::WallClock => today,
        WeeklyResetClock::ValidationDate => validation_date,
    };
    let last_was_monday = previous
        .last_reading_date
        .is_some_and(|d| d.weekday() == Weekday::Mon);
    if reference.weekday() == Weekday::Mon && !last_was_monday {
        update.segments_this_week = Some(1);
        if previous.segments_this_week > 0 {
            events.push(ProgressEvent::WeeklyCounterReset {
                previous_segments: previous.segments_this_week,
            });
        }
    }

    let streak_after = update.current_streak.unwrap_or(previous.current_streak);
    let rituals = Rituals {
        is_first_day: previous.total_reading_days == 0 && !previous.has_seen_birth_ritual,
        is_first_week: !previous.has_seen_week_ritual
            && previous.current_streak < WEEK_RITUAL_STREAK
            && streak_after >= WEEK_RITUAL_STREAK,
        is_return_after_break: !previous.has_seen_return_ritual
            && matches!(transition, DayTransition::Gap(d) if d >= RETURN_RITUAL_GAP_DAYS),
    };

    if rituals.is_first_day {
        update.has_seen_birth_ritual = true;
        events.push(ProgressEvent::RitualTriggered {
            ritual: Ritual::Birth,
        });
    }
    if rituals.is_first_week {
        update.has_seen_week_ritual = true;
        events.push(ProgressEvent::RitualTriggered {
            ritual: Ritual::Week,
        });
    }
    if rituals.is_return_after_break {
        update.has_seen_return_ritual = true;
        events.push(ProgressEvent::RitualTriggered {
            ritual: Ritual::Return,
        });
    }

    Ok(ProgressPlan {
        update,
        rituals,
        events,
    })
}

fn next_stage_id(
    current: u32,
    total_reading_days: u32,
    policy: &ProgressPolicy,
    catalog: &StageCatalog,
) -> u32 {
    let computed = match policy.stage_progression {
        StageProgression::Catalog => catalog.stage_for_reading_days(total_reading_days).id,
        StageProgression::HatchOnly if total_reading_days >= 1 => HATCHED_STAGE,
        StageProgression::HatchOnly => current,
    };
    current.max(computed)
}
