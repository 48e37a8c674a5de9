use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One-time celebrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ritual {
    /// First reading day ever.
    Birth,
    /// First time the streak reaches a full week.
    Week,
    /// Coming back after a long break.
    Return,
}

/// Everything a single progress update changed, in the order it was decided.
/// The UI reacts to these instead of diffing companion records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEvent {
    StreakStarted {
        date: NaiveDate,
    },
    StreakExtended {
        streak: u32,
    },
    StreakReset {
        previous_streak: u32,
        gap_days: i64,
    },
    StageEvolved {
        from: u32,
        to: u32,
    },
    WeeklyCounterReset {
        previous_segments: u32,
    },
    RitualTriggered {
        ritual: Ritual,
    },
    /// Validation dated before the last reading day; only the segment counted.
    BackdatedIgnored {
        last: NaiveDate,
        attempted: NaiveDate,
    },
}
