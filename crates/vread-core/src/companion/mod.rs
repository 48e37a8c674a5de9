//! The companion ("Booky") progress engine.
//!
//! Every validated reading segment runs through [`ProgressEngine::update_progress`]:
//! one read of the user's companion, a pure transition computed by
//! [`plan_progress`], and one write.

mod clock;
mod engine;
mod events;
mod planner;
mod policy;
mod record;
mod stages;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{CompanionStatus, ProgressEngine, UpdateProgressResult};
pub use events::{ProgressEvent, Ritual};
pub use planner::{
    plan_progress, ProgressPlan, Rituals, RETURN_RITUAL_GAP_DAYS, WEEK_RITUAL_STREAK,
};
pub use policy::{BackdatedPolicy, ProgressPolicy, StageProgression, WeeklyResetClock};
pub use record::{CompanionRecord, CompanionUpdate, UserId};
pub use stages::{StageCatalog, StageCatalogEntry, StageProgress};
