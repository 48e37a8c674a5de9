//! # VREAD Core Library
//!
//! Reading-progress gamification for VREAD. Each validated reading segment
//! feeds a per-user companion whose streak, reading-day total and evolution
//! stage grow with the reader, firing one-time celebration rituals along the
//! way.
//!
//! ## Architecture
//!
//! - **Progress Engine**: one read, a pure transition, one write per
//!   validation, serialized per user
//! - **Stage Catalog**: ordered thresholds mapping reading days to stages
//! - **Storage**: SQLite companion store and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`ProgressEngine`]: `ensure_companion` / `update_progress` / `companion_status`
//! - [`plan_progress`]: the pure streak/stage/ritual transition
//! - [`CompanionStore`]: record store trait ([`Database`], [`MemoryStore`])
//! - [`Config`]: progress policy and custom stage configuration

pub mod companion;
pub mod error;
pub mod storage;

pub use companion::{
    plan_progress, BackdatedPolicy, Clock, CompanionRecord, CompanionStatus, CompanionUpdate,
    FixedClock, ProgressEngine, ProgressEvent, ProgressPlan, ProgressPolicy, Ritual, Rituals,
    StageCatalog, StageCatalogEntry, StageProgress, StageProgression, SystemClock,
    UpdateProgressResult, UserId, WeeklyResetClock,
};
pub use error::{ConfigError, CoreError, ProgressError, StorageError, ValidationError};
pub use storage::{CompanionStore, Config, Database, MemoryStore};
