use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::clock::{Clock, SystemClock};
use super::events::ProgressEvent;
use super::planner::plan_progress;
use super::policy::ProgressPolicy;
use super::record::{CompanionRecord, UserId};
use super::stages::{StageCatalog, StageCatalogEntry, StageProgress};
use crate::error::{ProgressError, StorageError};
use crate::storage::CompanionStore;

/// Outcome of [`ProgressEngine::update_progress`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateProgressResult {
    pub is_first_day: bool,
    pub is_first_week: bool,
    pub is_return_after_break: bool,
    pub companion: CompanionRecord,
    pub events: Vec<ProgressEvent>,
}

/// Read-only view of a companion with its stage resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanionStatus {
    pub companion: CompanionRecord,
    pub stage: StageCatalogEntry,
    pub next_stage: Option<StageCatalogEntry>,
    pub progress: Option<StageProgress>,
}

/// One mutex per user, so read-modify-write cycles for the same user never
/// interleave. Entries nobody holds are pruned on the next lookup.
#[derive(Debug, Default)]
struct UserLocks {
    locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLocks {
    fn lock_for(&self, user_id: &UserId) -> Result<Arc<Mutex<()>>, StorageError> {
        let mut locks = self.locks.lock().map_err(|_| StorageError::Poisoned)?;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Ok(Arc::clone(locks.entry(user_id.clone()).or_default()))
    }
}

/// Companion progress engine over a [`CompanionStore`].
pub struct ProgressEngine<S, C = SystemClock> {
    store: S,
    clock: C,
    policy: ProgressPolicy,
    catalog: StageCatalog,
    locks: UserLocks,
}

impl<S: CompanionStore> ProgressEngine<S, SystemClock> {
    /// Engine with the system clock, default policy and default catalog.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: CompanionStore, C: Clock> ProgressEngine<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            policy: ProgressPolicy::default(),
            catalog: StageCatalog::default(),
            locks: UserLocks::default(),
        }
    }

    pub fn with_policy(mut self, policy: ProgressPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_catalog(mut self, catalog: StageCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch the user's companion, creating a default one if absent.
    ///
    /// # Errors
    /// Propagates store failures as [`ProgressError::Storage`].
    pub fn ensure_companion(&self, user_id: &UserId) -> Result<CompanionRecord, ProgressError> {
        let (companion, created) = self.store.get_or_insert(user_id, self.clock.now())?;
        if created {
            tracing::info!(user_id = %user_id, "created companion");
        }
        Ok(companion)
    }

    /// Record a validated reading segment at `validation_timestamp`.
    ///
    /// Only the calendar date of the timestamp (in the policy's reference
    /// offset) matters. Calls for the same user are serialized within this
    /// engine.
    ///
    /// # Errors
    /// - [`ProgressError::Storage`] if the store fails; nothing is written.
    /// - [`ProgressError::NotFoundAfterEnsure`] if the row disappears between
    ///   ensure and update.
    /// - [`ProgressError::BackdatedValidation`] under the `reject` policy.
    pub fn update_progress(
        &self,
        user_id: &UserId,
        validation_timestamp: DateTime<Utc>,
    ) -> Result<UpdateProgressResult, ProgressError> {
        let lock = self.locks.lock_for(user_id)?;
        let _guard = lock.lock().map_err(|_| StorageError::Poisoned)?;

        let previous = self.ensure_companion(user_id)?;
        let now = self.clock.now();
        let validation_date = self.policy.local_date(validation_timestamp);
        let today = self.policy.local_date(now);

        let plan = plan_progress(&previous, validation_date, today, &self.policy, &self.catalog)?;
        tracing::debug!(
            user_id = %user_id,
            %validation_date,
            %today,
            update = ?plan.update,
            "planned companion update"
        );

        let companion = match self.store.update(user_id, &plan.update, now) {
            Ok(row) => row,
            Err(StorageError::NotFound(_)) => {
                return Err(ProgressError::NotFoundAfterEnsure {
                    user_id: user_id.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        for event in &plan.events {
            match event {
                ProgressEvent::RitualTriggered { ritual } => {
                    tracing::info!(user_id = %user_id, ?ritual, "ritual triggered");
                }
                ProgressEvent::StageEvolved { from, to } => {
                    tracing::info!(user_id = %user_id, from, to, "companion evolved");
                }
                _ => {}
            }
        }

        Ok(UpdateProgressResult {
            is_first_day: plan.rituals.is_first_day,
            is_first_week: plan.rituals.is_first_week,
            is_return_after_break: plan.rituals.is_return_after_break,
            companion,
            events: plan.events,
        })
    }

    /// The user's companion with its catalog stage and progress towards the
    /// next one. Creates the companion if it does not exist yet.
    ///
    /// # Errors
    /// Propagates store failures.
    pub fn companion_status(&self, user_id: &UserId) -> Result<CompanionStatus, ProgressError> {
        let companion = self.ensure_companion(user_id)?;
        let stage = self
            .catalog
            .get(companion.current_stage)
            .unwrap_or_else(|| self.catalog.stage_for_reading_days(companion.total_reading_days))
            .clone();
        let next_stage = self.catalog.next_stage(stage.id).cloned();
        let progress = self
            .catalog
            .progress_from(&stage, companion.total_reading_days);

        Ok(CompanionStatus {
            companion,
            stage,
            next_stage,
            progress,
        })
    }
}
