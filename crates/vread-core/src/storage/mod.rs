mod config;
pub mod database;
pub mod memory;
pub mod migrations;

pub use config::Config;
pub use database::Database;
pub use memory::MemoryStore;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::companion::{CompanionRecord, CompanionUpdate, UserId};
use crate::error::StorageError;

/// Returns `~/.config/vread[-dev]/` based on VREAD_ENV.
///
/// Set VREAD_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("VREAD_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("vread-dev")
    } else {
        base_dir.join("vread")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Row store for companion records, keyed by user id.
///
/// Implementations must apply each `update` atomically: either every field
/// in the [`CompanionUpdate`] lands or none does.
pub trait CompanionStore: Send + Sync {
    /// Fetch the companion for `user_id`, if any.
    fn get(&self, user_id: &UserId) -> Result<Option<CompanionRecord>, StorageError>;

    /// Insert a new record. Fails with [`StorageError::AlreadyExists`] if
    /// the user already has one.
    fn insert(&self, record: &CompanionRecord) -> Result<CompanionRecord, StorageError>;

    /// Apply a partial update and return the full row afterwards. Fails with
    /// [`StorageError::NotFound`] if the user has no record.
    fn update(
        &self,
        user_id: &UserId,
        update: &CompanionUpdate,
        now: DateTime<Utc>,
    ) -> Result<CompanionRecord, StorageError>;

    /// Return the existing record or create a default one. The flag is
    /// `true` when this call created the row.
    ///
    /// Losing an insert race to a concurrent creator is not an error; the
    /// winner's row is returned.
    fn get_or_insert(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<(CompanionRecord, bool), StorageError> {
        if let Some(existing) = self.get(user_id)? {
            return Ok((existing, false));
        }
        match self.insert(&CompanionRecord::new(user_id.clone(), now)) {
            Ok(created) => Ok((created, true)),
            Err(StorageError::AlreadyExists(_)) => self
                .get(user_id)?
                .map(|existing| (existing, false))
                .ok_or_else(|| StorageError::NotFound(user_id.to_string())),
            Err(e) => Err(e),
        }
    }
}

macro_rules! forward_store {
    ($wrapper:ident) => {
        impl<S: CompanionStore + ?Sized> CompanionStore for $wrapper<S> {
            fn get(&self, user_id: &UserId) -> Result<Option<CompanionRecord>, StorageError> {
                (**self).get(user_id)
            }

            fn insert(&self, record: &CompanionRecord) -> Result<CompanionRecord, StorageError> {
                (**self).insert(record)
            }

            fn update(
                &self,
                user_id: &UserId,
                update: &CompanionUpdate,
                now: DateTime<Utc>,
            ) -> Result<CompanionRecord, StorageError> {
                (**self).update(user_id, update, now)
            }

            fn get_or_insert(
                &self,
                user_id: &UserId,
                now: DateTime<Utc>,
            ) -> Result<(CompanionRecord, bool), StorageError> {
                (**self).get_or_insert(user_id, now)
            }
        }
    };
}

forward_store!(Arc);
forward_store!(Box);
