//! In-process companion store.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::CompanionStore;
use crate::companion::{CompanionRecord, CompanionUpdate, UserId};
use crate::error::StorageError;

/// Companion records held in a `HashMap` behind a mutex. Nothing survives
/// the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<UserId, CompanionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CompanionStore for MemoryStore {
    fn get(&self, user_id: &UserId) -> Result<Option<CompanionRecord>, StorageError> {
        let rows = self.rows.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(rows.get(user_id).cloned())
    }

    fn insert(&self, record: &CompanionRecord) -> Result<CompanionRecord, StorageError> {
        let mut rows = self.rows.lock().map_err(|_| StorageError::Poisoned)?;
        if rows.contains_key(&record.user_id) {
            return Err(StorageError::AlreadyExists(record.user_id.to_string()));
        }
        rows.insert(record.user_id.clone(), record.clone());
        Ok(record.clone())
    }

    fn update(
        &self,
        user_id: &UserId,
        update: &CompanionUpdate,
        now: DateTime<Utc>,
    ) -> Result<CompanionRecord, StorageError> {
        let mut rows = self.rows.lock().map_err(|_| StorageError::Poisoned)?;
        let row = rows
            .get_mut(user_id)
            .ok_or_else(|| StorageError::NotFound(user_id.to_string()))?;
        row.apply(update, now);
        Ok(row.clone())
    }

    fn get_or_insert(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<(CompanionRecord, bool), StorageError> {
        let mut rows = self.rows.lock().map_err(|_| StorageError::Poisoned)?;
        match rows.entry(user_id.clone()) {
            Entry::Occupied(row) => Ok((row.get().clone(), false)),
            Entry::Vacant(slot) => {
                let row = slot.insert(CompanionRecord::new(user_id.clone(), now));
                Ok((row.clone(), true))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[test]
    fn insert_then_get() {
        let store = MemoryStore::new();
        let rec = CompanionRecord::new(user("a"), Utc::now());
        store.insert(&rec).unwrap();
        assert_eq!(store.get(&user("a")).unwrap(), Some(rec));
        assert!(store.get(&user("b")).unwrap().is_none());
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let store = MemoryStore::new();
        let rec = CompanionRecord::new(user("a"), Utc::now());
        store.insert(&rec).unwrap();
        assert!(matches!(
            store.insert(&rec),
            Err(StorageError::AlreadyExists(_))
        ));
    }

    #[test]
    fn update_missing_row_is_not_found() {
        let store = MemoryStore::new();
        let result = store.update(&user("ghost"), &CompanionUpdate::default(), Utc::now());
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn get_or_insert_keeps_existing_row() {
        let store = MemoryStore::new();
        let (first, created) = store.get_or_insert(&user("a"), Utc::now()).unwrap();
        assert!(created);
        store
            .update(
                &user("a"),
                &CompanionUpdate {
                    segments_this_week: Some(4),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();
        let (again, created) = store.get_or_insert(&user("a"), Utc::now()).unwrap();
        assert!(!created);
        assert_eq!(again.segments_this_week, 4);
        assert_eq!(again.created_at, first.created_at);
        assert_eq!(store.len(), 1);
    }
}
