//! Core error types for vread-core.
//!
//! Storage, progress and configuration failures each get their own enum;
//! [`CoreError`] folds them together for callers (such as the CLI) that only
//! want to report.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Core error type for vread-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Record store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Companion progress errors
    #[error("Progress error: {0}")]
    Progress(#[from] ProgressError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Record store errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    Sqlite(#[source] rusqlite::Error),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A stored row could not be decoded
    #[error("Corrupt companion row for '{user_id}': {message}")]
    Corrupt { user_id: String, message: String },

    /// Insert collided with an existing row
    #[error("Companion for '{0}' already exists")]
    AlreadyExists(String),

    /// Update targeted a missing row
    #[error("No companion for '{0}'")]
    NotFound(String),

    /// A store mutex was poisoned by a panicking holder
    #[error("Store lock poisoned")]
    Poisoned,

    /// Data directory could not be resolved or created
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the companion progress engine.
#[derive(Error, Debug)]
pub enum ProgressError {
    /// The record store failed; carries the original cause.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// `update` found no row even though the companion was just ensured.
    #[error("Companion for '{user_id}' vanished after ensure")]
    NotFoundAfterEnsure { user_id: String },

    /// Validation dated before the last recorded reading day, under the
    /// `reject` backdated policy.
    #[error("Validation on {attempted} is earlier than last reading day {last}")]
    BackdatedValidation {
        last: NaiveDate,
        attempted: NaiveDate,
    },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Empty identifier
    #[error("User id must not be empty")]
    EmptyUserId,

    /// Malformed stage catalog
    #[error("Invalid stage catalog: {0}")]
    InvalidCatalog(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        let locked = matches!(
            &err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
        );
        if locked {
            StorageError::Locked
        } else {
            StorageError::Sqlite(err)
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
