//! Database schema migrations for vread.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::Connection;

use crate::error::StorageError;

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if a migration fails or the database is newer than
/// this build understands.
pub fn migrate(conn: &Connection) -> Result<(), StorageError> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn)?;
    if current_version > SCHEMA_VERSION {
        return Err(StorageError::MigrationFailed(format!(
            "database version {current_version} is newer than supported {SCHEMA_VERSION}"
        )));
    }

    if current_version < 1 {
        tracing::info!("initializing companion schema v1");
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        tracing::info!("running companion migration to v2");
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )?;
    Ok(())
}

/// Returns 0 for a database that has never been migrated.
fn get_schema_version(conn: &Connection) -> Result<i32, StorageError> {
    match conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    }) {
        Ok(v) => Ok(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Migration v1: companion table.
fn migrate_v1(conn: &Connection) -> Result<(), StorageError> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS companions (
            user_id                 TEXT PRIMARY KEY,
            current_stage           INTEGER NOT NULL DEFAULT 1,
            total_reading_days      INTEGER NOT NULL DEFAULT 0,
            current_streak          INTEGER NOT NULL DEFAULT 0,
            longest_streak          INTEGER NOT NULL DEFAULT 0,
            last_reading_date       TEXT,
            segments_this_week      INTEGER NOT NULL DEFAULT 0,
            has_seen_birth_ritual   INTEGER NOT NULL DEFAULT 0,
            has_seen_week_ritual    INTEGER NOT NULL DEFAULT 0,
            has_seen_return_ritual  INTEGER NOT NULL DEFAULT 0,
            created_at              TEXT NOT NULL,
            updated_at              TEXT NOT NULL
        );",
    )
    .map_err(|e| StorageError::MigrationFailed(format!("v1: {e}")))?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: index for "who read recently" queries.
fn migrate_v2(conn: &Connection) -> Result<(), StorageError> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_companions_last_reading_date
            ON companions(last_reading_date);",
    )
    .map_err(|e| StorageError::MigrationFailed(format!("v2: {e}")))?;

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_migration_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);

        let tables: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'companions'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[test]
    fn migration_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn upgrades_from_v1() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 1);

        migrate(&conn).unwrap();
        let indexes: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'index' AND name = 'idx_companions_last_reading_date'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(indexes, 1);
    }

    #[test]
    fn refuses_newer_database() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        set_schema_version(&conn, SCHEMA_VERSION + 1).unwrap();
        assert!(matches!(
            migrate(&conn),
            Err(StorageError::MigrationFailed(_))
        ));
    }
}
