//! SQLite-backed companion store.
//!
//! One row per user in the `companions` table. Dates are stored as
//! `YYYY-MM-DD` text, instants as RFC 3339.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{data_dir, migrations, CompanionStore};
use crate::companion::{CompanionRecord, CompanionUpdate, UserId};
use crate::error::StorageError;

const SELECT_COLUMNS: &str = "user_id, current_stage, total_reading_days, current_streak,
    longest_streak, last_reading_date, segments_this_week, has_seen_birth_ritual,
    has_seen_week_ritual, has_seen_return_ritual, created_at, updated_at";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite database for companion storage.
pub struct Database {
    conn: Mutex<Connection>,
}

/// Column values as stored, before parsing dates and ids.
struct RawRow {
    user_id: String,
    current_stage: u32,
    total_reading_days: u32,
    current_streak: u32,
    longest_streak: u32,
    last_reading_date: Option<String>,
    segments_this_week: u32,
    has_seen_birth_ritual: bool,
    has_seen_week_ritual: bool,
    has_seen_return_ritual: bool,
    created_at: String,
    updated_at: String,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            current_stage: row.get(1)?,
            total_reading_days: row.get(2)?,
            current_streak: row.get(3)?,
            longest_streak: row.get(4)?,
            last_reading_date: row.get(5)?,
            segments_this_week: row.get(6)?,
            has_seen_birth_ritual: row.get(7)?,
            has_seen_week_ritual: row.get(8)?,
            has_seen_return_ritual: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn into_record(self) -> Result<CompanionRecord, StorageError> {
        let corrupt = |message: String| StorageError::Corrupt {
            user_id: self.user_id.clone(),
            message,
        };

        let user_id = UserId::new(self.user_id.clone()).map_err(|e| corrupt(e.to_string()))?;
        let last_reading_date = self
            .last_reading_date
            .as_deref()
            .map(|s| NaiveDate::parse_from_str(s, DATE_FORMAT))
            .transpose()
            .map_err(|e| corrupt(format!("last_reading_date: {e}")))?;
        let created_at = parse_instant(&self.created_at).map_err(|e| corrupt(format!("created_at: {e}")))?;
        let updated_at = parse_instant(&self.updated_at).map_err(|e| corrupt(format!("updated_at: {e}")))?;

        Ok(CompanionRecord {
            user_id,
            current_stage: self.current_stage,
            total_reading_days: self.total_reading_days,
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
            last_reading_date,
            segments_this_week: self.segments_this_week,
            has_seen_birth_ritual: self.has_seen_birth_ritual,
            has_seen_week_ritual: self.has_seen_week_ritual,
            has_seen_return_ritual: self.has_seen_return_ritual,
            created_at,
            updated_at,
        })
    }
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl Database {
    /// Open the database at `~/.config/vread/vread.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        let path = data_dir()?.join("vread.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        migrations::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    /// All companions, most recent reader first.
    pub fn list(&self) -> Result<Vec<CompanionRecord>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM companions
             ORDER BY last_reading_date IS NULL, last_reading_date DESC, user_id"
        ))?;
        let rows = stmt.query_map([], RawRow::from_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_record()?);
        }
        Ok(out)
    }

    fn select(conn: &Connection, user_id: &UserId) -> Result<Option<CompanionRecord>, StorageError> {
        conn.query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM companions WHERE user_id = ?1"),
            params![user_id.as_str()],
            RawRow::from_row,
        )
        .optional()?
        .map(RawRow::into_record)
        .transpose()
    }

    fn insert_row(conn: &Connection, record: &CompanionRecord, or_ignore: bool) -> rusqlite::Result<usize> {
        let verb = if or_ignore { "INSERT OR IGNORE" } else { "INSERT" };
        conn.execute(
            &format!(
                "{verb} INTO companions ({SELECT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ),
            params![
                record.user_id.as_str(),
                record.current_stage,
                record.total_reading_days,
                record.current_streak,
                record.longest_streak,
                record.last_reading_date.map(format_date),
                record.segments_this_week,
                record.has_seen_birth_ritual,
                record.has_seen_week_ritual,
                record.has_seen_return_ritual,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )
    }
}

impl CompanionStore for Database {
    fn get(&self, user_id: &UserId) -> Result<Option<CompanionRecord>, StorageError> {
        let conn = self.conn()?;
        Self::select(&conn, user_id)
    }

    fn insert(&self, record: &CompanionRecord) -> Result<CompanionRecord, StorageError> {
        let conn = self.conn()?;
        match Self::insert_row(&conn, record, false) {
            Ok(_) => Ok(record.clone()),
            Err(e) if is_constraint_violation(&e) => {
                Err(StorageError::AlreadyExists(record.user_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn update(
        &self,
        user_id: &UserId,
        update: &CompanionUpdate,
        now: DateTime<Utc>,
    ) -> Result<CompanionRecord, StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let changed = tx.execute(
            "UPDATE companions SET
                current_stage          = COALESCE(?2, current_stage),
                total_reading_days     = COALESCE(?3, total_reading_days),
                current_streak         = COALESCE(?4, current_streak),
                longest_streak         = COALESCE(?5, longest_streak),
                last_reading_date      = COALESCE(?6, last_reading_date),
                segments_this_week     = COALESCE(?7, segments_this_week),
                has_seen_birth_ritual  = (has_seen_birth_ritual OR ?8),
                has_seen_week_ritual   = (has_seen_week_ritual OR ?9),
                has_seen_return_ritual = (has_seen_return_ritual OR ?10),
                updated_at             = ?11
             WHERE user_id = ?1",
            params![
                user_id.as_str(),
                update.current_stage,
                update.total_reading_days,
                update.current_streak,
                update.longest_streak,
                update.last_reading_date.map(format_date),
                update.segments_this_week,
                update.has_seen_birth_ritual,
                update.has_seen_week_ritual,
                update.has_seen_return_ritual,
                now.to_rfc3339(),
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(user_id.to_string()));
        }

        let row = Self::select(&tx, user_id)?
            .ok_or_else(|| StorageError::NotFound(user_id.to_string()))?;
        tx.commit()?;
        Ok(row)
    }

    fn get_or_insert(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<(CompanionRecord, bool), StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let inserted = Self::insert_row(&tx, &CompanionRecord::new(user_id.clone(), now), true)?;
        let row = Self::select(&tx, user_id)?
            .ok_or_else(|| StorageError::NotFound(user_id.to_string()))?;
        tx.commit()?;
        Ok((row, inserted > 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[test]
    fn insert_get_roundtrip() {
        let db = Database::open_memory().unwrap();
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        let mut rec = CompanionRecord::new(user("reader"), now);
        rec.last_reading_date = NaiveDate::from_ymd_opt(2025, 4, 30);
        rec.has_seen_birth_ritual = true;

        db.insert(&rec).unwrap();
        assert_eq!(db.get(&user("reader")).unwrap(), Some(rec));
        assert!(db.get(&user("nobody")).unwrap().is_none());
    }

    #[test]
    fn duplicate_insert_maps_to_already_exists() {
        let db = Database::open_memory().unwrap();
        let rec = CompanionRecord::new(user("reader"), Utc::now());
        db.insert(&rec).unwrap();
        assert!(matches!(db.insert(&rec), Err(StorageError::AlreadyExists(_))));
    }

    #[test]
    fn partial_update_leaves_other_columns() {
        let db = Database::open_memory().unwrap();
        let created = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        db.get_or_insert(&user("reader"), created).unwrap();

        let later = created + chrono::Duration::hours(3);
        let row = db
            .update(
                &user("reader"),
                &CompanionUpdate {
                    current_streak: Some(3),
                    last_reading_date: NaiveDate::from_ymd_opt(2025, 5, 1),
                    has_seen_week_ritual: true,
                    ..Default::default()
                },
                later,
            )
            .unwrap();

        assert_eq!(row.current_streak, 3);
        assert_eq!(row.total_reading_days, 0);
        assert_eq!(row.current_stage, 1);
        assert!(row.has_seen_week_ritual);
        assert!(!row.has_seen_birth_ritual);
        assert_eq!(row.created_at, created);
        assert_eq!(row.updated_at, later);
    }

    #[test]
    fn ritual_flags_cannot_be_cleared() {
        let db = Database::open_memory().unwrap();
        db.get_or_insert(&user("reader"), Utc::now()).unwrap();
        let set = CompanionUpdate {
            has_seen_return_ritual: true,
            ..Default::default()
        };
        db.update(&user("reader"), &set, Utc::now()).unwrap();
        let row = db
            .update(&user("reader"), &CompanionUpdate::default(), Utc::now())
            .unwrap();
        assert!(row.has_seen_return_ritual);
    }

    #[test]
    fn update_missing_row_is_not_found() {
        let db = Database::open_memory().unwrap();
        let result = db.update(&user("ghost"), &CompanionUpdate::default(), Utc::now());
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn corrupt_date_is_reported() {
        let db = Database::open_memory().unwrap();
        db.get_or_insert(&user("reader"), Utc::now()).unwrap();
        db.conn()
            .unwrap()
            .execute(
                "UPDATE companions SET last_reading_date = 'yesterday' WHERE user_id = 'reader'",
                [],
            )
            .unwrap();
        assert!(matches!(
            db.get(&user("reader")),
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[test]
    fn list_orders_recent_readers_first() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        for id in ["a", "b", "c"] {
            db.get_or_insert(&user(id), now).unwrap();
        }
        for (id, day) in [("a", 1), ("c", 5)] {
            db.update(
                &user(id),
                &CompanionUpdate {
                    last_reading_date: NaiveDate::from_ymd_opt(2025, 6, day),
                    ..Default::default()
                },
                now,
            )
            .unwrap();
        }
        let ids: Vec<String> = db
            .list()
            .unwrap()
            .into_iter()
            .map(|r| r.user_id.to_string())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
