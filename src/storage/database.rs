//! Database connection, schema bootstrap and error type.
//!
//! [`Database`] owns a single rusqlite connection. The per-aggregate stores
//! ([`ExerciseStore`], [`WorkoutModelStore`], [`WorkoutSessionStore`]) borrow
//! it; async callers go through [`crate::storage::DatabaseHandle`].

use crate::storage::exercise_store::ExerciseStore;
use crate::storage::model_store::WorkoutModelStore;
use crate::storage::schema::{CONNECTION_PRAGMAS, CURRENT_VERSION, SCHEMA, SCHEMA_VERSION_TABLE};
use crate::storage::session_store::WorkoutSessionStore;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, ErrorCode, Result as SqliteResult};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Busy timeout used when none is configured.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Database wrapper for SQLite operations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open or create a database, waiting up to `busy_timeout` for locks
    /// held by other connections.
    pub fn open_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Self, DatabaseError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::IoError(e.to_string()))?;
        }

        let conn =
            Connection::open(path).map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        conn.busy_timeout(busy_timeout)
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        let db = Self { conn };
        db.initialize()?;

        tracing::info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        let db = Self { conn };
        db.initialize()?;

        Ok(db)
    }

    /// Apply connection settings and bring the schema up to date.
    fn initialize(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(CONNECTION_PRAGMAS)
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        // Create schema version table
        self.conn
            .execute_batch(SCHEMA_VERSION_TABLE)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

        let current_version = self.schema_version()?;

        if current_version < CURRENT_VERSION {
            self.migrate(current_version)?;
        }

        Ok(())
    }

    /// Get the current schema version.
    pub fn schema_version(&self) -> Result<i32, DatabaseError> {
        let result: SqliteResult<i32> = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        );

        match result {
            Ok(version) => Ok(version),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
            Err(e) => Err(DatabaseError::QueryFailed(e.to_string())),
        }
    }

    /// Run database migrations.
    fn migrate(&self, from_version: i32) -> Result<(), DatabaseError> {
        if from_version < 1 {
            let tx = self
                .conn
                .unchecked_transaction()
                .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

            tx.execute_batch(SCHEMA)
                .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

            tx.execute(
                "INSERT INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
                [CURRENT_VERSION],
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

            tx.commit()
                .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

            tracing::info!("Database migrated to version {}", CURRENT_VERSION);
        }

        Ok(())
    }

    /// Get a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Exercise and muscle group operations.
    pub fn exercises(&self) -> ExerciseStore<'_> {
        ExerciseStore::new(&self.conn)
    }

    /// Workout template operations.
    pub fn workout_models(&self) -> WorkoutModelStore<'_> {
        WorkoutModelStore::new(&self.conn)
    }

    /// Logged session operations.
    pub fn workout_sessions(&self) -> WorkoutSessionStore<'_> {
        WorkoutSessionStore::new(&self.conn)
    }

    /// Count the rows of one table from [`crate::storage::schema::TABLES`].
    pub fn count_rows(&self, table: &str) -> Result<usize, DatabaseError> {
        if !crate::storage::schema::TABLES.contains(&table) {
            return Err(DatabaseError::QueryFailed(format!("Unknown table: {}", table)));
        }

        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;

        Ok(count as usize)
    }

    /// Close the connection, flushing any pending state.
    pub fn close(self) -> Result<(), DatabaseError> {
        self.conn
            .close()
            .map_err(|(_, e)| DatabaseError::ConnectionFailed(e.to_string()))?;
        tracing::info!("Database closed");
        Ok(())
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.conn.path())
            .finish()
    }
}

/// Encode a timestamp for storage as Unix epoch milliseconds.
pub(crate) fn timestamp_millis(ts: &DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

/// Decode a timestamp written by [`timestamp_millis`].
pub(crate) fn timestamp_from_millis(millis: i64) -> Result<DateTime<Utc>, DatabaseError> {
    Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
        DatabaseError::DeserializationError(format!("Timestamp out of range: {}", millis))
    })
}

/// Build a `LIKE` pattern matching `term` anywhere, with `%` and `_` in the
/// term taken literally. Use with `ESCAPE '\'`.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Database errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Database task failed: {0}")]
    TaskFailed(String),

    #[error("Database is closed")]
    Closed,
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::IntegralValueOutOfRange(..) => {
                DatabaseError::DeserializationError(e.to_string())
            }
            _ if e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) => {
                DatabaseError::ConstraintViolation(e.to_string())
            }
            _ => DatabaseError::QueryFailed(e.to_string()),
        }
    }
}
