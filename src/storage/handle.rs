//! Shared async access to the database.
//!
//! A [`DatabaseHandle`] can be cloned freely. Every call locks the single
//! connection for the duration of its closure, so calls never interleave.

use crate::storage::config::ExecutionMode;
use crate::storage::database::{Database, DatabaseError};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Cloneable async front for a [`Database`].
#[derive(Clone)]
pub struct DatabaseHandle {
    inner: Arc<Mutex<Option<Database>>>,
    mode: ExecutionMode,
}

impl DatabaseHandle {
    /// Wrap an already opened database.
    pub fn new(db: Database, mode: ExecutionMode) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(db))),
            mode,
        }
    }

    /// Open or create the database file off the async runtime.
    pub async fn open(
        path: impl Into<PathBuf>,
        busy_timeout: Duration,
        mode: ExecutionMode,
    ) -> Result<Self, DatabaseError> {
        let path = path.into();
        let db = tokio::task::spawn_blocking(move || Database::open_with_timeout(&path, busy_timeout))
            .await
            .map_err(|e| DatabaseError::TaskFailed(e.to_string()))??;

        Ok(Self::new(db, mode))
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Run `f` against the database.
    ///
    /// In [`ExecutionMode::Blocking`] the closure runs on tokio's blocking
    /// pool; dropping the returned future does not stop it.
    pub async fn call<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Database) -> Result<T, DatabaseError> + Send + 'static,
        T: Send + 'static,
    {
        match self.mode {
            ExecutionMode::Inline => with_database(&self.inner, f),
            ExecutionMode::Blocking => {
                let inner = Arc::clone(&self.inner);
                tokio::task::spawn_blocking(move || with_database(&inner, f))
                    .await
                    .map_err(|e| DatabaseError::TaskFailed(e.to_string()))?
            }
        }
    }

    /// Close the connection. Later calls on any clone fail with
    /// [`DatabaseError::Closed`]; closing twice is a no-op.
    pub async fn close(&self) -> Result<(), DatabaseError> {
        let inner = Arc::clone(&self.inner);
        let close = move || {
            let db = inner
                .lock()
                .map_err(|e| DatabaseError::TaskFailed(format!("Lock poisoned: {}", e)))?
                .take();
            match db {
                Some(db) => db.close(),
                None => Ok(()),
            }
        };

        match self.mode {
            ExecutionMode::Inline => close(),
            ExecutionMode::Blocking => tokio::task::spawn_blocking(close)
                .await
                .map_err(|e| DatabaseError::TaskFailed(e.to_string()))?,
        }
    }
}

impl std::fmt::Debug for DatabaseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseHandle")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

fn with_database<F, T>(inner: &Mutex<Option<Database>>, f: F) -> Result<T, DatabaseError>
where
    F: FnOnce(&Database) -> Result<T, DatabaseError>,
{
    let guard = inner
        .lock()
        .map_err(|e| DatabaseError::TaskFailed(format!("Lock poisoned: {}", e)))?;

    match guard.as_ref() {
        Some(db) => f(db),
        None => Err(DatabaseError::Closed),
    }
}
