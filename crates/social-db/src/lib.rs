pub mod migrations;
pub mod models;
pub mod queries;

use anyhow::Result;
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, ErrorCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the SQLite store.
///
/// Holds only the file location. Every operation opens its own connection and
/// drops it on return, so no connection outlives a single request and concurrent
/// writers are serialised by SQLite's own locking.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Self {
            path: path.to_path_buf(),
        };

        let conn = db.connect()?;
        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(db)
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        register_functions(&conn)?;
        Ok(conn)
    }
}

/// Scalar functions the queries rely on. SQLite's built-in `lower()` only folds ASCII.
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "unicode_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|v| v.to_lowercase()))
        },
    )?;
    Ok(())
}

/// True when `err` came from a UNIQUE, CHECK or FOREIGN KEY constraint.
pub fn is_constraint_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<rusqlite::Error>()
        .and_then(rusqlite::Error::sqlite_error_code)
        .is_some_and(|code| code == ErrorCode::ConstraintViolation)
}
