use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};

use super::DatabaseError;

/// Handle to the shared SQLite file.
///
/// Holds no connection. Every operation opens its own, so the handle can
/// be cloned freely across request tasks and several server processes can
/// share the same file, serialized by SQLite's own locking.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
    busy_timeout: Duration,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>, busy_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            busy_timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a connection to an existing, migrated database.
    ///
    /// Does not create the file: a missing database is a store failure,
    /// not an empty store.
    pub fn connect(&self) -> Result<Connection, DatabaseError> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        configure_pragmas(&conn, self.busy_timeout)?;
        Ok(conn)
    }
}

/// Open (or create) the database at `path` and run migrations.
pub fn open_database(path: &Path, busy_timeout: Duration) -> Result<Connection, DatabaseError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::MigrationFailed {
                version: 0,
                reason: format!("cannot create {}: {e}", parent.display()),
            })?;
        }
    }
    let conn = Connection::open(path)?;
    configure_pragmas(&conn, busy_timeout)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open the database with retries, for startup against slow or shared volumes.
///
/// Blocks the calling thread between attempts.
pub fn open_database_with_retry(
    path: &Path,
    busy_timeout: Duration,
    attempts: u32,
    retry_delay: Duration,
) -> Result<Database, DatabaseError> {
    let mut remaining = attempts.max(1);
    loop {
        match open_database(path, busy_timeout) {
            Ok(_) => {
                tracing::info!(path = %path.display(), "Database ready");
                return Ok(Database::new(path, busy_timeout));
            }
            Err(e) => {
                remaining -= 1;
                if remaining == 0 {
                    return Err(e);
                }
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    attempts_left = remaining,
                    "Database not ready, retrying"
                );
                std::thread::sleep(retry_delay);
            }
        }
    }
}

fn configure_pragmas(conn: &Connection, busy_timeout: Duration) -> Result<(), DatabaseError> {
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![(
        1,
        include_str!("../../resources/migrations/001_glucose_records.sql"),
    )];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| DatabaseError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get::<_, i64>(0),
    )
    .unwrap_or(0)
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}
