pub mod repository;
pub mod sqlite;

pub use repository::*;
pub use sqlite::*;

use chrono::{DateTime, Utc};
use rusqlite::ffi;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("Required data missing: {0}")]
    MissingData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl DatabaseError {
    /// Sort a failed write into constraint, validation, or unclassified.
    ///
    /// UNIQUE / PRIMARY KEY violations are constraint errors, NOT NULL is
    /// missing data, CHECK and type mismatches are invalid data. Anything
    /// else stays an opaque `Sqlite` error.
    pub fn classify_write(err: rusqlite::Error) -> Self {
        let (extended_code, detail) = match &err {
            rusqlite::Error::SqliteFailure(failure, detail) => (
                failure.extended_code,
                detail.clone().unwrap_or_else(|| failure.to_string()),
            ),
            rusqlite::Error::ToSqlConversionFailure(e) => {
                return DatabaseError::InvalidData(e.to_string());
            }
            _ => return DatabaseError::Sqlite(err),
        };

        match extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                DatabaseError::ConstraintViolation(detail)
            }
            ffi::SQLITE_CONSTRAINT_NOTNULL => DatabaseError::MissingData(detail),
            ffi::SQLITE_CONSTRAINT_CHECK | ffi::SQLITE_MISMATCH => {
                DatabaseError::InvalidData(detail)
            }
            _ => DatabaseError::Sqlite(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound { .. })
    }
}

/// Timestamps are stored as INTEGER microseconds since the Unix epoch.
pub fn to_micros(at: &DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

pub fn from_micros(micros: i64) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::<Utc>::from_timestamp_micros(micros)
        .ok_or_else(|| DatabaseError::InvalidData(format!("timestamp out of range: {micros}")))
}
