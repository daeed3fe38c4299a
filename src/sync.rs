//! Sync Coordinator: timestamp-based delta sync between the server and a device.
//!
//! The device uploads records as it captures them, asks for everything modified
//! since its last successful sync, then acknowledges with `mark_sync_complete`.
//! The per-user checkpoint is created lazily by the first acknowledgement or
//! token save; until then every read is a full snapshot.
//!
//! Every store failure is translated into exactly one `SyncError` kind here and
//! logged with its cause. Callers never see raw `DatabaseError`s.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{
    get_glucose_record, get_sync_checkpoint, insert_glucose_record, insert_sync_checkpoint,
    list_glucose_records, update_last_sync, update_next_changes_token, CheckpointInsert,
    Database, DatabaseError,
};
use crate::models::{GlucoseRecord, NewGlucoseRecord};

// ═══════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("failed to create glucose record")]
    RecordCreateFailed(#[source] DatabaseError),

    #[error("glucose record not found")]
    RecordNotFound,

    #[error("failed to retrieve glucose record")]
    RecordFetchFailed(#[source] DatabaseError),

    #[error("failed to retrieve unsynced glucose records")]
    DeltaFetchFailed(#[source] DatabaseError),

    #[error("failed to mark sync completion")]
    MarkSyncFailed(#[source] DatabaseError),

    #[error("failed to save next changes token")]
    SaveTokenFailed(#[source] DatabaseError),
}

// ═══════════════════════════════════════════════════════════════════════════
// Coordinator
// ═══════════════════════════════════════════════════════════════════════════

/// Stateless orchestration over the Record and Checkpoint stores.
///
/// Cheap to clone. Blocking: call from `spawn_blocking` in async contexts.
#[derive(Debug, Clone)]
pub struct SyncCoordinator {
    db: Database,
}

impl SyncCoordinator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Persist an uploaded record and return its server-assigned UUID.
    pub fn create_record(
        &self,
        user_id: &str,
        record: &NewGlucoseRecord,
    ) -> Result<Uuid, SyncError> {
        let result = self
            .db
            .connect()
            .and_then(|conn| insert_glucose_record(&conn, user_id, record, &Utc::now()));

        match result {
            Ok(uuid) => {
                tracing::debug!(user_id, record_uuid = %uuid, "Glucose record created");
                Ok(uuid)
            }
            Err(e) => {
                tracing::error!(
                    user_id,
                    device_record_id = %record.device_record_id,
                    error = %e,
                    "Failed to create glucose record"
                );
                Err(SyncError::RecordCreateFailed(e))
            }
        }
    }

    /// Records modified since the user's last completed sync, newest first.
    ///
    /// Without a checkpoint this is every live record the user owns. Never
    /// creates a checkpoint.
    pub fn get_records_since_last_sync(
        &self,
        user_id: &str,
    ) -> Result<Vec<GlucoseRecord>, SyncError> {
        self.read_delta(user_id).map_err(|e| {
            tracing::error!(user_id, error = %e, "Failed to read unsynced glucose records");
            SyncError::DeltaFetchFailed(e)
        })
    }

    /// One live record owned by `user_id`.
    pub fn get_record(&self, user_id: &str, record_uuid: &Uuid) -> Result<GlucoseRecord, SyncError> {
        let result = self
            .db
            .connect()
            .and_then(|conn| get_glucose_record(&conn, user_id, record_uuid));

        result.map_err(|e| {
            if e.is_not_found() {
                SyncError::RecordNotFound
            } else {
                tracing::error!(
                    user_id,
                    record_uuid = %record_uuid,
                    error = %e,
                    "Failed to read glucose record"
                );
                SyncError::RecordFetchFailed(e)
            }
        })
    }

    /// Advance the user's last-sync timestamp to now, creating the checkpoint on first use.
    pub fn mark_sync_complete(&self, user_id: &str) -> Result<(), SyncError> {
        let now = Utc::now();
        self.update_or_bootstrap(
            user_id,
            |conn| update_last_sync(conn, user_id, &now),
            CheckpointInsert::LastSync(now),
            &now,
        )
        .map_err(|e| {
            tracing::error!(user_id, error = %e, "Failed to mark sync complete");
            SyncError::MarkSyncFailed(e)
        })
    }

    /// Store the device's upstream continuation token, creating the checkpoint on first use.
    pub fn save_next_changes_token(&self, user_id: &str, token: &str) -> Result<(), SyncError> {
        let now = Utc::now();
        self.update_or_bootstrap(
            user_id,
            |conn| update_next_changes_token(conn, user_id, token, &now),
            CheckpointInsert::ChangesToken(token.to_string()),
            &now,
        )
        .map_err(|e| {
            tracing::error!(user_id, error = %e, "Failed to save next changes token");
            SyncError::SaveTokenFailed(e)
        })
    }

    /// Checkpoint lookup and record scan inside one read transaction, so the
    /// scan never runs against a checkpoint that moved in between.
    fn read_delta(&self, user_id: &str) -> Result<Vec<GlucoseRecord>, DatabaseError> {
        let conn = self.db.connect()?;
        let tx = conn.unchecked_transaction()?;

        let since = get_sync_checkpoint(&tx, user_id)?.map(|cp| cp.last_sync_at);
        let records = list_glucose_records(&tx, user_id, since.as_ref())?;

        tx.commit()?;
        tracing::debug!(
            user_id,
            first_sync = since.is_none(),
            count = records.len(),
            "Delta read"
        );
        Ok(records)
    }

    /// Update in place; on zero rows affected, fall back to the atomic upsert.
    ///
    /// The fallback is a different statement, not a retry of the update. A
    /// failing insert is returned as-is.
    fn update_or_bootstrap<F>(
        &self,
        user_id: &str,
        update: F,
        insert: CheckpointInsert,
        at: &DateTime<Utc>,
    ) -> Result<(), DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<usize, DatabaseError>,
    {
        let conn = self.db.connect()?;
        if update(&conn)? > 0 {
            return Ok(());
        }

        tracing::info!(user_id, "No sync checkpoint yet, creating one");
        insert_sync_checkpoint(&conn, user_id, &insert, at)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
