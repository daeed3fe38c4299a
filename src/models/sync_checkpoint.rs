use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-user sync progress. At most one row exists per `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCheckpoint {
    pub user_id: String,
    /// Epoch when the row was created by a token save and never marked complete.
    pub last_sync_at: DateTime<Utc>,
    /// Opaque continuation token from the device's upstream change feed.
    pub next_changes_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
