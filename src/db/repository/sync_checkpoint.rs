//! Checkpoint Store: one sync-progress row per user.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{from_micros, to_micros, DatabaseError};
use crate::models::SyncCheckpoint;

/// Which column a bootstrap insert sets. The other column keeps its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointInsert {
    LastSync(DateTime<Utc>),
    ChangesToken(String),
}

/// Fetch the checkpoint for `user_id`, or `None` when the user has never synced.
pub fn get_sync_checkpoint(
    conn: &Connection,
    user_id: &str,
) -> Result<Option<SyncCheckpoint>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT user_id, last_sync_at, next_changes_token, created_at, updated_at
             FROM glucose_sync_checkpoints WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        )
        .optional()?;

    let Some((user_id, last_sync_at, next_changes_token, created_at, updated_at)) = row else {
        return Ok(None);
    };

    Ok(Some(SyncCheckpoint {
        user_id,
        last_sync_at: from_micros(last_sync_at)?,
        next_changes_token,
        created_at: from_micros(created_at)?,
        updated_at: from_micros(updated_at)?,
    }))
}

/// Set `last_sync_at` on an existing row. Returns rows affected (0 or 1).
pub fn update_last_sync(
    conn: &Connection,
    user_id: &str,
    at: &DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    let now = to_micros(at);
    let updated = conn.execute(
        "UPDATE glucose_sync_checkpoints SET last_sync_at = ?2, updated_at = ?2
         WHERE user_id = ?1",
        params![user_id, now],
    )?;
    Ok(updated)
}

/// Replace the stored changes token on an existing row. Returns rows affected.
pub fn update_next_changes_token(
    conn: &Connection,
    user_id: &str,
    token: &str,
    at: &DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    let updated = conn.execute(
        "UPDATE glucose_sync_checkpoints SET next_changes_token = ?2, updated_at = ?3
         WHERE user_id = ?1",
        params![user_id, token, to_micros(at)],
    )?;
    Ok(updated)
}

/// Create the checkpoint row for `user_id` with one column set.
///
/// If a concurrent caller created the row first, only the named column is
/// overwritten, so two racing first-time calls converge on a single row
/// holding both values.
pub fn insert_sync_checkpoint(
    conn: &Connection,
    user_id: &str,
    insert: &CheckpointInsert,
    at: &DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let now = to_micros(at);
    match insert {
        CheckpointInsert::LastSync(last_sync_at) => {
            conn.execute(
                "INSERT INTO glucose_sync_checkpoints
                     (user_id, last_sync_at, next_changes_token, created_at, updated_at)
                 VALUES (?1, ?2, '', ?3, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET
                     last_sync_at = excluded.last_sync_at,
                     updated_at = excluded.updated_at",
                params![user_id, to_micros(last_sync_at), now],
            )?;
        }
        CheckpointInsert::ChangesToken(token) => {
            conn.execute(
                "INSERT INTO glucose_sync_checkpoints
                     (user_id, last_sync_at, next_changes_token, created_at, updated_at)
                 VALUES (?1, 0, ?2, ?3, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET
                     next_changes_token = excluded.next_changes_token,
                     updated_at = excluded.updated_at",
                params![user_id, token, now],
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_database;
    use chrono::Duration;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = open_database(
            &dir.path().join("glucose.db"),
            std::time::Duration::from_millis(100),
        )
        .unwrap();
        (dir, conn)
    }

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_773_000_000 + secs, 0).unwrap()
    }

    fn row_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM glucose_sync_checkpoints", [], |row| {
            row.get(0)
        })
        .unwrap()
    }

    #[test]
    fn absent_checkpoint_is_none() {
        let (_dir, conn) = test_db();
        assert!(get_sync_checkpoint(&conn, "u1").unwrap().is_none());
    }

    #[test]
    fn updates_on_absent_row_affect_nothing() {
        let (_dir, conn) = test_db();
        assert_eq!(update_last_sync(&conn, "u1", &t(0)).unwrap(), 0);
        assert_eq!(update_next_changes_token(&conn, "u1", "tok-12345", &t(0)).unwrap(), 0);
        assert_eq!(row_count(&conn), 0);
    }

    #[test]
    fn last_sync_insert_leaves_empty_token() {
        let (_dir, conn) = test_db();
        insert_sync_checkpoint(&conn, "u1", &CheckpointInsert::LastSync(t(5)), &t(5)).unwrap();

        let cp = get_sync_checkpoint(&conn, "u1").unwrap().unwrap();
        assert_eq!(cp.user_id, "u1");
        assert_eq!(cp.last_sync_at, t(5));
        assert_eq!(cp.next_changes_token, "");
        assert_eq!(cp.created_at, t(5));
    }

    #[test]
    fn token_insert_leaves_epoch_last_sync() {
        let (_dir, conn) = test_db();
        insert_sync_checkpoint(
            &conn,
            "u1",
            &CheckpointInsert::ChangesToken("tok-12345".into()),
            &t(1),
        )
        .unwrap();

        let cp = get_sync_checkpoint(&conn, "u1").unwrap().unwrap();
        assert_eq!(cp.next_changes_token, "tok-12345");
        assert_eq!(cp.last_sync_at.timestamp_micros(), 0);
    }

    #[test]
    fn updates_touch_only_their_column() {
        let (_dir, conn) = test_db();
        insert_sync_checkpoint(&conn, "u1", &CheckpointInsert::LastSync(t(0)), &t(0)).unwrap();

        assert_eq!(update_next_changes_token(&conn, "u1", "tok-aaaaa", &t(1)).unwrap(), 1);
        assert_eq!(update_last_sync(&conn, "u1", &t(2)).unwrap(), 1);

        let cp = get_sync_checkpoint(&conn, "u1").unwrap().unwrap();
        assert_eq!(cp.last_sync_at, t(2));
        assert_eq!(cp.next_changes_token, "tok-aaaaa");
        assert_eq!(cp.created_at, t(0));
        assert_eq!(cp.updated_at, t(2));
    }

    #[test]
    fn racing_inserts_merge_into_one_row() {
        let (_dir, conn) = test_db();
        insert_sync_checkpoint(
            &conn,
            "u1",
            &CheckpointInsert::ChangesToken("tok-12345".into()),
            &t(0),
        )
        .unwrap();
        // Second first-time caller lost the race: upsert keeps the token.
        insert_sync_checkpoint(&conn, "u1", &CheckpointInsert::LastSync(t(3)), &t(3)).unwrap();

        assert_eq!(row_count(&conn), 1);
        let cp = get_sync_checkpoint(&conn, "u1").unwrap().unwrap();
        assert_eq!(cp.next_changes_token, "tok-12345");
        assert_eq!(cp.last_sync_at, t(3));
        assert_eq!(cp.created_at, t(0));
    }

    #[test]
    fn checkpoints_are_per_user() {
        let (_dir, conn) = test_db();
        insert_sync_checkpoint(&conn, "u1", &CheckpointInsert::LastSync(t(0)), &t(0)).unwrap();
        insert_sync_checkpoint(
            &conn,
            "u2",
            &CheckpointInsert::LastSync(t(0) + Duration::hours(1)),
            &t(0),
        )
        .unwrap();

        assert_eq!(update_last_sync(&conn, "u1", &t(10)).unwrap(), 1);
        let u2 = get_sync_checkpoint(&conn, "u2").unwrap().unwrap();
        assert_eq!(u2.last_sync_at, t(0) + Duration::hours(1));
        assert_eq!(row_count(&conn), 2);
    }
}
