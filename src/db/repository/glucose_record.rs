//! Record Store: glucose measurement rows keyed by server-assigned UUID.
//!
//! Rows are never hard-deleted; every read skips soft-deleted rows.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::{from_micros, to_micros, DatabaseError};
use crate::models::{
    GlucoseLevelType, GlucoseMeasurement, GlucoseRecord, MealType, NewGlucoseRecord,
    RecordHeader, RelationToMeal, SpecimenSource,
};

const SELECT_COLUMNS: &str =
    "SELECT uuid, user_id, device_record_id, time, zone_id, offset_id, level, level_type,
            specimen_source, meal, relation_to_meal, created_at, updated_at, deleted_at
     FROM glucose_records";

/// Insert a new record for `user_id` and return its assigned UUID.
///
/// No uniqueness check on `device_record_id`; deduplication is left to the
/// device. Failures come back classified as `ConstraintViolation`,
/// `MissingData`/`InvalidData`, or unclassified `Sqlite`.
pub fn insert_glucose_record(
    conn: &Connection,
    user_id: &str,
    record: &NewGlucoseRecord,
    at: &DateTime<Utc>,
) -> Result<Uuid, DatabaseError> {
    if user_id.trim().is_empty() {
        return Err(DatabaseError::MissingData("user_id".into()));
    }
    if !record.measurement.level.is_finite() {
        return Err(DatabaseError::InvalidData(format!(
            "level must be finite, got {}",
            record.measurement.level
        )));
    }

    let uuid = Uuid::new_v4();
    let m = &record.measurement;
    let now = to_micros(at);

    conn.execute(
        "INSERT INTO glucose_records (uuid, user_id, device_record_id, time, zone_id, offset_id,
         level, level_type, specimen_source, meal, relation_to_meal, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
        params![
            uuid.to_string(),
            user_id,
            record.device_record_id,
            m.time,
            m.zone_id,
            m.offset_id,
            m.level,
            m.level_type.as_u8(),
            m.specimen_source.as_u8(),
            m.meal.as_u8(),
            m.relation_to_meal.as_u8(),
            now,
        ],
    )
    .map_err(DatabaseError::classify_write)?;

    Ok(uuid)
}

/// Fetch one live record owned by `user_id`.
pub fn get_glucose_record(
    conn: &Connection,
    user_id: &str,
    record_uuid: &Uuid,
) -> Result<GlucoseRecord, DatabaseError> {
    let sql = format!("{SELECT_COLUMNS} WHERE user_id = ?1 AND uuid = ?2 AND deleted_at IS NULL");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row(params![user_id, record_uuid.to_string()], read_row)
        .optional()?;

    match row {
        Some(row) => glucose_record_from_row(row),
        None => Err(DatabaseError::NotFound {
            entity_type: "GlucoseRecord".into(),
            id: record_uuid.to_string(),
        }),
    }
}

/// List live records owned by `user_id`, most recently modified first.
///
/// With `modified_after` set, only rows with `updated_at` strictly greater
/// are returned. `None` means every live row.
pub fn list_glucose_records(
    conn: &Connection,
    user_id: &str,
    modified_after: Option<&DateTime<Utc>>,
) -> Result<Vec<GlucoseRecord>, DatabaseError> {
    let rows = match modified_after {
        Some(after) => {
            let sql = format!(
                "{SELECT_COLUMNS}
                 WHERE user_id = ?1 AND deleted_at IS NULL AND updated_at > ?2
                 ORDER BY updated_at DESC, id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![user_id, to_micros(after)], read_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
        None => {
            let sql = format!(
                "{SELECT_COLUMNS}
                 WHERE user_id = ?1 AND deleted_at IS NULL
                 ORDER BY updated_at DESC, id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![user_id], read_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
    };

    rows.into_iter().map(glucose_record_from_row).collect()
}

/// Whether `user_id` already has a live record with this device-side id.
pub fn device_record_exists(
    conn: &Connection,
    user_id: &str,
    device_record_id: &str,
) -> Result<bool, DatabaseError> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM glucose_records
                       WHERE user_id = ?1 AND device_record_id = ?2 AND deleted_at IS NULL)",
        params![user_id, device_record_id],
        |row| row.get(0),
    )?;
    Ok(exists != 0)
}

/// Soft-delete a record. Bumps `updated_at` so the change stays visible
/// to delta readers that track last-modified.
pub fn soft_delete_glucose_record(
    conn: &Connection,
    user_id: &str,
    record_uuid: &Uuid,
    at: &DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let now = to_micros(at);
    let updated = conn.execute(
        "UPDATE glucose_records
         SET deleted_at = ?3, updated_at = MAX(?3, updated_at + 1)
         WHERE user_id = ?1 AND uuid = ?2 AND deleted_at IS NULL",
        params![user_id, record_uuid.to_string(), now],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "GlucoseRecord".into(),
            id: record_uuid.to_string(),
        });
    }
    Ok(())
}

// Internal row type for GlucoseRecord mapping
struct GlucoseRecordRow {
    uuid: String,
    user_id: String,
    device_record_id: String,
    time: String,
    zone_id: String,
    offset_id: String,
    level: f64,
    level_type: u8,
    specimen_source: u8,
    meal: u8,
    relation_to_meal: u8,
    created_at: i64,
    updated_at: i64,
    deleted_at: Option<i64>,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<GlucoseRecordRow> {
    Ok(GlucoseRecordRow {
        uuid: row.get(0)?,
        user_id: row.get(1)?,
        device_record_id: row.get(2)?,
        time: row.get(3)?,
        zone_id: row.get(4)?,
        offset_id: row.get(5)?,
        level: row.get(6)?,
        level_type: row.get(7)?,
        specimen_source: row.get(8)?,
        meal: row.get(9)?,
        relation_to_meal: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
        deleted_at: row.get(13)?,
    })
}

fn glucose_record_from_row(row: GlucoseRecordRow) -> Result<GlucoseRecord, DatabaseError> {
    let record_uuid = Uuid::parse_str(&row.uuid)
        .map_err(|e| DatabaseError::InvalidData(format!("uuid {}: {e}", row.uuid)))?;

    Ok(GlucoseRecord {
        header: RecordHeader {
            record_uuid,
            user_id: row.user_id,
            device_record_id: row.device_record_id,
            created_at: from_micros(row.created_at)?,
            updated_at: from_micros(row.updated_at)?,
            deleted_at: row.deleted_at.map(from_micros).transpose()?,
        },
        measurement: GlucoseMeasurement {
            time: row.time,
            zone_id: row.zone_id,
            offset_id: row.offset_id,
            level: row.level,
            level_type: GlucoseLevelType::try_from(row.level_type)?,
            specimen_source: SpecimenSource::try_from(row.specimen_source)?,
            meal: MealType::try_from(row.meal)?,
            relation_to_meal: RelationToMeal::try_from(row.relation_to_meal)?,
        },
    })
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

    fn make_record(device_record_id: &str, level: f64) -> NewGlucoseRecord {
        NewGlucoseRecord {
            device_record_id: device_record_id.to_string(),
            measurement: GlucoseMeasurement {
                time: "2026-03-14T07:45:00".to_string(),
                zone_id: "Europe/Berlin".to_string(),
                offset_id: "+01:00".to_string(),
                level,
                level_type: GlucoseLevelType::MilliMolesPerLiter,
                specimen_source: SpecimenSource::CapillaryBlood,
                meal: MealType::Breakfast,
                relation_to_meal: RelationToMeal::BeforeMeal,
            },
        }
    }

    fn base_time() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_773_000_000, 0).unwrap()
    }

    #[test]
    fn insert_and_get_round_trip() {
        let (_dir, conn) = test_db();
        let new = make_record("dev-00001", 5.4);
        let at = base_time();
        let uuid = insert_glucose_record(&conn, "u1", &new, &at).unwrap();

        let stored = get_glucose_record(&conn, "u1", &uuid).unwrap();
        assert_eq!(stored.header.record_uuid, uuid);
        assert_eq!(stored.header.user_id, "u1");
        assert_eq!(stored.header.device_record_id, "dev-00001");
        assert_eq!(stored.header.created_at, at);
        assert_eq!(stored.header.updated_at, at);
        assert!(!stored.is_deleted());
        assert_eq!(stored.measurement, new.measurement);
    }

    #[test]
    fn get_unknown_uuid_is_not_found() {
        let (_dir, conn) = test_db();
        let result = get_glucose_record(&conn, "u1", &Uuid::new_v4());
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn get_other_users_record_is_not_found() {
        let (_dir, conn) = test_db();
        let uuid = insert_glucose_record(&conn, "u1", &make_record("dev-00001", 5.0), &base_time())
            .unwrap();
        let result = get_glucose_record(&conn, "u2", &uuid);
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn duplicate_device_record_ids_are_stored() {
        let (_dir, conn) = test_db();
        let a = insert_glucose_record(&conn, "u1", &make_record("dev-dup-1", 5.0), &base_time())
            .unwrap();
        let b = insert_glucose_record(&conn, "u1", &make_record("dev-dup-1", 6.0), &base_time())
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(list_glucose_records(&conn, "u1", None).unwrap().len(), 2);
    }

    #[test]
    fn empty_user_is_missing_data() {
        let (_dir, conn) = test_db();
        let result = insert_glucose_record(&conn, " ", &make_record("dev-00001", 5.0), &base_time());
        assert!(matches!(result, Err(DatabaseError::MissingData(_))));
    }

    #[test]
    fn non_finite_level_is_invalid_data() {
        let (_dir, conn) = test_db();
        let result =
            insert_glucose_record(&conn, "u1", &make_record("dev-00001", f64::NAN), &base_time());
        assert!(matches!(result, Err(DatabaseError::InvalidData(_))));
    }

    #[test]
    fn check_violation_from_raw_insert_is_invalid_data() {
        let (_dir, conn) = test_db();
        let err = conn
            .execute(
                "INSERT INTO glucose_records (uuid, user_id, device_record_id, time, zone_id,
                 offset_id, level, level_type, specimen_source, meal, relation_to_meal,
                 created_at, updated_at)
                 VALUES ('x', 'u1', 'd', 't', 'z', 'o', 1.0, 9, 0, 0, 0, 0, 0)",
                [],
            )
            .unwrap_err();
        assert!(matches!(
            DatabaseError::classify_write(err),
            DatabaseError::InvalidData(_)
        ));
    }

    #[test]
    fn list_all_orders_by_updated_desc() {
        let (_dir, conn) = test_db();
        let t0 = base_time();
        let first =
            insert_glucose_record(&conn, "u1", &make_record("dev-00001", 5.0), &t0).unwrap();
        let second = insert_glucose_record(
            &conn,
            "u1",
            &make_record("dev-00002", 6.0),
            &(t0 + Duration::seconds(1)),
        )
        .unwrap();
        let third = insert_glucose_record(
            &conn,
            "u1",
            &make_record("dev-00003", 7.0),
            &(t0 + Duration::seconds(2)),
        )
        .unwrap();

        let uuids: Vec<Uuid> = list_glucose_records(&conn, "u1", None)
            .unwrap()
            .into_iter()
            .map(|r| r.header.record_uuid)
            .collect();
        assert_eq!(uuids, vec![third, second, first]);
    }

    #[test]
    fn equal_timestamps_order_newest_insert_first() {
        let (_dir, conn) = test_db();
        let at = base_time();
        let first = insert_glucose_record(&conn, "u1", &make_record("dev-00001", 5.0), &at).unwrap();
        let second =
            insert_glucose_record(&conn, "u1", &make_record("dev-00002", 5.0), &at).unwrap();

        let records = list_glucose_records(&conn, "u1", None).unwrap();
        assert_eq!(records[0].header.record_uuid, second);
        assert_eq!(records[1].header.record_uuid, first);
    }

    #[test]
    fn modified_after_is_strict() {
        let (_dir, conn) = test_db();
        let t0 = base_time();
        insert_glucose_record(&conn, "u1", &make_record("dev-00001", 5.0), &t0).unwrap();
        let later = insert_glucose_record(
            &conn,
            "u1",
            &make_record("dev-00002", 6.0),
            &(t0 + Duration::microseconds(1)),
        )
        .unwrap();

        let records = list_glucose_records(&conn, "u1", Some(&t0)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].header.record_uuid, later);
    }

    #[test]
    fn list_isolates_users() {
        let (_dir, conn) = test_db();
        insert_glucose_record(&conn, "u1", &make_record("dev-00001", 5.0), &base_time()).unwrap();
        insert_glucose_record(&conn, "u2", &make_record("dev-00002", 5.0), &base_time()).unwrap();

        assert_eq!(list_glucose_records(&conn, "u1", None).unwrap().len(), 1);
        assert_eq!(list_glucose_records(&conn, "u3", None).unwrap().len(), 0);
    }

    #[test]
    fn device_record_exists_checks_owner() {
        let (_dir, conn) = test_db();
        insert_glucose_record(&conn, "u1", &make_record("dev-00001", 5.0), &base_time()).unwrap();

        assert!(device_record_exists(&conn, "u1", "dev-00001").unwrap());
        assert!(!device_record_exists(&conn, "u2", "dev-00001").unwrap());
        assert!(!device_record_exists(&conn, "u1", "dev-99999").unwrap());
    }

    #[test]
    fn soft_deleted_records_are_hidden() {
        let (_dir, conn) = test_db();
        let uuid = insert_glucose_record(&conn, "u1", &make_record("dev-00001", 5.0), &base_time())
            .unwrap();

        soft_delete_glucose_record(&conn, "u1", &uuid, &base_time()).unwrap();

        assert!(matches!(
            get_glucose_record(&conn, "u1", &uuid),
            Err(DatabaseError::NotFound { .. })
        ));
        assert!(list_glucose_records(&conn, "u1", None).unwrap().is_empty());
        assert!(!device_record_exists(&conn, "u1", "dev-00001").unwrap());
    }

    #[test]
    fn soft_delete_strictly_advances_updated_at() {
        let (_dir, conn) = test_db();
        let at = base_time();
        let uuid = insert_glucose_record(&conn, "u1", &make_record("dev-00001", 5.0), &at).unwrap();

        // Same clock reading as the insert: last-modified must still move forward.
        soft_delete_glucose_record(&conn, "u1", &uuid, &at).unwrap();

        let updated_at: i64 = conn
            .query_row(
                "SELECT updated_at FROM glucose_records WHERE uuid = ?1",
                params![uuid.to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(updated_at, to_micros(&at) + 1);
    }

    #[test]
    fn soft_delete_twice_is_not_found() {
        let (_dir, conn) = test_db();
        let uuid = insert_glucose_record(&conn, "u1", &make_record("dev-00001", 5.0), &base_time())
            .unwrap();
        soft_delete_glucose_record(&conn, "u1", &uuid, &base_time()).unwrap();
        let again = soft_delete_glucose_record(&conn, "u1", &uuid, &base_time());
        assert!(matches!(again, Err(DatabaseError::NotFound { .. })));
    }
}
