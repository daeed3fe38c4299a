use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{GlucoseLevelType, MealType, RelationToMeal, SpecimenSource};

/// Identity and bookkeeping fields shared by every health record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordHeader {
    /// Server-assigned, immutable once created.
    pub record_uuid: Uuid,
    pub user_id: String,
    /// Client-assigned; not unique server-side.
    pub device_record_id: String,
    pub created_at: DateTime<Utc>,
    /// Authoritative for delta queries.
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Measurement payload as captured on the device.
///
/// `time` stays in device-local form; `zone_id` and `offset_id` are kept
/// alongside it rather than normalizing to UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlucoseMeasurement {
    pub time: String,
    pub zone_id: String,
    pub offset_id: String,
    pub level: f64,
    pub level_type: GlucoseLevelType,
    pub specimen_source: SpecimenSource,
    pub meal: MealType,
    pub relation_to_meal: RelationToMeal,
}

/// A stored glucose measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseRecord {
    #[serde(flatten)]
    pub header: RecordHeader,
    #[serde(flatten)]
    pub measurement: GlucoseMeasurement,
}

impl GlucoseRecord {
    pub fn is_deleted(&self) -> bool {
        self.header.deleted_at.is_some()
    }
}

/// Upload payload before the store assigns identity and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGlucoseRecord {
    pub device_record_id: String,
    pub measurement: GlucoseMeasurement,
}
