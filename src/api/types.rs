//! Shared types for the API layer: request context and wire shapes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::models::{
    GlucoseLevelType, GlucoseMeasurement, GlucoseRecord, MealType, NewGlucoseRecord,
    RelationToMeal, SpecimenSource,
};
use crate::sync::{SyncCoordinator, SyncError};

const MIN_DEVICE_RECORD_ID_LEN: usize = 5;
const MIN_CHANGES_TOKEN_LEN: usize = 5;

// ═══════════════════════════════════════════════════════════
// API context
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub coordinator: SyncCoordinator,
    pub api_key: Arc<str>,
}

impl ApiContext {
    pub fn new(coordinator: SyncCoordinator, api_key: impl Into<Arc<str>>) -> Self {
        Self {
            coordinator,
            api_key: api_key.into(),
        }
    }

    /// Run a coordinator call on the blocking pool.
    pub async fn run<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(&SyncCoordinator) -> Result<T, SyncError> + Send + 'static,
        T: Send + 'static,
    {
        let coordinator = self.coordinator.clone();
        let result = tokio::task::spawn_blocking(move || op(&coordinator))
            .await
            .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?;
        Ok(result?)
    }
}

/// Reject blank user ids from the path.
pub fn parse_user_id(raw: String) -> Result<String, ApiError> {
    if raw.trim().is_empty() {
        return Err(ApiError::InvalidUserId);
    }
    Ok(raw)
}

pub fn parse_record_uuid(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|e| ApiError::InvalidRecordUuid(e.to_string()))
}

// ═══════════════════════════════════════════════════════════
// Request bodies
// ═══════════════════════════════════════════════════════════

/// `POST /v1/users/:id/glucose-records/` body.
///
/// Enumerations arrive as raw codes and are range-checked in
/// `into_new_record`, so a bad code is a validation error rather than
/// an opaque deserialization failure.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGlucoseRecordRequest {
    pub device_record_id: String,
    pub time: String,
    pub zone_id: String,
    pub offset_id: String,
    pub level: f64,
    pub level_type: u8,
    pub specimen_source: u8,
    pub meal: u8,
    pub relation_to_meal: u8,
}

impl CreateGlucoseRecordRequest {
    pub fn into_new_record(self) -> Result<NewGlucoseRecord, ApiError> {
        if self.device_record_id.chars().count() < MIN_DEVICE_RECORD_ID_LEN {
            return Err(invalid(format!(
                "deviceRecordId must be at least {MIN_DEVICE_RECORD_ID_LEN} characters"
            )));
        }
        for (field, value) in [
            ("time", &self.time),
            ("zoneId", &self.zone_id),
            ("offsetId", &self.offset_id),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(format!("{field} is required")));
            }
        }
        if !self.level.is_finite() || self.level <= 0.0 {
            return Err(invalid(format!("level must be positive, got {}", self.level)));
        }

        let measurement = GlucoseMeasurement {
            time: self.time,
            zone_id: self.zone_id,
            offset_id: self.offset_id,
            level: self.level,
            level_type: GlucoseLevelType::try_from(self.level_type)
                .map_err(|e| invalid(e.to_string()))?,
            specimen_source: SpecimenSource::try_from(self.specimen_source)
                .map_err(|e| invalid(e.to_string()))?,
            meal: MealType::try_from(self.meal).map_err(|e| invalid(e.to_string()))?,
            relation_to_meal: RelationToMeal::try_from(self.relation_to_meal)
                .map_err(|e| invalid(e.to_string()))?,
        };

        Ok(NewGlucoseRecord {
            device_record_id: self.device_record_id,
            measurement,
        })
    }
}

/// `POST /v1/users/:id/glucose-records/next-changes-token` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextChangesTokenRequest {
    pub next_changes_token: String,
}

impl NextChangesTokenRequest {
    pub fn into_token(self) -> Result<String, ApiError> {
        if self.next_changes_token.chars().count() < MIN_CHANGES_TOKEN_LEN {
            return Err(invalid(format!(
                "nextChangesToken must be at least {MIN_CHANGES_TOKEN_LEN} characters"
            )));
        }
        Ok(self.next_changes_token)
    }
}

fn invalid(detail: String) -> ApiError {
    ApiError::InvalidBody(detail)
}

// ═══════════════════════════════════════════════════════════
// Response bodies
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGlucoseRecordResponse {
    pub record_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct UnsyncedRecordsResponse {
    pub records: Vec<GlucoseRecord>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
