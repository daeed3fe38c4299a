//! API error types with numeric-coded JSON responses.
//!
//! Every error body is `{ "code": <u16>, "message": <str> }`, with the
//! message fixed per code. Causes are logged, never echoed.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::sync::SyncError;

/// Fixed registry of client-visible error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    UnableToParseRequestBody,
    UnknownDatabaseError,
    TranslationService,
    InvalidUserId,
    CreateGlucoseRecord,
    InvalidRecordUuid,
    RecordUuidNotFound,
    GetGlucoseRecord,
    MarkSyncComplete,
    SaveNextChangesToken,
    GetUnsyncedGlucoseRecords,
    InvalidApiKey,
}

impl ErrorCode {
    pub fn code(self) -> u16 {
        match self {
            ErrorCode::UnableToParseRequestBody => 1000,
            ErrorCode::UnknownDatabaseError => 1001,
            ErrorCode::TranslationService => 1002,
            ErrorCode::InvalidUserId => 1003,
            ErrorCode::CreateGlucoseRecord => 1004,
            ErrorCode::InvalidRecordUuid => 1005,
            ErrorCode::RecordUuidNotFound => 1006,
            ErrorCode::GetGlucoseRecord => 1007,
            ErrorCode::MarkSyncComplete => 1008,
            ErrorCode::SaveNextChangesToken => 1009,
            ErrorCode::GetUnsyncedGlucoseRecords => 1010,
            ErrorCode::InvalidApiKey => 1011,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::UnableToParseRequestBody => "invalid request body",
            ErrorCode::UnknownDatabaseError => "database problems",
            ErrorCode::TranslationService => "translation service failed",
            ErrorCode::InvalidUserId => "invalid userId provided in request",
            ErrorCode::CreateGlucoseRecord => "failed to create glucose record",
            ErrorCode::InvalidRecordUuid => "invalid recordUuid provided in request",
            ErrorCode::RecordUuidNotFound => "glucose record not found",
            ErrorCode::GetGlucoseRecord => "failed to retrieve glucose record",
            ErrorCode::MarkSyncComplete => "failed to mark sync completion",
            ErrorCode::SaveNextChangesToken => "failed to save next changes token",
            ErrorCode::GetUnsyncedGlucoseRecords => "failed to retrieve unsynced glucose data",
            ErrorCode::InvalidApiKey => "invalid or missing api key",
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: &'static str,
}

impl From<ErrorCode> for ErrorBody {
    fn from(code: ErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.message(),
        }
    }
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
    #[error("Invalid user id")]
    InvalidUserId,
    #[error("Invalid record uuid: {0}")]
    InvalidRecordUuid(String),
    #[error("Invalid or missing API key")]
    Unauthorized,
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            ApiError::InvalidBody(_) => {
                (StatusCode::BAD_REQUEST, ErrorCode::UnableToParseRequestBody)
            }
            ApiError::InvalidUserId => (StatusCode::BAD_REQUEST, ErrorCode::InvalidUserId),
            ApiError::InvalidRecordUuid(_) => {
                (StatusCode::BAD_REQUEST, ErrorCode::InvalidRecordUuid)
            }
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, ErrorCode::InvalidApiKey),
            ApiError::Sync(e) => match e {
                SyncError::RecordCreateFailed(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::CreateGlucoseRecord,
                ),
                SyncError::RecordNotFound => {
                    (StatusCode::NOT_FOUND, ErrorCode::RecordUuidNotFound)
                }
                SyncError::RecordFetchFailed(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::GetGlucoseRecord)
                }
                SyncError::DeltaFetchFailed(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::GetUnsyncedGlucoseRecords,
                ),
                SyncError::MarkSyncFailed(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::MarkSyncComplete)
                }
                SyncError::SaveTokenFailed(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::SaveNextChangesToken,
                ),
            },
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::UnknownDatabaseError,
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            let cause = std::error::Error::source(&self)
                .map(|e| e.to_string())
                .unwrap_or_default();
            tracing::error!(code = code.code(), error = %self, cause = %cause, "API request failed");
        } else {
            tracing::debug!(code = code.code(), error = %self, "API request rejected");
        }

        (status, Json(ErrorBody::from(code))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}
