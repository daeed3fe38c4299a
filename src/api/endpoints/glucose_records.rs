//! Glucose record endpoints.
//!
//! - `POST /v1/users/:user_id/glucose-records/`: upload one record
//! - `GET  /v1/users/:user_id/glucose-records/unsynced`: delta since last sync
//! - `GET  /v1/users/:user_id/glucose-records/:record_uuid`: one record
//! - `POST /v1/users/:user_id/glucose-records/sync-complete`: acknowledge a sync
//! - `POST /v1/users/:user_id/glucose-records/next-changes-token`: store upstream token

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{
    parse_record_uuid, parse_user_id, ApiContext, CreateGlucoseRecordRequest,
    CreateGlucoseRecordResponse, NextChangesTokenRequest, UnsyncedRecordsResponse,
};
use crate::models::GlucoseRecord;

pub async fn create(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
    payload: Result<Json<CreateGlucoseRecordRequest>, JsonRejection>,
) -> Result<Json<CreateGlucoseRecordResponse>, ApiError> {
    let user_id = parse_user_id(user_id)?;
    let Json(body) = payload?;
    let record = body.into_new_record()?;

    let record_id = ctx
        .run(move |sync| sync.create_record(&user_id, &record))
        .await?;

    Ok(Json(CreateGlucoseRecordResponse { record_id }))
}

pub async fn unsynced(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
) -> Result<Json<UnsyncedRecordsResponse>, ApiError> {
    let user_id = parse_user_id(user_id)?;

    let records = ctx
        .run(move |sync| sync.get_records_since_last_sync(&user_id))
        .await?;

    Ok(Json(UnsyncedRecordsResponse { records }))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path((user_id, record_uuid)): Path<(String, String)>,
) -> Result<Json<GlucoseRecord>, ApiError> {
    let user_id = parse_user_id(user_id)?;
    let record_uuid = parse_record_uuid(&record_uuid)?;

    let record = ctx
        .run(move |sync| sync.get_record(&user_id, &record_uuid))
        .await?;

    Ok(Json(record))
}

pub async fn sync_complete(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user_id = parse_user_id(user_id)?;

    ctx.run(move |sync| sync.mark_sync_complete(&user_id)).await?;

    Ok(StatusCode::OK)
}

pub async fn next_changes_token(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
    payload: Result<Json<NextChangesTokenRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let user_id = parse_user_id(user_id)?;
    let Json(body) = payload?;
    let token = body.into_token()?;

    ctx.run(move |sync| sync.save_next_changes_token(&user_id, &token))
        .await?;

    Ok(StatusCode::OK)
}
