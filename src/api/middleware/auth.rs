//! Shared-secret authentication middleware.
//!
//! Compares `X-API-Key` against the configured key in constant time.
//! Absent or mismatched keys are rejected before any handler runs.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::config::API_KEY_HEADER;

/// Require the service API key.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn require_api_key(req: Request<axum::body::Body>, next: Next) -> Response {
    match check_api_key(&req) {
        Ok(()) => next.run(req).await,
        Err(err) => {
            tracing::warn!(path = %req.uri().path(), "Rejected request: invalid or missing API key");
            err.into_response()
        }
    }
}

fn check_api_key(req: &Request<axum::body::Body>) -> Result<(), ApiError> {
    let ctx = req
        .extensions()
        .get::<ApiContext>()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let presented = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    if bool::from(presented.as_bytes().ct_eq(ctx.api_key.as_bytes())) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}
