//! Liveness endpoint.

use axum::Json;

use crate::api::types::HealthResponse;

/// `GET /healthz`: unauthenticated liveness check for load balancers.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
    })
}
