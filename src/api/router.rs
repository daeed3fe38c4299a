//! API router.
//!
//! Returns a composable `Router`. Record routes are nested under `/v1/`
//! and require the API key; `/healthz` is open.
//!
//! Middleware stack (outermost → innermost):
//! 1. Cache-Control header → 2. Access log → 3. API key check (`/v1` only)

use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::sync::SyncCoordinator;

/// Build the service router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer
/// of the protected group). Endpoint handlers use `State<ApiContext>`.
pub fn glucose_sync_router(coordinator: SyncCoordinator, api_key: impl Into<Arc<str>>) -> Router {
    build_router(ApiContext::new(coordinator, api_key))
}

fn build_router(ctx: ApiContext) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route(
            "/users/:user_id/glucose-records",
            post(endpoints::glucose_records::create),
        )
        .route(
            "/users/:user_id/glucose-records/",
            post(endpoints::glucose_records::create),
        )
        .route(
            "/users/:user_id/glucose-records/unsynced",
            get(endpoints::glucose_records::unsynced),
        )
        .route(
            "/users/:user_id/glucose-records/sync-complete",
            post(endpoints::glucose_records::sync_complete),
        )
        .route(
            "/users/:user_id/glucose-records/next-changes-token",
            post(endpoints::glucose_records::next_changes_token),
        )
        .route(
            "/users/:user_id/glucose-records/:record_uuid",
            get(endpoints::glucose_records::detail),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_api_key))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx));

    Router::new()
        .route("/healthz", get(endpoints::health::check))
        .nest("/v1", protected)
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
}
