//! HTTP API for device sync.
//!
//! Exposes the `SyncCoordinator` as JSON endpoints. Record routes are
//! nested under `/v1/` and protected by the API key middleware.
//!
//! The router is composable: `glucose_sync_router()` returns a `Router`
//! that can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use error::{ApiError, ErrorCode};
pub use router::glucose_sync_router;
pub use server::{serve, start_server_on, ServerError, ServerHandle};
pub use types::ApiContext;
