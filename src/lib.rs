pub mod api; // HTTP façade
pub mod config;
pub mod db;
pub mod models;
pub mod sync; // Sync Coordinator

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::ServiceConfig;
use crate::db::DatabaseError;
use crate::sync::SyncCoordinator;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("database unavailable: {0}")]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Server(#[from] api::ServerError),

    #[error("startup task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Initialize tracing. `RUST_LOG` wins over the configured default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Open the database (with startup retries) and serve until shutdown.
pub async fn run(config: ServiceConfig) -> Result<(), StartupError> {
    tracing::info!(
        version = config::APP_VERSION,
        db = %config.db_path.display(),
        "Starting {}",
        config::APP_NAME
    );

    let db_path = config.db_path.clone();
    let busy_timeout = config.busy_timeout;
    let attempts = config.connect_attempts;
    let retry = config.connect_retry;
    let database = tokio::task::spawn_blocking(move || {
        db::open_database_with_retry(&db_path, busy_timeout, attempts, retry)
    })
    .await??;

    let app = api::glucose_sync_router(SyncCoordinator::new(database), config.api_key.as_str());
    api::serve(config.bind_addr, app).await?;
    Ok(())
}
