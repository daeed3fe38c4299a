use std::process::ExitCode;

use glucose_sync::config::ServiceConfig;

#[tokio::main]
async fn main() -> ExitCode {
    glucose_sync::init_tracing();

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match glucose_sync::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{} exited: {e}", glucose_sync::config::APP_NAME);
            ExitCode::FAILURE
        }
    }
}
