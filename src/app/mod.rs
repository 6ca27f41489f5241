pub mod config;
pub mod router;
pub mod server;
pub mod state;
pub mod tracing;

use crate::error::AppError;
use crate::sender::Dispatcher;
use config::{Config, ConfigError};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Application entry point. Loads configuration, initializes tracing, serves
/// ingestion until shutdown and then drains the dispatcher.
pub async fn run() -> Result<(), AppError> {
    let config = match Config::load() {
        Ok(config) => config,
        // --help / --version / usage errors print themselves
        Err(ConfigError::Cli(e)) => e.exit(),
        Err(e) => return Err(e.into()),
    };

    tracing::init_tracing(config.effective_log_level(), config.log_format)?;
    ::tracing::info!(
        version = crate::VERSION,
        http_port = config.http_port,
        es_host = %config.es_host,
        flush_interval_secs = config.flush_interval_seconds,
        "Loaded settings"
    );

    let dispatcher = Arc::new(Dispatcher::new(config.dispatcher_config())?);
    let app_state = state::AppState::new(Arc::clone(&dispatcher), config.cors_policy())
        .with_max_body_bytes(config.max_body_bytes);
    let app = router::main_router(app_state);

    let served = server::serve(app, config.http_port, CancellationToken::new()).await;

    // Drain even when the server failed to bind
    dispatcher.stop().await?;
    served
}
