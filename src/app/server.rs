use crate::error::AppError;
use axum::Router;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Serve the ingestion router until SIGINT/SIGTERM or until `shutdown_token`
/// is cancelled. In-flight requests finish before this returns.
pub async fn serve(
    app: Router,
    http_port: u16,
    shutdown_token: CancellationToken,
) -> Result<(), AppError> {
    let bind_addr = format!("0.0.0.0:{http_port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| AppError::Bind {
            address: bind_addr.clone(),
            source: e,
        })?;
    info!("Server listening on {}", listener.local_addr()?);
    info!("  - GET     /v1/health  (health check)");
    info!("  - POST    /ingest/v1  (bulk NDJSON ingestion)");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                () = shutdown_signal() => shutdown_token.cancel(),
                () = shutdown_token.cancelled() => info!("Shutdown requested"),
            }
        })
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C) for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, initiating graceful shutdown"),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
