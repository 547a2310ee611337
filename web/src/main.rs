//! Removal desk server.
//!
//! Reads configuration from the environment (and `.env` when present),
//! selects the storage backend, and serves the JSON API until Ctrl+C or
//! SIGTERM.

use anyhow::Context;
use removal_desk_core::SystemClock;
use removal_desk_web::{AppState, Config, build_router, build_store, telemetry};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal in production.
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    telemetry::init_tracing(&config.server.log_level);
    config.validate()?;

    info!(
        backend = %config.storage.backend,
        address = %config.server.bind_address(),
        "Starting removal desk"
    );

    let store = build_store(&config, Arc::new(SystemClock)).await?;
    let app = build_router(AppState::new(store), &config.server.cors_allowed_origins);

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!(%address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
