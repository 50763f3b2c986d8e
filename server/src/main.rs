mod app;
mod cache;
mod config;
mod fetch;
mod last_known;
mod probe;
mod resolver;
mod routes;
mod state;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::config::StatusConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = StatusConfig::from_env();
    if config.server_address.is_empty() {
        tracing::warn!("MC_ADDRESS is not set; status endpoints will report not_configured");
    } else {
        tracing::info!(
            address = %config.server_address,
            port = config.server_port,
            cache_seconds = config.cache_seconds,
            "Watching Minecraft server"
        );
    }

    let state = AppState::new(config).await;
    let app = app::build_app(state);

    let addr = format!("0.0.0.0:{}", config::http_port());
    tracing::info!("Beaconstat server listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind TCP listener");
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server failed");
    }

    tracing::info!("Server shut down gracefully");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
