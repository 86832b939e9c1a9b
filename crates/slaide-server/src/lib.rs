//! slaide HTTP server.
//!
//! Serves generated artifacts and proxies prompts to the Host agent.
//! Endpoints: /health, /health/live, /health/ready, /api/artifact,
//! /api/generate, /api/auth/discord/callback

mod error;
mod handlers;
mod routes;
mod state;

use slaide_config::SlaideConfig;
use slaide_core::HostError;

pub use error::{ApiError, ErrorResponse};
pub use routes::{build_router, build_router_with};
pub use state::AppState;

/// Errors starting the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to build Host client: {0}")]
    Host(#[from] HostError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the server described by `config`, with graceful shutdown on SIGTERM/SIGINT.
pub async fn serve(config: SlaideConfig) -> Result<(), ServerError> {
    if !is_loopback_host(&config.server.bind) {
        tracing::warn!(
            bind = %config.server.bind,
            "listening on a non-local address; /api/artifact serves any readable file"
        );
    }

    let state = AppState::from_config(&config)?;
    let app = build_router_with(state, &config.server);

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(host = %config.host.url, "slaide listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("slaide shut down gracefully");
    Ok(())
}

fn is_loopback_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.parse::<std::net::IpAddr>()
        .map(|ip| ip.is_loopback())
        .unwrap_or(false)
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { tracing::info!("Received SIGINT, shutting down..."); }
        _ = terminate => { tracing::info!("Received SIGTERM, shutting down..."); }
    }
}
