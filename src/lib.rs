// starmap server
//
// Groups a GitHub user's starred repositories into categories:
// - Axum HTTP server (HTTP/1.1, HTTP/2)
// - Paginated GitHub collection with TTL caching
// - Concurrent batch categorization with primary/fallback models
// - Structured logging with tracing
// - Graceful shutdown

use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use starmap_config::RuntimeConfig;
use starmap_handlers::{ErrorEnvelope, Outcome, Pipeline, StarmapError};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

mod handlers;
mod init;

use handlers::{get_categories, health_check, ready_check};
pub use init::{init_pipeline, init_tracing};

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }
}

/// Error type that implements IntoResponse
pub(crate) struct AppError {
    status: StatusCode,
    error: StarmapError,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(error = %self.error, kind = self.error.error_type(), "Request failed");
        } else {
            warn!(error = %self.error, kind = self.error.error_type(), "Request rejected");
        }
        (self.status, Json(ErrorEnvelope::from(&self.error))).into_response()
    }
}

impl From<StarmapError> for AppError {
    fn from(error: StarmapError) -> Self {
        let status = StatusCode::from_u16(error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self { status, error }
    }
}

/// Routes served by the HTTP server
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/categories/:subject", get(get_categories))
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}

/// Entry point for server mode (loads config automatically)
pub async fn run() -> Result<()> {
    let config = RuntimeConfig::load().context("Failed to load configuration")?;
    init_tracing(&config);
    config.validate()?;
    run_with_config(config).await
}

/// Entry point for server mode with pre-loaded configuration (for CLI usage)
pub async fn run_with_config(config: RuntimeConfig) -> Result<()> {
    init_tracing(&config);

    let addr = config.server.listen_addr.clone();
    let pipeline = init_pipeline(&config)?;
    let app = router(AppState::new(pipeline));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind to {}", addr))?;

    info!("starmap listening on http://{}", addr);
    info!("Routes:");
    info!("  GET  http://{}/v1/categories/{{user}} - Categorize starred repositories", addr);
    info!("  GET  http://{}/health                 - Health check", addr);
    info!("  GET  http://{}/ready                  - Readiness check", addr);
    info!("Press Ctrl+C or send SIGTERM to stop");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");

    Ok(())
}

/// Run the pipeline once for `subject` (CLI `categorize` command)
pub async fn categorize_once(config: &RuntimeConfig, subject: &str) -> Result<Outcome> {
    let pipeline = init_pipeline(config)?;
    pipeline
        .categorize(subject)
        .await
        .with_context(|| format!("Failed to categorize starred repositories of '{}'", subject))
}
