//! HTTP surface
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | POST | `/generate-schema` | [`routes::generate_schema`] |
//! | GET, POST | `/history` | [`routes::list_history`], [`routes::create_history`] |
//! | GET | `/history/stats` | [`routes::history_stats`] |
//! | GET, DELETE | `/history/:id` | [`routes::get_history`], [`routes::delete_history`] |
//! | GET | `/blobs/*path` | [`routes::get_blob`] |
//! | GET | `/health` | [`routes::health`] |

pub mod error;
pub mod routes;

pub use error::ApiError;

use crate::config::{Config, HistoryConfig};
use crate::error::{FormcraftError, Result};
use crate::gateway::SchemaGateway;
use crate::history::{BlobStore, FsBlobStore, RemoteHistoryStore};
use crate::orchestrator::GenerationOrchestrator;
use crate::providers::create_provider;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// Shared state of all handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<GenerationOrchestrator>,
    pub remote: Arc<RemoteHistoryStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub history: HistoryConfig,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Assemble the state from configuration
    ///
    /// Opens the remote history database and the blob directory under the
    /// configured data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be resolved or the
    /// database cannot be opened
    pub fn from_config(config: &Config) -> Result<Self> {
        let data_dir = config.storage.resolve_data_dir()?;
        std::fs::create_dir_all(&data_dir).map_err(|e| {
            FormcraftError::Storage(format!(
                "Failed to create data directory {}: {}",
                data_dir.display(),
                e
            ))
        })?;

        let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(
            config.storage.blob_dir()?,
            config.server.public_base_url.clone(),
        ));
        let remote = Arc::new(RemoteHistoryStore::open(
            config.storage.remote_db_path()?,
            blobs.clone(),
        )?);
        let gateway = Arc::new(SchemaGateway::new(create_provider(&config.provider)?));
        let orchestrator = GenerationOrchestrator::new(gateway).with_remote(remote.clone());

        tracing::info!(
            "Using data directory {} ({} history records)",
            data_dir.display(),
            remote.len()
        );

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            remote,
            blobs,
            history: config.history.clone(),
            max_upload_bytes: config.server.max_upload_bytes,
        })
    }
}

/// Build the router over `state`
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/generate-schema", post(routes::generate_schema))
        .route(
            "/history",
            get(routes::list_history).post(routes::create_history),
        )
        .route("/history/stats", get(routes::history_stats))
        .route(
            "/history/:id",
            get(routes::get_history).delete(routes::delete_history),
        )
        .route("/blobs/*path", get(routes::get_blob))
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Run the server until Ctrl-C
///
/// # Errors
///
/// Returns an error if the state cannot be built or the address cannot be
/// bound
pub async fn serve(config: &Config) -> Result<()> {
    crate::metrics::init_metrics_exporter();
    let state = AppState::from_config(config)?;
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .map_err(|e| {
            FormcraftError::Config(format!("Failed to bind {}: {}", config.server.bind, e))
        })?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
