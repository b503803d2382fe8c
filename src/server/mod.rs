//! HTTP API
//!
//! A thin axum layer over the scan pipeline, the snapshot generator, and
//! the store. Routes mirror the hosted analysis backend:
//! `POST /v1/analyze-repo`, `POST /v1/create-share`, `GET /v1/get-share`,
//! `POST /v1/generate-snapshot`, and `GET /healthz`. CORS is wide open and
//! every request is traced.

pub mod error;
pub mod handlers;

pub use error::{ApiError, ApiJson};

use crate::config::Config;
use crate::pipeline::Scanner;
use crate::snapshot::SnapshotGenerator;
use crate::store::AnalysisStore;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state behind every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub scanner: Arc<Scanner>,
    pub snapshots: Arc<SnapshotGenerator>,
    pub store: Arc<dyn AnalysisStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        scanner: Scanner,
        snapshots: SnapshotGenerator,
        store: Arc<dyn AnalysisStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            scanner: Arc::new(scanner),
            snapshots: Arc::new(snapshots),
            store,
        }
    }
}

/// Builds the API router with CORS and request tracing
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/v1/analyze-repo", post(handlers::analyze_repo))
        .route("/v1/create-share", post(handlers::create_share))
        .route("/v1/get-share", get(handlers::get_share))
        .route("/v1/generate-snapshot", post(handlers::generate_snapshot))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds and serves the API until the process stops
pub async fn serve(state: AppState, bind_addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("pindrift API listening on {}", bind_addr);
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
