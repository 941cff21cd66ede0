// HTTP API Module
//
// Route handlers for the feed service:
// - feeds: list and upload feed files in the data directory
// - jobs: start an ingestion job and poll its progress
// - skus: read a persisted SKU with its similar records expanded

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use sqlx::PgPool;

pub mod feeds;
pub mod jobs;
pub mod skus;

#[cfg(test)]
mod routes_test;

use crate::db::SkuStore;
use crate::ingest::{IngestPipeline, ProgressRegistry};

/// Maximum accepted upload size (256 MiB).
const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub store: SkuStore,
    pub pipeline: Arc<IngestPipeline>,
    pub progress: Arc<ProgressRegistry>,
    pub data_dir: PathBuf,
}

/// Create the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/files", get(feeds::list_files))
        .route("/upload", post(feeds::upload_file))
        .route("/process", post(jobs::start_processing))
        .route("/progress/:job_id", get(jobs::get_progress))
        .route("/sku/:uuid", get(skus::get_sku))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Health check handler
///
/// GET /health
async fn health_check(State(state): State<AppState>) -> Result<Response, StatusCode> {
    match sqlx::query("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected"
            })),
        )
            .into_response()),
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        },
    }
}

/// Reject names that could escape the data directory.
pub(crate) fn valid_feed_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
        && !name.starts_with('.')
}
