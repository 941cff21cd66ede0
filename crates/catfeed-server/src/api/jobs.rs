//! Ingestion job routes
//!
//! Starting a job is asynchronous: the handler admits the job, hands the
//! feed file to the pipeline, and returns the job id for polling. At most
//! one job runs at a time; a second request is rejected with 409 while the
//! first is active.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{valid_feed_name, AppState};
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct ProcessQuery {
    pub filename: String,
}

/// Start processing a feed file
///
/// POST /process?filename=catalog.xml
pub async fn start_processing(
    State(state): State<AppState>,
    Query(query): Query<ProcessQuery>,
) -> AppResult<(StatusCode, Json<Value>)> {
    if !valid_feed_name(&query.filename) {
        return Err(AppError::BadRequest(format!(
            "Invalid feed filename '{}'",
            query.filename
        )));
    }

    let path = state.data_dir.join(&query.filename);
    if !tokio::fs::try_exists(&path).await? {
        return Err(AppError::NotFound(format!(
            "Feed file '{}' not found",
            query.filename
        )));
    }

    let job_id = state.pipeline.start_job(path)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "Processing started",
            "job_id": job_id,
        })),
    ))
}

/// Poll progress for a job
///
/// GET /progress/:job_id
///
/// `processing_progress` is -1 once the job has failed; both counters reach
/// 100 on success.
pub async fn get_progress(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let progress = state
        .progress
        .get(job_id)
        .ok_or_else(|| AppError::NotFound(format!("Unknown job id {job_id}")))?;

    Ok(Json(json!({
        "job_id": job_id,
        "processing_progress": progress.ingest_pct,
        "update_similar_progress": progress.enrich_pct,
    })))
}
