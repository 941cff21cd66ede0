//! Feed file routes
//!
//! Feed files live in a flat data directory; names are restricted to a
//! single path component so an upload or a processing request can never
//! reach outside it.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::info;

use super::{valid_feed_name, AppState};
use crate::error::{AppError, AppResult};

/// List feed files available for processing
///
/// GET /files
pub async fn list_files(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(&state.data_dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("xml") {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            files.push(name.to_string());
        }
    }
    files.sort();

    Ok(Json(json!({ "files": files })))
}

/// Upload a feed file into the data directory
///
/// POST /upload (multipart, field `file`)
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<Value>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("Upload is missing a filename".to_string()))?;
        if !valid_feed_name(&filename) {
            return Err(AppError::BadRequest(format!(
                "Invalid feed filename '{filename}'"
            )));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;

        tokio::fs::create_dir_all(&state.data_dir).await?;
        let target = state.data_dir.join(&filename);
        tokio::fs::write(&target, &bytes).await?;

        info!(filename = %filename, size = bytes.len(), "Stored uploaded feed");
        return Ok((
            StatusCode::CREATED,
            Json(json!({
                "filename": filename,
                "size": bytes.len(),
            })),
        ));
    }

    Err(AppError::BadRequest(
        "Multipart body has no 'file' field".to_string(),
    ))
}
