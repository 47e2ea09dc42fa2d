use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use tracing::{error, info};

use super::app_state::AppState;

/// File extensions accepted for upload. Anything else is rejected before a
/// byte is written.
const ALLOWED_EXTENSIONS: &[&str] = &["txt", "pdf", "png", "jpg", "jpeg", "gif"];

#[derive(Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub url: String,
}

/// POST /api/upload - store a multipart "file" field in the upload
/// directory under its sanitized name. The request body is size-limited by
/// the router layer before this handler runs.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        };

        if field.name() != Some("file") {
            continue;
        }

        let filename = match field.file_name().map(sanitize_filename) {
            Some(name) if !name.is_empty() => name,
            _ => return (StatusCode::BAD_REQUEST, "No file selected").into_response(),
        };

        if !allowed_file(&filename) {
            return (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                format!("Allowed file types are {}", ALLOWED_EXTENSIONS.join(", ")),
            )
                .into_response();
        }

        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        };

        let path = state.upload_dir.join(&filename);
        if let Err(e) = tokio::fs::write(&path, &data).await {
            error!(error = %e, path = %path.display(), "failed to store upload");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Upload failed").into_response();
        }

        info!(%filename, size = data.len(), "file uploaded");
        let url = format!("/uploads/{}", filename);
        return (StatusCode::CREATED, Json(UploadResponse { filename, url })).into_response();
    }

    (StatusCode::BAD_REQUEST, "No file part").into_response()
}

/// Whether the filename carries an allowed extension (case-insensitive).
fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(stem, ext)| {
            !stem.is_empty() && ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        })
        .unwrap_or(false)
}

/// Reduce a client-supplied filename to a safe basename: path components are
/// dropped, leading dots stripped, and anything outside [A-Za-z0-9._-]
/// replaced with an underscore.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}
