use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use std::sync::Arc;
use tracing::{error, info};

use crate::app::AppState;
use crate::parser::decode_text;

const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Document upload routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/upload", post(upload_document))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// POST /api/upload - Chunk, embed and store a blank-line-delimited text file.
async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<&'static str, (StatusCode, &'static str)> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!("Error parsing form: {e}");
        (StatusCode::BAD_REQUEST, "Error parsing form")
    })? {
        if field.name() != Some("file") {
            continue;
        }
        filename = field.file_name().map(|s| s.to_string());
        file_bytes = Some(
            field
                .bytes()
                .await
                .map_err(|e| {
                    error!("Error reading uploaded file: {e}");
                    (StatusCode::BAD_REQUEST, "Error parsing form")
                })?
                .to_vec(),
        );
    }

    let file_data = file_bytes.ok_or((StatusCode::BAD_REQUEST, "No file uploaded"))?;
    let text = decode_text(&file_data);
    info!(
        "Ingesting {} ({} bytes)",
        filename.as_deref().unwrap_or("upload"),
        file_data.len()
    );

    match state.ingestor.ingest_text(&text).await {
        Ok(count) => {
            info!("Ingested {count} chunks");
            Ok("File uploaded successfully")
        }
        Err(e) => {
            error!("Error uploading file after {} stored chunks: {e}", e.written());
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Error uploading file"))
        }
    }
}
