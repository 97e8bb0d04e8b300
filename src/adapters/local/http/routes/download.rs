use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    Extension,
};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use super::super::AppState;
use crate::domain::Scope;
use crate::error::{Result, SplitError};

/// GET /output/:filename
pub async fn handle(
    State(state): State<AppState>,
    Extension(scope): Extension<Scope>,
    Path(filename): Path<String>,
) -> Result<Response> {
    let path = state.splitter.resolve_download(scope, &filename).await?;

    let file = File::open(&path)
        .await
        .map_err(|_| SplitError::NotFound(filename.clone()))?;
    let length = file.metadata().await?.len();

    let content_type = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .to_string();
    let fallback_name = filename.replace(['"', '\\'], "_");
    let encoded_name = urlencoding::encode(&filename);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, length)
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"; filename*=UTF-8''{}",
                fallback_name, encoded_name
            ),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| {
            SplitError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to build response: {}", e),
            ))
        })?;

    Ok(response)
}
