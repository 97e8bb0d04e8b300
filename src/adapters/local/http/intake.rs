use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use std::io;

use super::AppState;
use crate::adapters::local::fs::stream_to_file;
use crate::application::PendingUpload;
use crate::domain::UploadRequest;
use crate::error::{Result, SplitError};

pub const VIDEO_FIELD: &str = "video";
pub const DURATION_FIELD: &str = "duration";

/// Reads the multipart body into a [`PendingUpload`].
///
/// The file is spooled into the incoming area before the duration is known.
/// It lives in a `TempPath`, so every early return below deletes it and an
/// invalid request leaves nothing on disk.
pub async fn read_upload(state: &AppState, mut multipart: Multipart) -> Result<PendingUpload> {
    let limit = state.config.max_upload_bytes;
    let mut spooled = None;
    let mut file_name: Option<String> = None;
    let mut duration: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            VIDEO_FIELD => {
                if spooled.is_some() {
                    return Err(SplitError::Validation(
                        "Only one video file may be uploaded".to_string(),
                    ));
                }
                let name = field.file_name().unwrap_or("").to_string();
                if name.trim().is_empty() {
                    return Err(SplitError::Validation(
                        "No video file selected".to_string(),
                    ));
                }

                state.workspaces.ensure_roots().await?;
                let temp = tempfile::Builder::new()
                    .prefix("upload-")
                    .tempfile_in(state.workspaces.incoming_dir())?
                    .into_temp_path();
                let bytes = stream_to_file(&temp, field, state.config.upload_chunk_bytes)
                    .await
                    .map_err(|e| spool_error(e, limit))?;

                tracing::debug!("Spooled {:?} ({} bytes) to {:?}", name, bytes, temp);
                file_name = Some(name);
                spooled = Some((temp, bytes));
            }
            DURATION_FIELD => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, limit))?;
                duration = Some(text);
            }
            _ => {}
        }
    }

    let request = UploadRequest::new(file_name.as_deref(), duration.as_deref())?;
    let (file, bytes) = spooled.ok_or_else(|| {
        SplitError::Validation("No video file uploaded".to_string())
    })?;

    Ok(PendingUpload {
        request,
        file,
        bytes,
    })
}

fn multipart_error(err: MultipartError, limit: usize) -> SplitError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        SplitError::PayloadTooLarge(limit)
    } else {
        SplitError::Validation(format!("Malformed upload: {}", err.body_text()))
    }
}

/// Spooling errors are either a failing body stream or local IO.
fn spool_error(err: io::Error, limit: usize) -> SplitError {
    let body_error = err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<MultipartError>());
    match body_error {
        Some(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => SplitError::PayloadTooLarge(limit),
        Some(e) => SplitError::Validation(format!("Malformed upload: {}", e.body_text())),
        None => SplitError::Io(err),
    }
}
