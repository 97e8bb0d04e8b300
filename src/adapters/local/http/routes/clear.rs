use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;

use super::super::AppState;
use crate::domain::Scope;
use crate::error::SplitError;

#[derive(Debug, Serialize)]
pub struct ClearResult {
    pub success: bool,
    pub message: String,
    pub removed: usize,
}

/// POST /clear
pub async fn handle(
    State(state): State<AppState>,
    Extension(scope): Extension<Scope>,
) -> Response {
    match state.splitter.clear(scope).await {
        Ok(report) => Json(ClearResult {
            success: true,
            message: "All files cleared".to_string(),
            removed: report.removed,
        })
        .into_response(),
        Err(e) => {
            let status = e.status();
            let message = e.public_message();
            if let SplitError::Cleanup(cleanup) = &e {
                for failure in &cleanup.failures {
                    tracing::error!("Clear failed on {}", failure);
                }
            } else {
                tracing::error!("Clear failed: {}", e);
            }
            (
                status,
                Json(ClearResult {
                    success: false,
                    message,
                    removed: 0,
                }),
            )
                .into_response()
        }
    }
}
