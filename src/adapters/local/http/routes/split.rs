use axum::{
    extract::{Multipart, State},
    response::Html,
    Extension,
};

use super::super::{intake, pages, AppState};
use crate::domain::Scope;
use crate::error::Result;

/// POST /split
pub async fn handle(
    State(state): State<AppState>,
    Extension(scope): Extension<Scope>,
    multipart: Multipart,
) -> Result<Html<String>> {
    let upload = intake::read_upload(&state, multipart).await?;
    let outcome = state.splitter.run(scope, upload).await?;

    tracing::info!(
        "{} parts and {:?} ready for {}",
        outcome.segments.len(),
        outcome.archive.file_name().unwrap_or_default(),
        scope
    );
    Ok(Html(pages::index(&outcome.files)))
}
