use axum::{extract::State, response::Html, Extension};

use super::super::{pages, AppState};
use crate::domain::Scope;
use crate::error::Result;

/// GET /
pub async fn handle(
    State(state): State<AppState>,
    Extension(scope): Extension<Scope>,
) -> Result<Html<String>> {
    let files = state.splitter.list(scope).await?;
    Ok(Html(pages::index(&files)))
}
