//! HTTP inbound adapter.
//!
//! Routes:
//! - `GET /` listing of the caller's workspace
//! - `POST /split` multipart `video` + `duration`
//! - `POST /clear` empties the caller's workspace
//! - `GET /output/:filename` download one output file
//! - `GET /health` liveness

pub mod intake;
pub mod pages;
pub mod routes;
pub mod session;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::workspace::WorkspaceManager;
use crate::application::SplitService;
use crate::config::SplitterConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SplitterConfig>,
    pub workspaces: WorkspaceManager,
    pub splitter: Arc<SplitService>,
}

impl AppState {
    pub fn new(config: SplitterConfig, splitter: SplitService) -> Self {
        let workspaces = WorkspaceManager::new(&config);
        Self {
            config: Arc::new(config),
            workspaces,
            splitter: Arc::new(splitter),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;
    let request_timeout = state.config.request_timeout;

    Router::new()
        .route("/", get(routes::index::handle))
        .route("/split", post(routes::split::handle))
        .route("/clear", post(routes::clear::handle))
        .route("/output/:filename", get(routes::download::handle))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::resolve_scope,
        ))
        .route("/health", get(routes::health::handle))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        // same status as a segmenter timeout
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
