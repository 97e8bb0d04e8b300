//! Splitter binary - wires the local adapters and serves HTTP.

use splitter::adapters::local::{FfmpegSegmenter, WorkspaceManager};
use splitter::application::SplitService;
use splitter::{router, AppState, SplitterConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = SplitterConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 1. Workspaces: leftovers from a previous run are never served
    let workspaces = WorkspaceManager::new(&config);
    if let Err(e) = workspaces.startup_sweep().await {
        for failure in &e.failures {
            tracing::error!("Startup sweep could not remove {}", failure);
        }
    }
    if let Err(e) = workspaces.ensure_roots().await {
        tracing::error!("Failed to create workspace roots: {}", e);
        std::process::exit(1);
    }

    // 2. Application service
    let segmenter = Arc::new(FfmpegSegmenter::new(config.ffmpeg_bin.clone()));
    let splitter = SplitService::new(&config, workspaces, segmenter);

    tracing::info!(
        "Segments of {:?} via {:?}, timeout {:?}, {} concurrent jobs, sessions {}",
        config.segment_extension,
        config.ffmpeg_bin,
        config.segment_timeout,
        config.max_concurrent_jobs,
        if config.session_scoped { "on" } else { "off" }
    );

    // 3. HTTP
    let address = config.bind_address();
    let app = router(AppState::new(config, splitter));

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .expect("Failed to bind TCP listener");
    tracing::info!("Listening at {}", address);
    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
