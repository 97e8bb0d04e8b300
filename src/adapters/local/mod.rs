//! Local adapters: filesystem workspaces, the ffmpeg subprocess and HTTP.

pub mod ffmpeg;
pub mod fs;
pub mod http;
pub mod workspace;

pub use ffmpeg::FfmpegSegmenter;
pub use workspace::{Workspace, WorkspaceManager};
