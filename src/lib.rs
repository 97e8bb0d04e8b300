//! Splitter - Cuts uploaded videos into fixed-duration parts.
//!
//! Hexagonal Architecture:
//! - domain/: Pipeline rules (upload naming, segmentation, packaging, scopes)
//! - ports/: Trait definitions
//! - adapters/: Concrete implementations (filesystem, ffmpeg, HTTP)
//! - application/: The split service composing them
//! - config: Environment configuration
//!
//! A request runs clear → stage → segment → package → list against one
//! workspace, chosen by a [`domain::Scope`] resolved from the session cookie.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

pub use adapters::local::http::{router, AppState};
pub use config::SplitterConfig;
pub use error::SplitError;
