//! Ports - Trait definitions for external collaborators.

pub mod segmenter;

pub use segmenter::Segmenter;
