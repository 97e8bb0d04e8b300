//! Domain layer - Rules of the split pipeline.

pub mod archive;
pub mod scope;
pub mod segments;
pub mod upload;

pub use scope::Scope;
pub use segments::Segment;
pub use upload::UploadRequest;
