use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::process::Output;

/// Runs the external tool that cuts a source into fixed-duration parts.
///
/// Implementations must not touch anything but `source` and the directory
/// of `output_pattern`, and must stop the child process when the returned
/// future is dropped: the pipeline enforces its timeout by dropping it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Segmenter: Send + Sync {
    async fn segment(
        &self,
        source: &Path,
        output_pattern: &Path,
        segment_secs: u32,
    ) -> io::Result<Output>;
}
