use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;

use crate::ports::Segmenter;

/// Segments with the `ffmpeg` segment muxer, stream-copying every stream.
#[derive(Clone, Debug)]
pub struct FfmpegSegmenter {
    binary: PathBuf,
}

impl FfmpegSegmenter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

/// The only invocation shape used: overwrite, one input, copy all streams,
/// segment muxer with timestamps reset per part.
pub fn segment_args(source: &Path, output_pattern: &Path, segment_secs: u32) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(14);
    args.push("-y".into());
    args.push("-i".into());
    args.push(source.as_os_str().to_owned());
    for arg in [
        "-c",
        "copy",
        "-map",
        "0",
        "-f",
        "segment",
        "-segment_time",
    ] {
        args.push(arg.into());
    }
    args.push(segment_secs.to_string().into());
    args.push("-reset_timestamps".into());
    args.push("1".into());
    args.push(output_pattern.as_os_str().to_owned());
    args
}

#[async_trait]
impl Segmenter for FfmpegSegmenter {
    async fn segment(
        &self,
        source: &Path,
        output_pattern: &Path,
        segment_secs: u32,
    ) -> io::Result<Output> {
        Command::new(&self.binary)
            .args(segment_args(source, output_pattern, segment_secs))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
    }
}
