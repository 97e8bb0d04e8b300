use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::error::{Result, SplitError};
use crate::ports::Segmenter;

pub const SEGMENT_PREFIX: &str = "part_";

/// One part produced by the segmenter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub index: u32,
    pub path: PathBuf,
    pub size: u64,
}

impl Segment {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Output pattern handed to the segmenter: `part_%03d.<ext>`.
pub fn segment_pattern(output_dir: &Path, extension: &str) -> PathBuf {
    output_dir.join(format!("{}%03d.{}", SEGMENT_PREFIX, extension))
}

fn segment_name_regex(extension: &str) -> Option<Regex> {
    Regex::new(&format!(
        r"^{}(\d{{3,}})\.{}$",
        SEGMENT_PREFIX,
        regex::escape(extension)
    ))
    .ok()
}

fn capture_index(re: &Regex, name: &str) -> Option<u32> {
    re.captures(name)?.get(1)?.as_str().parse().ok()
}

/// Segment files currently in `output_dir`, in chronological order.
pub async fn list_segments(output_dir: &Path, extension: &str) -> std::io::Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let Some(re) = segment_name_regex(extension) else {
        return Ok(segments);
    };
    let mut entries = match fs::read_dir(output_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(segments),
        Err(e) => return Err(e),
    };

    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(index) = name.to_str().and_then(|n| capture_index(&re, n)) else {
            continue;
        };
        segments.push(Segment {
            index,
            path: entry.path(),
            size: metadata.len(),
        });
    }

    // index order, not name order: part_1000 must follow part_999
    segments.sort_by_key(|s| s.index);
    Ok(segments)
}

/// Cuts `source` into parts of at most `segment_secs` seconds in `output_dir`.
///
/// The segmenter future is dropped when `timeout` elapses, which kills the
/// child process.
pub async fn split_into_segments(
    segmenter: &dyn Segmenter,
    source: &Path,
    output_dir: &Path,
    extension: &str,
    segment_secs: u32,
    timeout: Duration,
) -> Result<Vec<Segment>> {
    let pattern = segment_pattern(output_dir, extension);

    tracing::info!(
        "Segmenting {:?} into {}s parts ({:?})",
        source,
        segment_secs,
        pattern
    );

    let run = segmenter.segment(source, &pattern, segment_secs);
    let output = match tokio::time::timeout(timeout, run).await {
        Err(_) => {
            tracing::error!("Segmenter exceeded {:?} on {:?}", timeout, source);
            return Err(SplitError::ProcessingTimeout(timeout));
        }
        Ok(Err(e)) => {
            return Err(SplitError::ProcessingFailed {
                status: "failed to start".to_string(),
                stderr: e.to_string(),
            })
        }
        Ok(Ok(output)) => output,
    };

    if !output.status.success() {
        return Err(SplitError::ProcessingFailed {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let segments = list_segments(output_dir, extension).await?;
    if segments.is_empty() {
        tracing::error!(
            "Segmenter succeeded but wrote nothing; stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        return Err(SplitError::NoOutputProduced);
    }

    tracing::info!("Produced {} segments from {:?}", segments.len(), source);
    Ok(segments)
}
