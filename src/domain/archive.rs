use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::Builder;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::segments::Segment;
use crate::error::{Result, SplitError};

/// Suffix of archives still being written. Listings and downloads skip them.
pub const PARTIAL_SUFFIX: &str = ".partial";

pub fn is_partial(name: &str) -> bool {
    name.ends_with(PARTIAL_SUFFIX)
}

/// Bundles `segments` into `output_dir/archive_name`.
///
/// The archive is written to a `.partial` temp file next to its destination
/// and renamed into place once complete.
pub async fn package_segments(
    segments: &[Segment],
    output_dir: &Path,
    archive_name: &str,
) -> Result<PathBuf> {
    let members: Vec<PathBuf> = segments.iter().map(|s| s.path.clone()).collect();
    let output_dir = output_dir.to_path_buf();
    let destination = output_dir.join(archive_name);

    let result = tokio::task::spawn_blocking(move || -> Result<PathBuf> {
        let mut temp = Builder::new()
            .prefix(".")
            .suffix(PARTIAL_SUFFIX)
            .tempfile_in(&output_dir)
            .map_err(|e| SplitError::Packaging(format!("temp file: {}", e)))?;

        write_zip(temp.as_file_mut(), &members)
            .map_err(|e| SplitError::Packaging(e.to_string()))?;

        temp.persist(&destination)
            .map_err(|e| SplitError::Packaging(format!("persist: {}", e.error)))?;
        Ok(destination)
    })
    .await
    .map_err(|e| SplitError::Packaging(format!("packaging task failed: {}", e)))?;

    match &result {
        Ok(path) => tracing::info!("Packaged {} segments into {:?}", segments.len(), path),
        Err(e) => tracing::error!("{}", e),
    }
    result
}

fn write_zip(file: &mut File, members: &[PathBuf]) -> zip::result::ZipResult<()> {
    let mut zip = ZipWriter::new(file);
    // segments are already compressed video
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .large_file(true);

    for member in members {
        let name = member
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("unusable member name {:?}", member),
                )
            })?;
        zip.start_file(name, options)?;
        let mut source = File::open(member)?;
        io::copy(&mut source, &mut zip)?;
    }

    zip.finish()?;
    Ok(())
}
