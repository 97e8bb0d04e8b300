use axum::body::Bytes;
use axum::BoxError;
use futures::{Stream, TryStreamExt};
use std::future::Future;
use std::io;
use std::path::Path;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::io::StreamReader;

use crate::config::RetryPolicy;
use crate::error::{CleanupError, CleanupFailure};

/// What a successful cleanup removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
}

impl CleanupReport {
    fn merge(&mut self, other: CleanupReport) {
        self.removed += other.removed;
    }
}

/// Filesystem operations with bounded retries on removal.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsAdapter {
    retry: RetryPolicy,
}

impl FsAdapter {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }

    /// Removes `path` (file or tree), retrying transient failures.
    pub async fn remove(&self, path: &Path) -> Result<(), CleanupFailure> {
        self.retry(path, remove_path).await
    }

    /// Runs `op` on `path` up to `max_attempts` times, sleeping `backoff`
    /// between attempts.
    async fn retry<'a, F, Fut>(&self, path: &'a Path, mut op: F) -> Result<(), CleanupFailure>
    where
        F: FnMut(&'a Path) -> Fut,
        Fut: Future<Output = io::Result<()>>,
    {
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(path).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        "Removing {:?} failed (attempt {}/{}): {}",
                        path,
                        attempt,
                        attempts,
                        e
                    );
                    tokio::time::sleep(self.retry.backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to remove {:?} after {} attempts: {}", path, attempts, e);
                    return Err(CleanupFailure {
                        path: path.to_path_buf(),
                        source: e,
                    });
                }
            }
        }
    }

    /// Empties `dir`, keeping the directory itself. A missing directory is
    /// already clean.
    pub async fn clear_dir(&self, dir: &Path) -> Result<CleanupReport, CleanupError> {
        let mut report = CleanupReport::default();
        let mut failures = Vec::new();

        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(report),
            Err(e) => {
                return Err(CleanupError {
                    failures: vec![CleanupFailure {
                        path: dir.to_path_buf(),
                        source: e,
                    }],
                })
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    failures.push(CleanupFailure {
                        path: dir.to_path_buf(),
                        source: e,
                    });
                    break;
                }
            };
            match self.remove(&entry.path()).await {
                Ok(()) => report.removed += 1,
                Err(failure) => failures.push(failure),
            }
        }

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(CleanupError { failures })
        }
    }

    /// Empties every directory in `dirs`, collecting all failures.
    pub async fn clear_dirs(&self, dirs: &[&Path]) -> Result<CleanupReport, CleanupError> {
        let mut report = CleanupReport::default();
        let mut failures = Vec::new();
        for dir in dirs {
            match self.clear_dir(dir).await {
                Ok(r) => report.merge(r),
                Err(e) => failures.extend(e.failures),
            }
        }
        if failures.is_empty() {
            Ok(report)
        } else {
            Err(CleanupError { failures })
        }
    }
}

/// Idempotent single removal: a path that is already gone counts as removed.
pub async fn remove_path(path: &Path) -> io::Result<()> {
    let metadata = match fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    };

    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Save a `Stream` to a file through a write buffer of `buffer_bytes`.
/// Returns the number of bytes written.
pub async fn stream_to_file<S, E>(path: &Path, stream: S, buffer_bytes: usize) -> io::Result<u64>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    let body_with_io_error = stream.map_err(|err| io::Error::new(io::ErrorKind::Other, err));
    let body_reader = StreamReader::new(body_with_io_error);
    futures::pin_mut!(body_reader);

    let mut file = BufWriter::with_capacity(buffer_bytes, File::create(path).await?);
    let written = tokio::io::copy(&mut body_reader, &mut file).await?;
    file.flush().await?;

    Ok(written)
}
