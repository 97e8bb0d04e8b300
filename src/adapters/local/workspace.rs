//! Staging and output directories, keyed by [`Scope`].
//!
//! Layout:
//! - `<upload_root>/incoming/` pending uploads that have not been validated yet
//! - `<upload_root>/<scope>/` staging area of one workspace
//! - `<output_root>/` outputs of the global workspace
//! - `<output_root>/<session>/` outputs of one session
//!
//! Nothing serializes two requests that target the same workspace; they
//! race on clear and stage. Session scoping is the only isolation.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use uuid::Uuid;

use super::fs::{CleanupReport, FsAdapter};
use crate::config::SplitterConfig;
use crate::domain::archive::is_partial;
use crate::domain::Scope;
use crate::error::{CleanupError, Result, SplitError};

pub const INCOMING_DIR: &str = "incoming";

/// A regular file of an output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputFile {
    pub name: String,
    pub size: u64,
}

#[derive(Clone, Debug)]
pub struct WorkspaceManager {
    upload_root: PathBuf,
    output_root: PathBuf,
    session_lifetime: Duration,
    fs: FsAdapter,
}

impl WorkspaceManager {
    pub fn new(config: &SplitterConfig) -> Self {
        Self {
            upload_root: config.upload_dir.clone(),
            output_root: config.output_dir.clone(),
            session_lifetime: config.session_lifetime,
            fs: FsAdapter::new(config.cleanup),
        }
    }

    pub fn fs(&self) -> FsAdapter {
        self.fs
    }

    pub fn incoming_dir(&self) -> PathBuf {
        self.upload_root.join(INCOMING_DIR)
    }

    pub fn workspace(&self, scope: Scope) -> Workspace {
        let output_dir = match scope {
            Scope::Global => self.output_root.clone(),
            Scope::Session(id) => self.output_root.join(id.to_string()),
        };
        Workspace {
            scope,
            staging_dir: self.upload_root.join(scope.dir_name()),
            output_dir,
            fs: self.fs,
        }
    }

    pub async fn ensure_roots(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.output_root).await?;
        fs::create_dir_all(self.incoming_dir()).await
    }

    /// Empties both roots unconditionally. Run once before serving.
    pub async fn startup_sweep(&self) -> std::result::Result<CleanupReport, CleanupError> {
        let report = self
            .fs
            .clear_dirs(&[self.upload_root.as_path(), self.output_root.as_path()])
            .await?;
        tracing::info!("Startup sweep removed {} entries", report.removed);
        Ok(report)
    }

    /// Removes session directories untouched for longer than the session
    /// lifetime. Directories whose name is not a session token are left alone.
    pub async fn sweep_stale_sessions(&self) -> std::result::Result<CleanupReport, CleanupError> {
        let mut report = CleanupReport::default();
        let mut failures = Vec::new();

        for root in [self.upload_root.as_path(), self.output_root.as_path()] {
            for dir in stale_session_dirs(root, self.session_lifetime).await {
                match self.fs.remove(&dir).await {
                    Ok(()) => {
                        tracing::info!("Removed expired session workspace {:?}", dir);
                        report.removed += 1;
                    }
                    Err(failure) => failures.push(failure),
                }
            }
        }

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(CleanupError { failures })
        }
    }
}

async fn stale_session_dirs(root: &Path, lifetime: Duration) -> Vec<PathBuf> {
    let mut stale = Vec::new();
    let Ok(mut entries) = fs::read_dir(root).await else {
        return stale;
    };
    let now = SystemTime::now();

    while let Ok(Some(entry)) = entries.next_entry().await {
        let is_session = entry
            .file_name()
            .to_str()
            .map(|name| Uuid::parse_str(name).is_ok())
            .unwrap_or(false);
        if !is_session {
            continue;
        }
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if !metadata.is_dir() {
            continue;
        }
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age >= lifetime {
            stale.push(entry.path());
        }
    }
    stale
}

/// Staging and output directories of one scope.
#[derive(Clone, Debug)]
pub struct Workspace {
    pub scope: Scope,
    pub staging_dir: PathBuf,
    pub output_dir: PathBuf,
    fs: FsAdapter,
}

impl Workspace {
    pub async fn prepare(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.staging_dir).await?;
        fs::create_dir_all(&self.output_dir).await
    }

    /// Empties staging and output. The directories themselves remain.
    pub async fn clear(&self) -> std::result::Result<CleanupReport, CleanupError> {
        let report = self
            .fs
            .clear_dirs(&[self.staging_dir.as_path(), self.output_dir.as_path()])
            .await?;
        tracing::debug!("Cleared {} entries from {} workspace", report.removed, self.scope);
        Ok(report)
    }

    /// Regular files of the output directory, sorted by name. Archives still
    /// being written are left out.
    pub async fn list_files(&self) -> std::io::Result<Vec<OutputFile>> {
        let mut files = Vec::new();
        let mut entries = match fs::read_dir(&self.output_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e),
        };

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !metadata.is_file() || is_partial(&name) {
                continue;
            }
            files.push(OutputFile {
                name,
                size: metadata.len(),
            });
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Resolves `name` to a regular file inside this workspace's output.
    pub async fn resolve_download(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || is_partial(name) {
            return Err(SplitError::NotFound(name.to_string()));
        }

        let root = fs::canonicalize(&self.output_dir)
            .await
            .map_err(|_| SplitError::NotFound(name.to_string()))?;
        let resolved = fs::canonicalize(self.output_dir.join(name))
            .await
            .map_err(|_| SplitError::NotFound(name.to_string()))?;

        if !resolved.starts_with(&root) {
            return Err(SplitError::AccessDenied(format!(
                "{:?} escapes the {} workspace",
                name, self.scope
            )));
        }

        let metadata = fs::metadata(&resolved)
            .await
            .map_err(|_| SplitError::NotFound(name.to_string()))?;
        if !metadata.is_file() {
            return Err(SplitError::NotFound(name.to_string()));
        }
        Ok(resolved)
    }
}
