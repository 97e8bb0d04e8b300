use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempPath;
use tokio::sync::Semaphore;

use crate::adapters::local::fs::CleanupReport;
use crate::adapters::local::workspace::{OutputFile, Workspace, WorkspaceManager};
use crate::config::SplitterConfig;
use crate::domain::archive::package_segments;
use crate::domain::segments::split_into_segments;
use crate::domain::{Scope, Segment, UploadRequest};
use crate::error::{Result, SplitError};
use crate::ports::Segmenter;

/// A validated upload spooled to the incoming area. Dropping it deletes the
/// spooled file.
#[derive(Debug)]
pub struct PendingUpload {
    pub request: UploadRequest,
    pub file: TempPath,
    pub bytes: u64,
}

/// Result of a completed split job.
#[derive(Debug)]
pub struct JobOutcome {
    pub segments: Vec<Segment>,
    pub archive: PathBuf,
    pub files: Vec<OutputFile>,
}

/// Runs clear → stage → segment → package → list for one workspace.
#[derive(Clone)]
pub struct SplitService {
    workspaces: WorkspaceManager,
    segmenter: Arc<dyn Segmenter>,
    segment_extension: String,
    segment_timeout: Duration,
    jobs: Arc<Semaphore>,
}

impl SplitService {
    pub fn new(
        config: &SplitterConfig,
        workspaces: WorkspaceManager,
        segmenter: Arc<dyn Segmenter>,
    ) -> Self {
        Self {
            workspaces,
            segmenter,
            segment_extension: config.segment_extension.clone(),
            segment_timeout: config.segment_timeout,
            jobs: Arc::new(Semaphore::new(config.max_concurrent_jobs)),
        }
    }

    pub fn workspace(&self, scope: Scope) -> Workspace {
        self.workspaces.workspace(scope)
    }

    /// Runs one split job. Once a permit is held the job continues in its own
    /// task, so dropping this future (request timeout, client disconnect)
    /// does not skip the staging and partial-output cleanup.
    pub async fn run(&self, scope: Scope, upload: PendingUpload) -> Result<JobOutcome> {
        let permit = self.jobs.clone().acquire_owned().await.map_err(|_| {
            SplitError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "job limiter closed",
            ))
        })?;

        let job = self.clone();
        let handle = tokio::spawn(async move {
            let _permit = permit;
            job.execute(scope, upload).await
        });

        handle.await.map_err(|e| {
            SplitError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("split job aborted: {}", e),
            ))
        })?
    }

    async fn execute(&self, scope: Scope, upload: PendingUpload) -> Result<JobOutcome> {
        let workspace = self.workspace(scope);
        tracing::info!(
            "Split job for {} workspace: {:?} ({} bytes), {}s parts",
            scope,
            upload.request.original_name,
            upload.bytes,
            upload.request.duration_secs
        );

        // implicit clear: failures are logged, the job goes on
        if let Err(e) = workspace.clear().await {
            for failure in &e.failures {
                tracing::warn!("Clear before write left {}", failure);
            }
        }
        workspace.prepare().await?;

        let staged = workspace
            .staging_dir
            .join(upload.request.staged_file_name());
        upload.file.persist(&staged).map_err(|e| SplitError::Io(e.error))?;

        let result = split_into_segments(
            self.segmenter.as_ref(),
            &staged,
            &workspace.output_dir,
            &self.segment_extension,
            upload.request.duration_secs,
            self.segment_timeout,
        )
        .await;

        self.discard_staged(&staged).await;

        let segments = match result {
            Ok(segments) => segments,
            Err(e) => {
                self.discard_partial_output(&workspace).await;
                return Err(e);
            }
        };

        let archive = match package_segments(
            &segments,
            &workspace.output_dir,
            &upload.request.archive_name(),
        )
        .await
        {
            Ok(archive) => archive,
            Err(e) => {
                self.discard_partial_output(&workspace).await;
                return Err(e);
            }
        };
        let files = workspace.list_files().await?;

        Ok(JobOutcome {
            segments,
            archive,
            files,
        })
    }

    /// Explicit clear. Unlike the clear embedded in [`run`](Self::run), a
    /// failure here is returned to the caller.
    pub async fn clear(&self, scope: Scope) -> Result<CleanupReport> {
        let report = self.workspace(scope).clear().await?;
        tracing::info!("Cleared {} workspace ({} entries)", scope, report.removed);
        Ok(report)
    }

    pub async fn list(&self, scope: Scope) -> Result<Vec<OutputFile>> {
        Ok(self.workspace(scope).list_files().await?)
    }

    pub async fn resolve_download(&self, scope: Scope, name: &str) -> Result<PathBuf> {
        self.workspace(scope).resolve_download(name).await
    }

    async fn discard_staged(&self, staged: &Path) {
        if let Err(failure) = self.workspaces.fs().remove(staged).await {
            tracing::error!("Staged upload left behind: {}", failure);
        }
    }

    /// Parts of a job that did not complete must not be listed.
    async fn discard_partial_output(&self, workspace: &Workspace) {
        if let Err(e) = self.workspaces.fs().clear_dir(&workspace.output_dir).await {
            for failure in &e.failures {
                tracing::error!("Partial output left behind: {}", failure);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::ports::segmenter::MockSegmenter;
    use async_trait::async_trait;
    use std::io;
    use std::os::unix::fs::PermissionsExt;
    use std::os::unix::process::ExitStatusExt;
    use std::process::{ExitStatus, Output};
    use tempfile::{tempdir, TempDir};
    use zip::ZipArchive;

    fn create_mock_output(success: bool) -> io::Result<Output> {
        Ok(Output {
            status: ExitStatus::from_raw(if success { 0 } else { 1 << 8 }),
            stdout: Vec::new(),
            stderr: b"diagnostics".to_vec(),
        })
    }

    fn setup(mock: MockSegmenter) -> (TempDir, WorkspaceManager, SplitService) {
        let root = tempdir().unwrap();
        let config = SplitterConfig {
            upload_dir: root.path().join("uploads"),
            output_dir: root.path().join("output"),
            cleanup: RetryPolicy {
                max_attempts: 2,
                backoff: Duration::from_millis(1),
            },
            max_concurrent_jobs: 1,
            ..SplitterConfig::default()
        };
        let workspaces = WorkspaceManager::new(&config);
        let service = SplitService::new(&config, workspaces.clone(), Arc::new(mock));
        (root, workspaces, service)
    }

    async fn pending(workspaces: &WorkspaceManager, name: &str, duration: &str) -> PendingUpload {
        workspaces.ensure_roots().await.unwrap();
        let file = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(workspaces.incoming_dir())
            .unwrap()
            .into_temp_path();
        std::fs::write(&file, b"source bytes").unwrap();
        PendingUpload {
            request: UploadRequest::new(Some(name), Some(duration)).unwrap(),
            file,
            bytes: 12,
        }
    }

    fn staging_is_empty(workspace: &Workspace) -> bool {
        std::fs::read_dir(&workspace.staging_dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true)
    }

    #[tokio::test]
    async fn test_run_produces_segments_and_archive() {
        let mut mock = MockSegmenter::new();
        mock.expect_segment()
            .withf(|source, _, secs| source.exists() && *secs == 4)
            .times(1)
            .returning(|_, pattern, _| {
                let dir = pattern.parent().unwrap();
                for i in 0..3 {
                    std::fs::write(dir.join(format!("part_{:03}.mp4", i)), b"part").unwrap();
                }
                create_mock_output(true)
            });
        let (_root, workspaces, service) = setup(mock);
        let scope = Scope::new_session();
        let upload = pending(&workspaces, "holiday.mp4", "4").await;

        let outcome = service.run(scope, upload).await.unwrap();

        assert_eq!(outcome.segments.len(), 3);
        assert!(outcome.archive.ends_with("holiday_parts.zip"));
        let names: Vec<_> = outcome.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["holiday_parts.zip", "part_000.mp4", "part_001.mp4", "part_002.mp4"]
        );

        let archive = ZipArchive::new(std::fs::File::open(&outcome.archive).unwrap()).unwrap();
        let mut members: Vec<_> = archive.file_names().map(String::from).collect();
        members.sort();
        assert_eq!(members, vec!["part_000.mp4", "part_001.mp4", "part_002.mp4"]);

        assert!(staging_is_empty(&service.workspace(scope)));
        assert_eq!(std::fs::read_dir(workspaces.incoming_dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_new_job_replaces_previous_outputs() {
        let mut mock = MockSegmenter::new();
        mock.expect_segment().times(2).returning(|_, pattern, _| {
            std::fs::write(pattern.parent().unwrap().join("part_000.mp4"), b"part").unwrap();
            create_mock_output(true)
        });
        let (_root, workspaces, service) = setup(mock);
        let scope = Scope::Global;

        service
            .run(scope, pending(&workspaces, "first.mp4", "4").await)
            .await
            .unwrap();
        let outcome = service
            .run(scope, pending(&workspaces, "second.mp4", "4").await)
            .await
            .unwrap();

        let names: Vec<_> = outcome.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["part_000.mp4", "second_parts.zip"]);
        assert!(matches!(
            service.resolve_download(scope, "first_parts.zip").await,
            Err(SplitError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_segmentation_removes_staging_and_partials() {
        let mut mock = MockSegmenter::new();
        mock.expect_segment().times(1).returning(|_, pattern, _| {
            std::fs::write(pattern.parent().unwrap().join("part_000.mp4"), b"half").unwrap();
            create_mock_output(false)
        });
        let (_root, workspaces, service) = setup(mock);
        let scope = Scope::new_session();

        let result = service
            .run(scope, pending(&workspaces, "broken.mp4", "4").await)
            .await;

        assert!(matches!(result, Err(SplitError::ProcessingFailed { .. })));
        assert!(staging_is_empty(&service.workspace(scope)));
        assert!(service.list(scope).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_output_is_reported() {
        let mut mock = MockSegmenter::new();
        mock.expect_segment()
            .times(1)
            .returning(|_, _, _| create_mock_output(true));
        let (_root, workspaces, service) = setup(mock);

        let result = service
            .run(Scope::Global, pending(&workspaces, "empty.mp4", "4").await)
            .await;
        assert!(matches!(result, Err(SplitError::NoOutputProduced)));
        assert!(service.list(Scope::Global).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_explicit_clear_twice() {
        let (_root, _workspaces, service) = setup(MockSegmenter::new());
        let scope = Scope::new_session();
        let workspace = service.workspace(scope);
        workspace.prepare().await.unwrap();
        std::fs::write(workspace.output_dir.join("part_000.mp4"), b"x").unwrap();

        assert_eq!(service.clear(scope).await.unwrap().removed, 1);
        assert_eq!(service.clear(scope).await.unwrap().removed, 0);
        assert!(service.list(scope).await.unwrap().is_empty());
    }

    /// Writes two parts, then takes `delay` before exiting successfully.
    struct SlowSegmenter {
        delay: Duration,
    }

    #[async_trait]
    impl Segmenter for SlowSegmenter {
        async fn segment(&self, _: &Path, pattern: &Path, _: u32) -> io::Result<Output> {
            let dir = pattern.parent().unwrap();
            std::fs::write(dir.join("part_000.mp4"), b"part")?;
            tokio::time::sleep(self.delay).await;
            std::fs::write(dir.join("part_001.mp4"), b"part")?;
            create_mock_output(true)
        }
    }

    /// Makes `dir` read-only. Returns false when the current user can still
    /// write to it, in which case the caller cannot rely on removal failing.
    fn lock_dir(dir: &Path) -> bool {
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o555)).unwrap();
        if std::fs::write(dir.join("write-check"), b"x").is_ok() {
            unlock_dir(dir);
            std::fs::remove_file(dir.join("write-check")).unwrap();
            return false;
        }
        true
    }

    fn unlock_dir(dir: &Path) {
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[tokio::test]
    async fn test_dropped_run_still_finishes_and_cleans_up() {
        let root = tempdir().unwrap();
        let config = SplitterConfig {
            upload_dir: root.path().join("uploads"),
            output_dir: root.path().join("output"),
            ..SplitterConfig::default()
        };
        let workspaces = WorkspaceManager::new(&config);
        let segmenter = SlowSegmenter {
            delay: Duration::from_millis(300),
        };
        let service = SplitService::new(&config, workspaces.clone(), Arc::new(segmenter));
        let scope = Scope::new_session();
        let upload = pending(&workspaces, "slow.mp4", "4").await;

        let dropped = tokio::time::timeout(Duration::from_millis(50), service.run(scope, upload)).await;
        assert!(dropped.is_err());

        let mut names = Vec::new();
        for _ in 0..100 {
            names = service
                .list(scope)
                .await
                .unwrap()
                .into_iter()
                .map(|f| f.name)
                .collect::<Vec<_>>();
            if names.iter().any(|n| n == "slow_parts.zip") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        assert_eq!(names, vec!["part_000.mp4", "part_001.mp4", "slow_parts.zip"]);
        assert!(staging_is_empty(&service.workspace(scope)));
        assert_eq!(std::fs::read_dir(workspaces.incoming_dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_failed_clear_before_write_does_not_abort_the_job() {
        let mut mock = MockSegmenter::new();
        mock.expect_segment().times(1).returning(|_, pattern, _| {
            std::fs::write(pattern.parent().unwrap().join("part_000.mp4"), b"part").unwrap();
            create_mock_output(true)
        });
        let (_root, workspaces, service) = setup(mock);
        let scope = Scope::new_session();
        let workspace = service.workspace(scope);
        workspace.prepare().await.unwrap();
        let locked = workspace.output_dir.join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::write(locked.join("old_part.mp4"), b"x").unwrap();
        if !lock_dir(&locked) {
            eprintln!("skipping: directory permissions are not enforced for this user");
            return;
        }

        let cleared = workspace.clear().await;
        let result = service
            .run(scope, pending(&workspaces, "clip.mp4", "4").await)
            .await;
        unlock_dir(&locked);

        let err = cleared.unwrap_err();
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].path, locked);

        let outcome = result.unwrap();
        let names: Vec<_> = outcome.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["clip_parts.zip", "part_000.mp4"]);
    }

    #[tokio::test]
    async fn test_explicit_clear_failure_is_returned() {
        let (_root, _workspaces, service) = setup(MockSegmenter::new());
        let scope = Scope::new_session();
        let workspace = service.workspace(scope);
        std::fs::create_dir_all(&workspace.output_dir).unwrap();
        std::fs::create_dir_all(workspace.staging_dir.parent().unwrap()).unwrap();
        std::fs::write(&workspace.staging_dir, b"not a directory").unwrap();

        match service.clear(scope).await {
            Err(SplitError::Cleanup(e)) => assert_eq!(e.failures[0].path, workspace.staging_dir),
            other => panic!("expected a cleanup error, got {:?}", other),
        }
    }
}
