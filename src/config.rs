//! Configuration loaded from the environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const MIB: usize = 1024 * 1024;

/// Bounded retry applied to every filesystem removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(100),
        }
    }
}

/// Configuration for the splitter service.
#[derive(Clone, Debug)]
pub struct SplitterConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Root of the staging directories
    pub upload_dir: PathBuf,
    /// Root of the output directories
    pub output_dir: PathBuf,
    /// Ceiling on the request body, enforced before the handler runs
    pub max_upload_bytes: usize,
    /// Write buffer used while spooling an upload to disk
    pub upload_chunk_bytes: usize,
    /// Path of the external segmenter binary
    pub ffmpeg_bin: PathBuf,
    /// Container extension of produced segments
    pub segment_extension: String,
    pub segment_timeout: Duration,
    /// Partition workspaces per browser session
    pub session_scoped: bool,
    pub session_lifetime: Duration,
    pub cleanup: RetryPolicy,
    pub max_concurrent_jobs: usize,
    pub request_timeout: Duration,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            addr: String::from("0.0.0.0"),
            port: String::from("10000"),
            upload_dir: PathBuf::from("./uploads"),
            output_dir: PathBuf::from("./output"),
            max_upload_bytes: 200 * MIB,
            upload_chunk_bytes: 8 * MIB,
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            segment_extension: String::from("mp4"),
            segment_timeout: Duration::from_secs(240),
            session_scoped: true,
            session_lifetime: Duration::from_secs(3600),
            cleanup: RetryPolicy::default(),
            max_concurrent_jobs: default_concurrency(),
            request_timeout: Duration::from_secs(300),
        }
    }
}

impl SplitterConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let defaults = Self::default();
        Self {
            addr: env::var("ADDR").unwrap_or(defaults.addr),
            port: env::var("PORT").unwrap_or(defaults.port),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            output_dir: env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            upload_chunk_bytes: parse_var("UPLOAD_CHUNK_BYTES", defaults.upload_chunk_bytes),
            ffmpeg_bin: env::var("FFMPEG_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffmpeg_bin),
            segment_extension: env::var("SEGMENT_EXTENSION")
                .ok()
                .filter(|ext| is_plain_extension(ext))
                .unwrap_or(defaults.segment_extension),
            segment_timeout: Duration::from_secs(parse_var(
                "SEGMENT_TIMEOUT_SECS",
                defaults.segment_timeout.as_secs(),
            )),
            session_scoped: parse_var("SESSION_SCOPED", defaults.session_scoped),
            session_lifetime: Duration::from_secs(parse_var(
                "SESSION_LIFETIME_SECS",
                defaults.session_lifetime.as_secs(),
            )),
            cleanup: RetryPolicy {
                max_attempts: parse_var("CLEANUP_MAX_ATTEMPTS", defaults.cleanup.max_attempts)
                    .max(1),
                backoff: Duration::from_millis(parse_var(
                    "CLEANUP_BACKOFF_MS",
                    defaults.cleanup.backoff.as_millis() as u64,
                )),
            },
            max_concurrent_jobs: parse_var("MAX_CONCURRENT_JOBS", defaults.max_concurrent_jobs)
                .max(1),
            request_timeout: Duration::from_secs(parse_var(
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}

/// Same sizing as a sync worker pool: two per core plus one.
fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() * 2 + 1)
        .unwrap_or(3)
}

fn is_plain_extension(ext: &str) -> bool {
    !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric())
}

fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring unparsable {}={:?}, using default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}
