//! Naming and validation rules for uploaded sources.

use regex::Regex;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::error::{Result, SplitError};

/// Fallback base name when nothing usable survives sanitization.
const FALLBACK_STEM: &str = "video";
pub const ARCHIVE_SUFFIX: &str = "_parts.zip";

fn disallowed() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9 _.\-]").expect("static regex"))
}

/// Strips everything but ASCII letters, digits, space, `-`, `_` and `.`.
pub fn sanitize_filename(name: &str) -> String {
    disallowed().replace_all(name, "").trim().to_string()
}

/// Parses the `duration` form value as a positive number of seconds.
pub fn parse_duration(raw: Option<&str>) -> Result<u32> {
    let raw = raw.ok_or_else(|| SplitError::Validation("Invalid duration value".to_string()))?;
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| SplitError::Validation("Invalid duration value".to_string()))?;

    if value <= 0 {
        return Err(SplitError::Validation(
            "Duration must be positive".to_string(),
        ));
    }
    u32::try_from(value).map_err(|_| SplitError::Validation("Invalid duration value".to_string()))
}

/// A validated upload waiting to be staged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub original_name: String,
    pub sanitized_name: String,
    pub duration_secs: u32,
}

impl UploadRequest {
    pub fn new(original_name: Option<&str>, duration: Option<&str>) -> Result<Self> {
        let original_name = match original_name {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            Some(_) => {
                return Err(SplitError::Validation(
                    "No video file selected".to_string(),
                ))
            }
            None => {
                return Err(SplitError::Validation(
                    "No video file uploaded".to_string(),
                ))
            }
        };
        let duration_secs = parse_duration(duration)?;
        let sanitized_name = sanitize_filename(&original_name);

        Ok(Self {
            original_name,
            sanitized_name,
            duration_secs,
        })
    }

    /// Random token plus the sanitized name, unique within the staging area.
    pub fn staged_file_name(&self) -> String {
        let token = Uuid::new_v4().simple();
        if self.sanitized_name.is_empty() {
            format!("{}_{}", token, FALLBACK_STEM)
        } else {
            format!("{}_{}", token, self.sanitized_name)
        }
    }

    /// `<base>_parts.zip`, base being the sanitized name without extension.
    pub fn archive_name(&self) -> String {
        format!("{}{}", archive_stem(&self.sanitized_name), ARCHIVE_SUFFIX)
    }
}

fn archive_stem(sanitized: &str) -> String {
    let stem = match sanitized.rsplit_once('.') {
        Some((stem, _ext)) => stem,
        None => sanitized,
    };
    // ".mp4" or ".." leave nothing useful
    if stem.trim_matches('.').trim().is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem.to_string()
    }
}
