//! Scan settings
//!
//! The validated set of options every scan run is built from. The CLI fills this
//! in from the config file and flags; library users can construct it directly.

use crate::core::retry::{duration_millis, RetryPolicy};
use crate::core::validation::{
    validate_confidence, validate_extension, validate_glob_pattern, validate_positive,
    ValidationError,
};
use crate::detection::{ClientOptions, DetectionSettings};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MAX_CHUNK_SIZE: usize = 5000;
pub const DEFAULT_BATCH_LIMIT: usize = 5;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.8;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Files that are never submitted for detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreSettings {
    /// Glob patterns matched against the path within the repository
    pub paths: Vec<String>,
    pub filenames: Vec<String>,
    pub extensions: Vec<String>,
    /// Larger blobs are ignored; `None` disables the limit
    pub max_file_size: Option<u64>,
}

impl Default for IgnoreSettings {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            filenames: Vec::new(),
            extensions: Vec::new(),
            max_file_size: Some(DEFAULT_MAX_FILE_SIZE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Maximum unit length in characters
    pub max_chunk_size: usize,
    pub batch_limit: usize,
    #[serde(with = "duration_millis")]
    pub flush_interval: Duration,
    pub confidence_threshold: f64,
    pub dry_run: bool,
    pub ignore: IgnoreSettings,
    pub detection: DetectionSettings,
    pub retry: RetryPolicy,
    pub max_commits: Option<usize>,
    pub channel_capacity: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            batch_limit: DEFAULT_BATCH_LIMIT,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            dry_run: false,
            ignore: IgnoreSettings::default(),
            detection: DetectionSettings::default(),
            retry: RetryPolicy::default(),
            max_commits: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ScanSettings {
    /// Reject settings no scan could run with
    ///
    /// Credentials are only required when requests will actually be sent.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_positive("max chunk size", self.max_chunk_size)?;
        validate_positive("batch limit", self.batch_limit)?;
        validate_positive("channel capacity", self.channel_capacity)?;
        validate_positive("retry attempts", self.retry.max_attempts)?;
        validate_confidence(self.confidence_threshold)?;
        if self.flush_interval.is_zero() {
            return Err(ValidationError::new("flush interval must be greater than 0"));
        }
        if self.max_commits == Some(0) {
            return Err(ValidationError::new("max commits must be greater than 0"));
        }
        if self.ignore.max_file_size == Some(0) {
            return Err(ValidationError::new("max file size must be greater than 0"));
        }
        for pattern in &self.ignore.paths {
            validate_glob_pattern(pattern)?;
        }
        for extension in &self.ignore.extensions {
            validate_extension(extension)?;
        }
        if self.ignore.filenames.iter().any(|name| name.trim().is_empty()) {
            return Err(ValidationError::new("ignored filenames cannot be empty"));
        }

        if !self.dry_run && !self.detection.has_credentials() {
            return Err(ValidationError::new(
                "a detection endpoint and API key are required (set PHISCAN_ENDPOINT and PHISCAN_API_KEY, or use --dry-run)",
            ));
        }
        Ok(())
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            confidence_threshold: self.confidence_threshold,
            batch_limit: self.batch_limit,
            dry_run: self.dry_run,
        }
    }
}
