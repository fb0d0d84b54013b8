//! Command-line arguments
//!
//! Every option is optional on the command line so that values from the config
//! file survive unless a flag overrides them. [`Args::resolve`] merges the two
//! into the settings a run is started with.

use super::config::ConfigFile;
use super::validation::validate_repositories;
use crate::app::display::OutputFormat;
use crate::core::logging::{LogFormat, LogSettings};
use crate::core::validation::{split_and_collect, ValidationError};
use crate::scanner::settings::ScanSettings;
use clap::{ArgAction, Parser};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "phiscan")]
#[command(about = "Scan git history for protected health and personal information")]
#[command(version)]
#[command(after_help = " * can be specified multiple times or as a comma-separated list")]
pub struct Args {
    /// Repositories to scan*
    #[arg(short = 'r', long = "repo", value_name = "PATHS", action = ArgAction::Append)]
    pub repository: Vec<String>,

    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Detection service endpoint
    #[arg(long = "endpoint", env = "PHISCAN_ENDPOINT", value_name = "URL")]
    pub endpoint: Option<String>,

    /// Detection service key
    #[arg(long = "api-key", env = "PHISCAN_API_KEY", value_name = "KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Chunk and batch everything but never call the detection service
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Maximum scan unit length in characters
    #[arg(long = "max-chunk-size", value_name = "CHARS")]
    pub max_chunk_size: Option<usize>,

    /// Maximum units per detection request
    #[arg(short = 'b', long = "batch-limit", value_name = "COUNT")]
    pub batch_limit: Option<usize>,

    /// Send a partial batch after this many idle milliseconds
    #[arg(long = "flush-interval", value_name = "MILLIS")]
    pub flush_interval: Option<u64>,

    /// Minimum confidence for a finding (0.0 to 1.0)
    #[arg(short = 't', long = "confidence", value_name = "SCORE")]
    pub confidence: Option<f64>,

    /// Document language sent to the service
    #[arg(long = "language", value_name = "CODE")]
    pub language: Option<String>,

    /// Entity domain sent to the service
    #[arg(long = "domain", value_name = "DOMAIN")]
    pub domain: Option<String>,

    /// Maximum number of commits to scan, newest first
    #[arg(short = 'C', long = "max-commits", value_name = "COUNT")]
    pub max_commits: Option<usize>,

    /// Ignore blobs larger than this many bytes
    #[arg(long = "max-file-size", value_name = "BYTES")]
    pub max_file_size: Option<u64>,

    /// Path globs to ignore*
    #[arg(short = 'N', long = "exclude-paths", value_name = "GLOBS", action = ArgAction::Append)]
    pub exclude_paths: Vec<String>,

    /// File names to ignore*
    #[arg(long = "exclude-files", value_name = "NAMES", action = ArgAction::Append)]
    pub exclude_files: Vec<String>,

    /// File extensions to ignore*
    #[arg(long = "exclude-extensions", value_name = "EXTS", action = ArgAction::Append)]
    pub exclude_extensions: Vec<String>,

    /// Attempts per file when units come back without a result
    #[arg(long = "attempts", value_name = "COUNT")]
    pub attempts: Option<usize>,

    /// Force coloured output
    #[arg(short = 'g', long = "color", conflicts_with = "no_color")]
    pub color: bool,

    /// Disable coloured output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// Report format
    #[arg(short = 'o', long = "output", value_name = "FORMAT", value_parser = ["text", "json"])]
    pub output: Option<String>,

    /// Exit with status 2 when any finding is reported
    #[arg(long = "fail-on-findings")]
    pub fail_on_findings: bool,
}

/// Everything a run needs once CLI and config file are merged
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub repositories: Vec<String>,
    pub scan: ScanSettings,
    pub log: LogSettings,
    pub output: OutputFormat,
    pub fail_on_findings: bool,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the config file under these arguments
    ///
    /// Flags given on the command line win. Repository and ignore lists from the
    /// command line replace the config file's lists rather than extending them.
    pub fn resolve(&self, config: ConfigFile) -> Result<RunSettings, ValidationError> {
        let mut scan = config.scan;
        if let Some(endpoint) = &self.endpoint {
            scan.detection.endpoint = Some(endpoint.clone());
        }
        if let Some(api_key) = &self.api_key {
            scan.detection.api_key = Some(api_key.clone());
        }
        if let Some(language) = &self.language {
            scan.detection.language = language.clone();
        }
        if let Some(domain) = &self.domain {
            scan.detection.domain = domain.clone();
        }
        scan.dry_run |= self.dry_run;
        if let Some(size) = self.max_chunk_size {
            scan.max_chunk_size = size;
        }
        if let Some(limit) = self.batch_limit {
            scan.batch_limit = limit;
        }
        if let Some(millis) = self.flush_interval {
            scan.flush_interval = Duration::from_millis(millis);
        }
        if let Some(confidence) = self.confidence {
            scan.confidence_threshold = confidence;
        }
        if self.max_commits.is_some() {
            scan.max_commits = self.max_commits;
        }
        if self.max_file_size.is_some() {
            scan.ignore.max_file_size = self.max_file_size;
        }
        if let Some(attempts) = self.attempts {
            scan.retry.max_attempts = attempts;
        }
        replace_if_given(&mut scan.ignore.paths, &self.exclude_paths);
        replace_if_given(&mut scan.ignore.filenames, &self.exclude_files);
        replace_if_given(&mut scan.ignore.extensions, &self.exclude_extensions);
        scan.validate()?;

        let mut repositories = split_and_collect(&self.repository);
        if repositories.is_empty() {
            repositories = split_and_collect(&config.repository);
        }
        if repositories.is_empty() {
            repositories.push(".".to_string());
        }
        validate_repositories(&repositories)?;

        let log_format = self
            .log_format
            .as_deref()
            .or(config.log_format.as_deref())
            .map(|format| {
                LogFormat::from_str(format)
                    .map_err(|_| ValidationError::new(format!("Unknown log format '{}'", format)))
            })
            .transpose()?
            .unwrap_or_default();

        let log_file = match (&self.log_file, &config.log_file) {
            (Some(path), _) => Some(path.clone()),
            (None, Some(path)) => Some(PathBuf::from(path)),
            (None, None) => None,
        }
        .filter(|path| {
            let text = path.to_string_lossy();
            !(text.eq_ignore_ascii_case("none") || text == "-")
        });

        let color = if self.no_color {
            false
        } else if self.color {
            true
        } else {
            config
                .color
                .unwrap_or_else(|| std::io::stdout().is_terminal())
        };

        let output = self
            .output
            .as_deref()
            .or(config.output.as_deref())
            .map(|format| {
                OutputFormat::from_str(format)
                    .map_err(|_| ValidationError::new(format!("Unknown output format '{}'", format)))
            })
            .transpose()?
            .unwrap_or_default();

        Ok(RunSettings {
            repositories,
            scan,
            log: LogSettings {
                level: self.log_level.clone().or(config.log_level),
                format: log_format,
                file: log_file,
                color,
            },
            output,
            fail_on_findings: self.fail_on_findings || config.fail_on_findings.unwrap_or(false),
        })
    }
}

fn replace_if_given(target: &mut Vec<String>, given: &[String]) {
    let values = split_and_collect(given);
    if !values.is_empty() {
        *target = values;
    }
}
