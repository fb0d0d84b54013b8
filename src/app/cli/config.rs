//! TOML configuration file loading
//!
//! The config file is optional. When `--config-file` is not given the default
//! location under the user's config directory is tried, and a missing default
//! file is not an error.

use crate::core::error_handling::ContextualError;
use crate::core::validation::ValidationError;
use crate::scanner::settings::ScanSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Contents of a config file
///
/// ```toml
/// repository = ["~/src/clinic-portal"]
/// log_level = "debug"
///
/// [scan]
/// batch_limit = 5
/// confidence_threshold = 0.85
///
/// [scan.ignore]
/// extensions = ["png", "pdf"]
///
/// [scan.detection]
/// endpoint = "https://example.cognitiveservices.azure.com"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub repository: Vec<String>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub log_file: Option<String>,
    pub color: Option<bool>,
    pub output: Option<String>,
    pub fail_on_findings: Option<bool>,
    pub scan: ScanSettings,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("The specified configuration file does not exist: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Error reading configuration file {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    #[error("Error parsing configuration file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),
}

impl ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<String> {
        Some(self.to_string())
    }
}

/// `<config dir>/phiscan/phiscan.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("phiscan").join("phiscan.toml"))
}

/// Load the explicit config file, or the default one if it exists
pub async fn load_config(explicit: Option<&Path>) -> Result<(Option<PathBuf>, ConfigFile), ConfigError> {
    let path = match explicit {
        Some(path) if !path.exists() => {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok((None, ConfigFile::default())),
        },
    };

    let contents = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| ConfigError::Read {
            path: path.clone(),
            message: e.to_string(),
        })?;
    let config = parse_config(&path, &contents)?;
    log::debug!("Loaded configuration from {}", path.display());
    Ok((Some(path), config))
}

pub fn parse_config(path: &Path, contents: &str) -> Result<ConfigFile, ConfigError> {
    toml::from_str(contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            Path::new("phiscan.toml"),
            r#"
            repository = ["/srv/repos/portal", "/srv/repos/billing"]
            log_level = "debug"
            output = "json"
            fail_on_findings = true

            [scan]
            batch_limit = 3
            flush_interval = 250

            [scan.ignore]
            paths = ["vendor/**"]
            max_file_size = 2048

            [scan.detection]
            endpoint = "https://lang.example.com"
            api_key = "from-file"

            [scan.retry]
            max_attempts = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.repository.len(), 2);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.fail_on_findings, Some(true));
        assert_eq!(config.scan.batch_limit, 3);
        assert_eq!(config.scan.flush_interval, Duration::from_millis(250));
        assert_eq!(config.scan.max_chunk_size, 5000);
        assert_eq!(config.scan.ignore.paths, vec!["vendor/**"]);
        assert_eq!(config.scan.ignore.max_file_size, Some(2048));
        assert_eq!(config.scan.detection.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.scan.retry.max_attempts, 4);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = parse_config(Path::new("empty.toml"), "").unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_parse_errors_name_the_file() {
        for contents in ["batch_limit = ", "unknown_key = 1", "[scan]\nbatch_limit = \"five\""] {
            let err = parse_config(Path::new("/etc/phiscan.toml"), contents).unwrap_err();
            assert!(matches!(err, ConfigError::Parse { .. }));
            assert!(err.to_string().contains("/etc/phiscan.toml"), "{}", err);
        }
    }

    #[tokio::test]
    async fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phiscan.toml");
        std::fs::write(&path, "[scan]\ndry_run = true\n").unwrap();

        let (loaded, config) = load_config(Some(&path)).await.unwrap();
        assert_eq!(loaded.as_deref(), Some(path.as_path()));
        assert!(config.scan.dry_run);
    }

    #[tokio::test]
    async fn test_missing_explicit_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/phiscan.toml")))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
        assert!(err.is_user_actionable());
    }
}
