//! Detection service connection settings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_API_VERSION: &str = "2023-04-01";
pub const DEFAULT_MODEL_VERSION: &str = "latest";
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_DOMAIN: &str = "phi";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    pub endpoint: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub language: String,
    pub api_version: String,
    pub model_version: String,
    pub domain: String,
    #[serde(with = "crate::core::retry::duration_millis")]
    pub timeout: Duration,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            language: DEFAULT_LANGUAGE.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            domain: DEFAULT_DOMAIN.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl DetectionSettings {
    /// Full analyze URL for the configured endpoint
    pub fn analyze_url(&self) -> Option<String> {
        self.endpoint.as_ref().map(|endpoint| {
            format!(
                "{}/language/:analyze-text?api-version={}",
                endpoint.trim_end_matches('/'),
                self.api_version
            )
        })
    }

    pub fn has_credentials(&self) -> bool {
        let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());
        present(&self.endpoint) && present(&self.api_key)
    }
}

// The key never reaches log output
impl fmt::Debug for DetectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionSettings")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("language", &self.language)
            .field("api_version", &self.api_version)
            .field("model_version", &self.model_version)
            .field("domain", &self.domain)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Limits the client enforces on every call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientOptions {
    pub confidence_threshold: f64,
    pub batch_limit: usize,
    pub dry_run: bool,
}
