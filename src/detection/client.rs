//! Language service PII client

use super::error::DetectionError;
use super::payload::{assemble_documents, AnalyzeRequest, AnalyzeResponse};
use super::settings::{ClientOptions, DetectionSettings};
use super::{DetectionClient, DocumentResult};
use crate::scanner::types::ScanUnit;
use async_trait::async_trait;

pub const SERVICE_NAME: &str = "language-pii";
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Client for the hosted language service PII endpoint
///
/// In dry-run mode no request is ever built or sent and every unit comes back
/// with an empty result.
#[derive(Debug)]
pub struct LanguageServiceClient {
    http: reqwest::Client,
    settings: DetectionSettings,
    options: ClientOptions,
    url: String,
}

impl LanguageServiceClient {
    pub fn new(settings: DetectionSettings, options: ClientOptions) -> Result<Self, DetectionError> {
        if options.batch_limit == 0 {
            return Err(DetectionError::Configuration {
                message: "batch limit must be at least 1".to_string(),
            });
        }

        let url = if options.dry_run {
            settings.analyze_url().unwrap_or_default()
        } else {
            if !settings.has_credentials() {
                return Err(DetectionError::Configuration {
                    message: "detection endpoint and API key are required unless --dry-run is set"
                        .to_string(),
                });
            }
            let url = settings.analyze_url().unwrap_or_default();
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(DetectionError::Configuration {
                    message: format!(
                        "Invalid endpoint scheme. Only http:// and https:// are supported: {}",
                        url
                    ),
                });
            }
            url
        };

        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| DetectionError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            settings,
            options,
            url,
        })
    }

    async fn analyze(&self, units: &[ScanUnit]) -> Result<String, DetectionError> {
        let api_key = self.settings.api_key.as_deref().unwrap_or_default();
        let response = self
            .http
            .post(&self.url)
            .header(SUBSCRIPTION_KEY_HEADER, api_key)
            .json(&AnalyzeRequest::new(units, &self.settings))
            .send()
            .await
            .map_err(|e| DetectionError::Transport {
                message: format!("Network request failed: {}", e),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| DetectionError::Transport {
            message: format!("Failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown error");
            let detail: String = body.chars().take(200).collect();
            return Err(DetectionError::Status {
                status: status.as_u16(),
                message: if detail.is_empty() {
                    reason.to_string()
                } else {
                    format!("{} - {}", reason, detail)
                },
            });
        }
        Ok(body)
    }
}

/// Decode a response body and map it back onto `units`
pub fn parse_response(
    body: &str,
    units: &[ScanUnit],
    threshold: f64,
    service: &str,
) -> Result<Vec<DocumentResult>, DetectionError> {
    let response: AnalyzeResponse =
        serde_json::from_str(body).map_err(|e| DetectionError::Decode {
            message: e.to_string(),
        })?;
    Ok(assemble_documents(units, response, threshold, service))
}

#[async_trait]
impl DetectionClient for LanguageServiceClient {
    async fn detect(&self, units: &[ScanUnit]) -> Result<Vec<DocumentResult>, DetectionError> {
        if units.is_empty() {
            return Ok(Vec::new());
        }
        if units.len() > self.options.batch_limit {
            return Err(DetectionError::Validation {
                message: format!(
                    "{} documents exceed the batch limit of {}",
                    units.len(),
                    self.options.batch_limit
                ),
            });
        }

        if self.options.dry_run {
            log::debug!("{}: dry run, skipping {} documents", SERVICE_NAME, units.len());
            return Ok(units
                .iter()
                .map(|unit| DocumentResult::empty(unit.id()))
                .collect());
        }

        log::debug!("{}: analysing {} documents", SERVICE_NAME, units.len());
        let body = self.analyze(units).await?;
        parse_response(&body, units, self.options.confidence_threshold, SERVICE_NAME)
    }

    fn service_name(&self) -> &str {
        SERVICE_NAME
    }
}
