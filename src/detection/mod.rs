//! Detection Client
//!
//! Wraps the external entity-detection service. A [`DetectionClient`] takes a
//! batch of scan units and returns one [`DocumentResult`] per analysed unit,
//! keyed by unit ID, holding only the entities at or above the confidence
//! threshold. A unit the service did not analyse has no entry at all.
//!
//! [`LanguageServiceClient`] talks to the hosted language service over HTTPS with
//! `reqwest`. It does not retry; the orchestrator decides whether a failed object
//! is worth resubmitting.

pub mod client;
mod error;
pub mod payload;
mod settings;

#[cfg(test)]
mod tests;

pub use client::{LanguageServiceClient, SERVICE_NAME};
pub use error::DetectionError;
pub use settings::{ClientOptions, DetectionSettings};

use crate::scanner::types::{DetectionResult, ScanUnit};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Detection output for one submitted unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentResult {
    pub id: String,
    pub redacted_text: Option<String>,
    pub results: Vec<DetectionResult>,
}

impl DocumentResult {
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            redacted_text: None,
            results: Vec::new(),
        }
    }
}

/// A service that finds sensitive entities in text
#[async_trait]
pub trait DetectionClient: Send + Sync {
    /// Analyse `units` as one request
    ///
    /// Units the service failed to analyse are absent from the output.
    async fn detect(&self, units: &[ScanUnit]) -> Result<Vec<DocumentResult>, DetectionError>;

    /// Identifier recorded on every result this client produces
    fn service_name(&self) -> &str;
}
