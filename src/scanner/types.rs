//! Scanner Types
//!
//! Data carried through the scan-and-detect pipeline: the scan unit produced by the
//! chunker, the findings returned by the detection service, and the response that
//! ties the two together.

use crate::core::validation::ValidationError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::SystemTime;

/// Tracker key of a blob within one repository
///
/// Findings belong to a repository, so the same blob in two repositories is
/// scanned and settled once for each.
pub fn file_key(repository_id: &str, object_id: &str) -> String {
    format!("{}:{}", repository_id, object_id)
}

/// Where a piece of text came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMeta {
    pub repository_id: String,
    pub commit_id: String,
    pub object_id: String,
    pub path: String,
}

impl UnitMeta {
    pub fn new(
        repository_id: impl Into<String>,
        commit_id: impl Into<String>,
        object_id: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            repository_id: repository_id.into(),
            commit_id: commit_id.into(),
            object_id: object_id.into(),
            path: path.into(),
        }
    }

    /// Reject metadata with a missing identifier
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [
            ("repository ID", &self.repository_id),
            ("commit ID", &self.commit_id),
            ("object ID", &self.object_id),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::new(format!(
                    "scan unit requires a non-empty {}",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// One bounded piece of source text submitted for detection
///
/// Fields are private so a unit cannot change after the chunker creates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanUnit {
    id: String,
    meta: UnitMeta,
    text: String,
    offset: usize,
    created_at: SystemTime,
}

impl ScanUnit {
    /// Build a unit at `offset` characters into the object
    pub fn new(meta: &UnitMeta, text: impl Into<String>, offset: usize) -> Result<Self, ValidationError> {
        meta.validate()?;
        Ok(Self {
            id: unit_id(meta, offset),
            meta: meta.clone(),
            text: text.into(),
            offset,
            created_at: SystemTime::now(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn meta(&self) -> &UnitMeta {
        &self.meta
    }

    pub fn repository_id(&self) -> &str {
        &self.meta.repository_id
    }

    pub fn commit_id(&self) -> &str {
        &self.meta.commit_id
    }

    pub fn object_id(&self) -> &str {
        &self.meta.object_id
    }

    pub fn path(&self) -> &str {
        &self.meta.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Characters of the object that precede this unit
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Length of the text in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }
}

/// Stable identifier for the unit at `offset` of an object: 16 hex chars of SHA-256
fn unit_id(meta: &UnitMeta, offset: usize) -> String {
    let mut hasher = Sha256::new();
    for field in [&meta.repository_id, &meta.commit_id, &meta.object_id] {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field.as_bytes());
    }
    hasher.update((offset as u64).to_be_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

/// A single entity found by the detection service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub category: String,
    pub subcategory: Option<String>,
    pub text: String,
    /// Character offset within the unit text
    pub offset: usize,
    /// Length in characters
    pub length: usize,
    pub confidence: f64,
    pub service: String,
}

/// Detection output for one unit, correlated back to the unit by ID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResponse {
    pub id: String,
    pub unit: ScanUnit,
    pub results: Vec<DetectionResult>,
    pub redacted_text: Option<String>,
    pub requested_at: SystemTime,
    pub responded_at: SystemTime,
}

impl ScanResponse {
    /// True when the service reported at least one qualifying entity
    pub fn is_dirty(&self) -> bool {
        !self.results.is_empty()
    }

    /// Check that this response belongs to the unit the caller is waiting on
    pub fn verify_for(&self, unit_id: &str) -> Result<(), crate::scanner::error::ScanError> {
        if self.id != unit_id || self.unit.id() != unit_id {
            return Err(crate::scanner::error::ScanError::Correlation {
                expected: unit_id.to_string(),
                actual: self.id.clone(),
            });
        }
        Ok(())
    }
}
