//! Content-addressed finding records

use crate::scanner::types::{DetectionResult, ScanResponse, ScanUnit};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::SystemTime;

/// A persisted finding, keyed by [`ResultRecord::hash`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub hash: String,
    pub repository_id: String,
    pub commit_id: String,
    pub object_id: String,
    pub path: String,
    pub unit_id: String,
    pub unit_offset: usize,
    /// Character offset of the finding within the whole object
    pub object_offset: usize,
    pub result: DetectionResult,
    pub created_at: SystemTime,
}

impl ResultRecord {
    pub fn new(unit: &ScanUnit, result: &DetectionResult) -> Self {
        let mut record = Self {
            hash: String::new(),
            repository_id: unit.repository_id().to_string(),
            commit_id: unit.commit_id().to_string(),
            object_id: unit.object_id().to_string(),
            path: unit.path().to_string(),
            unit_id: unit.id().to_string(),
            unit_offset: unit.offset(),
            object_offset: unit.offset() + result.offset,
            result: result.clone(),
            created_at: SystemTime::now(),
        };
        record.hash = record.compute_hash();
        record
    }

    /// One record per detection result in `response`
    pub fn from_response(response: &ScanResponse) -> Vec<ResultRecord> {
        response
            .results
            .iter()
            .map(|result| ResultRecord::new(&response.unit, result))
            .collect()
    }

    /// SHA-256 hex digest over the identifying fields of the finding
    ///
    /// Every field is length-prefixed so adjacent fields cannot run together,
    /// and the confidence is hashed by its bit pattern. The offset is the one
    /// within the object, so equal text at the same place in two different
    /// units of one object still hashes apart.
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        let mut field = |bytes: &[u8]| {
            hasher.update((bytes.len() as u64).to_be_bytes());
            hasher.update(bytes);
        };

        field(self.repository_id.as_bytes());
        field(self.commit_id.as_bytes());
        field(self.object_id.as_bytes());
        field(self.result.category.as_bytes());
        field(&self.result.confidence.to_bits().to_be_bytes());
        field(&(self.result.length as u64).to_be_bytes());
        field(&(self.object_offset as u64).to_be_bytes());
        field(self.result.service.as_bytes());
        match &self.result.subcategory {
            Some(subcategory) => {
                field(&[1]);
                field(subcategory.as_bytes());
            }
            None => field(&[0]),
        }
        field(self.result.text.as_bytes());

        format!("{:x}", hasher.finalize())
    }
}
