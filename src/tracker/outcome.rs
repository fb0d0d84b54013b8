//! Per-kind outcome records
//!
//! Each record embeds the tracker's [`KeyData`] for the object and adds the fields
//! that only make sense for that kind.

use super::state::{KeyData, ScanState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitOutcome {
    #[serde(flatten)]
    pub data: KeyData,
    pub file_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileOutcome {
    #[serde(flatten)]
    pub data: KeyData,
    pub object_id: String,
    pub path: String,
    pub commit_id: String,
    pub unit_count: usize,
    pub finding_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentOutcome {
    #[serde(flatten)]
    pub data: KeyData,
    pub object_id: String,
    pub dirty: bool,
}

impl CommitOutcome {
    pub fn state(&self) -> ScanState {
        self.data.state
    }
}

impl FileOutcome {
    pub fn state(&self) -> ScanState {
        self.data.state
    }
}

impl DocumentOutcome {
    pub fn state(&self) -> ScanState {
        self.data.state
    }
}
