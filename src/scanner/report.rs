//! Scan Report
//!
//! What a finished scan run hands back to its caller: the per-object outcomes,
//! the findings that were written, and the counters of every tracker.

use crate::core::retry::duration_millis;
use crate::dispatch::DispatchStats;
use crate::store::ResultRecord;
use crate::tracker::{
    CommitOutcome, DocumentOutcome, FileOutcome, ObjectKind, ScanState, TrackerCounts,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub scanner_id: String,
    pub repository_id: String,
    pub repository_path: String,
    /// The repository was already settled in this manager and was not rescanned
    pub skipped: bool,
    pub state: ScanState,
    pub commits: Vec<CommitOutcome>,
    pub files: Vec<FileOutcome>,
    pub documents: Vec<DocumentOutcome>,
    pub findings: Vec<ResultRecord>,
    pub counts: BTreeMap<ObjectKind, TrackerCounts>,
    pub dispatch: DispatchStats,
    /// Non-fatal problems: failed files and commits, failed batches
    pub errors: Vec<String>,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl ScanReport {
    pub(crate) fn new(scanner_id: &str, repository_id: &str, repository_path: &str) -> Self {
        Self {
            scanner_id: scanner_id.to_string(),
            repository_id: repository_id.to_string(),
            repository_path: repository_path.to_string(),
            skipped: false,
            state: ScanState::Init,
            commits: Vec::new(),
            files: Vec::new(),
            documents: Vec::new(),
            findings: Vec::new(),
            counts: BTreeMap::new(),
            dispatch: DispatchStats::default(),
            errors: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// True when any finding was recorded
    pub fn is_dirty(&self) -> bool {
        !self.findings.is_empty()
    }

    pub fn files_in_state(&self, state: ScanState) -> usize {
        self.files.iter().filter(|file| file.state() == state).count()
    }

    pub fn dirty_documents(&self) -> usize {
        self.documents.iter().filter(|doc| doc.dirty).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::types::{DetectionResult, ScanUnit, UnitMeta};
    use crate::tracker::KeyData;

    fn file(state: ScanState) -> FileOutcome {
        FileOutcome {
            data: KeyData::new("repo-1:blob", state, None),
            object_id: "blob".to_string(),
            path: "notes.txt".to_string(),
            commit_id: "c1".to_string(),
            unit_count: 1,
            finding_count: 0,
        }
    }

    #[test]
    fn test_clean_report() {
        let mut report = ScanReport::new("scan-1", "repo-1", "/tmp/repo");
        report.files = vec![file(ScanState::Complete), file(ScanState::Ignore), file(ScanState::Complete)];
        assert!(!report.is_dirty());
        assert_eq!(report.files_in_state(ScanState::Complete), 2);
        assert_eq!(report.files_in_state(ScanState::Error), 0);
    }

    #[test]
    fn test_dirty_report_serialises() {
        let unit = ScanUnit::new(&UnitMeta::new("repo-1", "c1", "blob", "notes.txt"), "Jane Doe", 0).unwrap();
        let result = DetectionResult {
            category: "Person".to_string(),
            subcategory: None,
            text: "Jane Doe".to_string(),
            offset: 0,
            length: 8,
            confidence: 0.97,
            service: "test".to_string(),
        };
        let mut report = ScanReport::new("scan-1", "repo-1", "/tmp/repo");
        report.findings.push(ResultRecord::new(&unit, &result));
        report.duration = Duration::from_millis(1500);
        assert!(report.is_dirty());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["duration"], 1500);
        assert_eq!(json["state"], "init");
        assert_eq!(json["findings"][0]["result"]["category"], "Person");
    }
}
