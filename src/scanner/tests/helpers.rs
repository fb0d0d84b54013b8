//! Test helpers for scanner unit tests
//!
//! An in-memory walker and scripted detection clients, so the run loop can be
//! exercised without a repository on disk or a network. Integration tests against
//! real git repositories live under tests/.

use crate::core::retry::RetryPolicy;
use crate::detection::client::parse_response;
use crate::detection::{DetectionClient, DetectionError, DocumentResult};
use crate::scanner::error::{ScanError, ScanResult};
use crate::scanner::manager::ScannerManager;
use crate::scanner::settings::ScanSettings;
use crate::scanner::types::{file_key, DetectionResult, ScanUnit};
use crate::scanner::walker::{FileEntry, RepositoryWalker, TreeEntry};
use crate::store::MemoryResultStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const NAME: &str = "Jane Doe";

/// Walker over commits held in memory, newest first
#[derive(Debug, Clone, Default)]
pub struct MemoryWalker {
    commits: Vec<(String, Vec<TreeEntry>)>,
    blobs: HashMap<String, Vec<u8>>,
    broken_trees: Vec<String>,
    fail_history: bool,
}

impl MemoryWalker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a commit whose tree holds `files` as (blob ID, path, content)
    pub fn commit(mut self, commit: &str, files: &[(&str, &str, &[u8])]) -> Self {
        let mut tree = Vec::new();
        for (object_id, path, data) in files {
            self.blobs.insert(object_id.to_string(), data.to_vec());
            tree.push(TreeEntry {
                object_id: object_id.to_string(),
                path: path.to_string(),
            });
        }
        self.commits.push((commit.to_string(), tree));
        self
    }

    /// Make reading the tree of `commit` fail
    pub fn broken_tree(mut self, commit: &str) -> Self {
        self.broken_trees.push(commit.to_string());
        self
    }

    /// Make listing the history fail
    pub fn failing_history(mut self) -> Self {
        self.fail_history = true;
        self
    }

    pub fn boxed(self) -> Box<dyn RepositoryWalker> {
        Box::new(self)
    }
}

impl RepositoryWalker for MemoryWalker {
    fn commits(&self) -> ScanResult<Vec<String>> {
        if self.fail_history {
            return Err(ScanError::Repository {
                message: "Failed to resolve HEAD: reference not found".to_string(),
            });
        }
        Ok(self.commits.iter().map(|(id, _)| id.clone()).collect())
    }

    fn tree(&self, commit: &str) -> ScanResult<Vec<TreeEntry>> {
        if self.broken_trees.iter().any(|broken| broken == commit) {
            return Err(ScanError::Repository {
                message: format!("Failed to read tree of {}: object missing", commit),
            });
        }
        self.commits
            .iter()
            .find(|(id, _)| id == commit)
            .map(|(_, tree)| tree.clone())
            .ok_or_else(|| ScanError::Repository {
                message: format!("Failed to find commit {}", commit),
            })
    }

    fn blob(&self, entry: &TreeEntry) -> ScanResult<FileEntry> {
        let data = self.blobs.get(&entry.object_id).cloned().unwrap_or_default();
        Ok(FileEntry::new(entry.object_id.clone(), entry.path.clone(), data))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One "Person" finding per occurrence of [`NAME`]
    Find,
    /// Every call fails with a transport error
    Fail,
    /// Every call after the first fails
    FailAfterFirst,
    /// First call fails, later calls find
    FailFirst,
    /// Never answers
    Hang,
    /// The service reports every unit of this blob as an error and analyses the rest
    Reject(&'static str),
}

/// Detection client with a fixed behaviour that records every batch
pub struct ScriptedClient {
    mode: Mode,
    calls: AtomicUsize,
    batches: Mutex<Vec<Vec<ScanUnit>>>,
}

impl ScriptedClient {
    pub fn new(mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            calls: AtomicUsize::new(0),
            batches: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> Vec<Vec<ScanUnit>> {
        self.batches.lock().unwrap().clone()
    }
}

/// Character offsets of every occurrence of `needle` in `text`
fn char_offsets(text: &str, needle: &str) -> Vec<usize> {
    text.match_indices(needle)
        .map(|(byte_offset, _)| text[..byte_offset].chars().count())
        .collect()
}

fn find(units: &[ScanUnit]) -> Vec<DocumentResult> {
    units
        .iter()
        .map(|unit| {
            let mut document = DocumentResult::empty(unit.id());
            for offset in char_offsets(unit.text(), NAME) {
                document.results.push(DetectionResult {
                    category: "Person".to_string(),
                    subcategory: None,
                    text: NAME.to_string(),
                    offset,
                    length: NAME.chars().count(),
                    confidence: 0.97,
                    service: "scripted".to_string(),
                });
            }
            document
        })
        .collect()
}

/// Build a service response body for `units` and decode it the way the live
/// client does
fn reject(units: &[ScanUnit], object_id: &str) -> Result<Vec<DocumentResult>, DetectionError> {
    let (rejected, analysed): (Vec<&ScanUnit>, Vec<&ScanUnit>) =
        units.iter().partition(|unit| unit.object_id() == object_id);
    let documents: Vec<serde_json::Value> = analysed
        .iter()
        .map(|unit| {
            let entities: Vec<serde_json::Value> = char_offsets(unit.text(), NAME)
                .into_iter()
                .map(|offset| {
                    serde_json::json!({
                        "text": NAME,
                        "category": "Person",
                        "offset": offset,
                        "length": NAME.chars().count(),
                        "confidenceScore": 0.97
                    })
                })
                .collect();
            serde_json::json!({"id": unit.id(), "entities": entities})
        })
        .collect();
    let errors: Vec<serde_json::Value> = rejected
        .iter()
        .map(|unit| {
            serde_json::json!({
                "id": unit.id(),
                "error": {"code": "InvalidDocument", "message": "Document text is empty."}
            })
        })
        .collect();
    let body = serde_json::json!({"results": {"documents": documents, "errors": errors}}).to_string();
    parse_response(&body, units, 0.8, "scripted")
}

#[async_trait]
impl DetectionClient for ScriptedClient {
    async fn detect(&self, units: &[ScanUnit]) -> Result<Vec<DocumentResult>, DetectionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().unwrap().push(units.to_vec());

        let failure = DetectionError::Transport {
            message: "connection refused".to_string(),
        };
        match self.mode {
            Mode::Find => Ok(find(units)),
            Mode::Fail => Err(failure),
            Mode::FailAfterFirst if call > 0 => Err(failure),
            Mode::FailAfterFirst => Ok(find(units)),
            Mode::FailFirst if call == 0 => Err(failure),
            Mode::FailFirst => Ok(find(units)),
            Mode::Hang => std::future::pending().await,
            Mode::Reject(object_id) => reject(units, object_id),
        }
    }

    fn service_name(&self) -> &str {
        "scripted"
    }
}

/// Dry-run settings with a short flush interval and a quick retry
pub fn test_settings() -> ScanSettings {
    ScanSettings {
        dry_run: true,
        flush_interval: Duration::from_millis(20),
        retry: RetryPolicy {
            max_attempts: 2,
            delay: Duration::from_millis(5),
        },
        ..ScanSettings::default()
    }
}

pub fn manager_with(settings: ScanSettings, client: Arc<ScriptedClient>) -> ScannerManager {
    ScannerManager::new(settings, client, Arc::new(MemoryResultStore::new())).unwrap()
}

pub fn manager(client: Arc<ScriptedClient>) -> ScannerManager {
    manager_with(test_settings(), client)
}

/// File tracker key of `object_id` in the repository at `path`
pub fn blob_key(manager: &ScannerManager, path: &str, object_id: &str) -> String {
    let repository_id = manager.generate_repository_id(&manager.normalise_repository_path(path));
    file_key(&repository_id, object_id)
}

/// `lines` lines of 100 characters each, newline included, with [`NAME`] at the
/// start of the first line
pub fn text_of_lines(lines: usize) -> String {
    let mut text = String::new();
    for index in 0..lines {
        let line = if index == 0 {
            format!("{} {}", NAME, "x".repeat(99 - NAME.len() - 1))
        } else {
            "y".repeat(99)
        };
        text.push_str(&line);
        text.push('\n');
    }
    text
}
