//! Common test utilities and helpers
//!
//! Git fixtures built with the `git` command line in a temporary directory, and
//! a detection client that reports every occurrence of one name.

#![allow(dead_code)]

use async_trait::async_trait;
use phiscan::detection::{DetectionClient, DetectionError, DocumentResult};
use phiscan::scanner::{DetectionResult, ScanUnit};
use std::path::Path;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

pub const NAME: &str = "Jane Doe";

fn git(repo: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A throwaway repository with a configured identity
pub struct GitFixture {
    pub dir: TempDir,
}

impl GitFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        git(dir.path(), &["init"]);
        git(dir.path(), &["config", "user.name", "Test User"]);
        git(dir.path(), &["config", "user.email", "test@example.com"]);
        git(dir.path(), &["config", "commit.gpgsign", "false"]);
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn path_str(&self) -> String {
        self.dir.path().to_string_lossy().to_string()
    }

    pub fn write(&self, path: &str, content: &[u8]) -> &Self {
        let full = self.dir.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
        self
    }

    /// Stage everything and commit; returns the commit ID
    pub fn commit(&self, message: &str) -> String {
        git(self.path(), &["add", "-A"]);
        git(self.path(), &["commit", "-m", message]);
        git(self.path(), &["rev-parse", "HEAD"])
    }
}

/// `lines` lines of 100 characters, the first starting with [`NAME`]
pub fn text_of_lines(lines: usize) -> String {
    let mut text = String::new();
    for index in 0..lines {
        let prefix = if index == 0 { NAME } else { "" };
        let line = format!("{}{}", prefix, "x".repeat(99 - prefix.len()));
        text.push_str(&line);
        text.push('\n');
    }
    text
}

/// Reports a `Person` for every occurrence of [`NAME`]
#[derive(Default)]
pub struct NameFinder {
    calls: AtomicUsize,
}

impl NameFinder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DetectionClient for NameFinder {
    async fn detect(&self, units: &[ScanUnit]) -> Result<Vec<DocumentResult>, DetectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(units
            .iter()
            .map(|unit| {
                let mut document = DocumentResult::empty(unit.id());
                for (byte_offset, _) in unit.text().match_indices(NAME) {
                    document.results.push(DetectionResult {
                        category: "Person".to_string(),
                        subcategory: None,
                        text: NAME.to_string(),
                        offset: unit.text()[..byte_offset].chars().count(),
                        length: NAME.chars().count(),
                        confidence: 0.95,
                        service: self.service_name().to_string(),
                    });
                }
                document
            })
            .collect())
    }

    fn service_name(&self) -> &str {
        "name-finder"
    }
}
