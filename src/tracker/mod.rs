//! State Tracker
//!
//! Concurrency-safe lifecycle bookkeeping for every object a scan touches. Each
//! object kind (repository, commit, file, document) gets its own [`KeyTracker`],
//! and the four are grouped in [`Trackers`] so the orchestrator can gate work on
//! any of them.
//!
//! States only ever move upward:
//!
//! ```text
//! init(0) < error(1) < ignore(2) < pending(3) < complete(4)
//! ```
//!
//! A late, lower update (say a retry reporting `error` after another worker
//! completed the same blob) is absorbed and the higher state is returned.

pub mod api;
mod error;
mod key_tracker;
mod outcome;
mod state;

#[cfg(test)]
mod tests;

pub use error::{TrackerError, TrackerResult};
pub use key_tracker::KeyTracker;
pub use outcome::{CommitOutcome, DocumentOutcome, FileOutcome};
pub use state::{KeyData, ObjectKind, ScanState, TrackerCounts};

use std::collections::BTreeMap;

/// One tracker per object kind
#[derive(Debug)]
pub struct Trackers {
    pub repositories: KeyTracker,
    pub commits: KeyTracker,
    pub files: KeyTracker,
    pub documents: KeyTracker,
}

impl Default for Trackers {
    fn default() -> Self {
        Self::new()
    }
}

impl Trackers {
    pub fn new() -> Self {
        Self {
            repositories: KeyTracker::new(ObjectKind::Repository),
            commits: KeyTracker::new(ObjectKind::Commit),
            files: KeyTracker::new(ObjectKind::File),
            documents: KeyTracker::new(ObjectKind::Document),
        }
    }

    pub fn for_kind(&self, kind: ObjectKind) -> &KeyTracker {
        match kind {
            ObjectKind::Repository => &self.repositories,
            ObjectKind::Commit => &self.commits,
            ObjectKind::File => &self.files,
            ObjectKind::Document => &self.documents,
        }
    }

    /// Register `key` with the tracker for `kind` and report whether it is
    /// already past `init`
    pub fn should_skip(&self, kind: ObjectKind, key: &str) -> TrackerResult<bool> {
        self.for_kind(kind).should_skip(key)
    }

    pub fn counts(&self) -> TrackerResult<BTreeMap<ObjectKind, TrackerCounts>> {
        let mut counts = BTreeMap::new();
        for tracker in [
            &self.repositories,
            &self.commits,
            &self.files,
            &self.documents,
        ] {
            counts.insert(tracker.kind(), tracker.counts()?);
        }
        Ok(counts)
    }
}
