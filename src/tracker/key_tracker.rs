//! Monotonic per-key lifecycle tracker

use super::error::{TrackerError, TrackerResult};
use super::state::{KeyData, ObjectKind, ScanState, TrackerCounts};
use crate::core::sync::{read_guard, write_guard};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::SystemTime;

/// Tracks the lifecycle state of every key of one object kind
///
/// Updates are serialised by a single lock, so concurrent callers racing on the
/// same key always converge on the highest state any of them requested.
#[derive(Debug)]
pub struct KeyTracker {
    kind: ObjectKind,
    keys: RwLock<HashMap<String, KeyData>>,
}

impl KeyTracker {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            keys: RwLock::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Record `state` for `key` and return the state now held
    ///
    /// An unseen key is inserted as given. A lower state than the current one is
    /// ignored, an equal state refreshes the message and timestamp, and a higher
    /// state replaces both.
    pub fn update(&self, key: &str, state: ScanState, message: &str) -> TrackerResult<ScanState> {
        if key.is_empty() {
            return Err(TrackerError::EmptyKey { kind: self.kind });
        }
        let message = (!message.is_empty()).then(|| message.to_string());

        let mut keys = write_guard(self.keys.write(), |e| self.lock_error(e))?;
        let current = match keys.entry(key.to_string()) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => {
                slot.insert(KeyData::new(key, state, message));
                log::trace!("{} {}: new -> {}", self.kind, key, state);
                return Ok(state);
            }
        };

        if state < current.state {
            log::trace!(
                "{} {}: ignoring {} (already {})",
                self.kind,
                key,
                state,
                current.state
            );
            return Ok(current.state);
        }

        if state > current.state {
            log::trace!("{} {}: {} -> {}", self.kind, key, current.state, state);
        }
        current.state = state;
        current.message = message;
        current.last_updated = SystemTime::now();
        Ok(current.state)
    }

    /// Same as [`KeyTracker::update`] but takes the raw lifecycle code
    pub fn update_code(&self, key: &str, code: u8, message: &str) -> TrackerResult<ScanState> {
        let state = ScanState::try_from(code)?;
        self.update(key, state, message)
    }

    /// Current record for `key`, if it has ever been seen
    pub fn get(&self, key: &str) -> TrackerResult<Option<KeyData>> {
        let keys = read_guard(self.keys.read(), |e| self.lock_error(e))?;
        Ok(keys.get(key).cloned())
    }

    /// Current state for `key`, `None` when unseen
    pub fn state(&self, key: &str) -> TrackerResult<Option<ScanState>> {
        let keys = read_guard(self.keys.read(), |e| self.lock_error(e))?;
        Ok(keys.get(key).map(|data| data.state))
    }

    /// Register `key` as seen and report whether work on it should be skipped
    ///
    /// Anything above `Init` has already been settled or is in flight.
    pub fn should_skip(&self, key: &str) -> TrackerResult<bool> {
        Ok(self.update(key, ScanState::Init, "")? > ScanState::Init)
    }

    pub fn counts(&self) -> TrackerResult<TrackerCounts> {
        let keys = read_guard(self.keys.read(), |e| self.lock_error(e))?;
        let mut counts = TrackerCounts::default();
        for data in keys.values() {
            counts.increment(data.state);
        }
        Ok(counts)
    }

    pub fn len(&self) -> TrackerResult<usize> {
        let keys = read_guard(self.keys.read(), |e| self.lock_error(e))?;
        Ok(keys.len())
    }

    pub fn is_empty(&self) -> TrackerResult<bool> {
        Ok(self.len()? == 0)
    }

    /// All records, ordered by key
    pub fn snapshot(&self) -> TrackerResult<Vec<KeyData>> {
        let keys = read_guard(self.keys.read(), |e| self.lock_error(e))?;
        let mut records: Vec<KeyData> = keys.values().cloned().collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(records)
    }

    fn lock_error(&self, message: String) -> TrackerError {
        TrackerError::Lock {
            kind: self.kind,
            message,
        }
    }
}
