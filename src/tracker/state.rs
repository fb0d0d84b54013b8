//! Lifecycle states and tracked object kinds

use super::error::TrackerError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

/// Lifecycle of a tracked object, ordered from lowest to highest
///
/// `Init` is the default for a newly observed object and `Complete` is terminal.
/// A tracker never moves an object to a lower state.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ScanState {
    Init = 0,
    Error = 1,
    Ignore = 2,
    Pending = 3,
    Complete = 4,
}

impl ScanState {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Map a raw lifecycle code back to a state
    pub fn from_code(code: u8) -> Option<ScanState> {
        ScanState::iter().find(|state| state.code() == code)
    }
}

impl TryFrom<u8> for ScanState {
    type Error = TrackerError;

    fn try_from(code: u8) -> Result<ScanState, TrackerError> {
        ScanState::from_code(code).ok_or(TrackerError::InvalidCode { code })
    }
}

impl Default for ScanState {
    fn default() -> Self {
        ScanState::Init
    }
}

/// The kinds of object a scan tracks, one tracker each
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Repository,
    Commit,
    File,
    Document,
}

/// Lifecycle record for one tracked key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyData {
    pub key: String,
    pub state: ScanState,
    pub message: Option<String>,
    pub first_seen: SystemTime,
    pub last_updated: SystemTime,
}

impl KeyData {
    pub(crate) fn new(key: &str, state: ScanState, message: Option<String>) -> Self {
        let now = SystemTime::now();
        Self {
            key: key.to_string(),
            state,
            message,
            first_seen: now,
            last_updated: now,
        }
    }

    pub fn code(&self) -> u8 {
        self.state.code()
    }
}

/// Number of keys in each state; every state is present, zero when unused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerCounts(BTreeMap<ScanState, usize>);

impl Default for TrackerCounts {
    fn default() -> Self {
        Self(ScanState::iter().map(|state| (state, 0)).collect())
    }
}

impl TrackerCounts {
    pub(crate) fn increment(&mut self, state: ScanState) {
        *self.0.entry(state).or_insert(0) += 1;
    }

    pub fn get(&self, state: ScanState) -> usize {
        self.0.get(&state).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScanState, usize)> + '_ {
        self.0.iter().map(|(state, count)| (*state, *count))
    }
}

impl fmt::Display for TrackerCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(state, count)| format!("{}={}", state, count))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}
