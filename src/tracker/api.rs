//! Public API for the state tracker
//!
//! External modules should import from here rather than directly from internal modules.

pub use crate::tracker::error::{TrackerError, TrackerResult};
pub use crate::tracker::key_tracker::KeyTracker;
pub use crate::tracker::outcome::{CommitOutcome, DocumentOutcome, FileOutcome};
pub use crate::tracker::state::{KeyData, ObjectKind, ScanState, TrackerCounts};
pub use crate::tracker::Trackers;
