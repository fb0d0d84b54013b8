//! Tracker Error Types

use super::state::ObjectKind;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrackerError {
    #[error("{kind} tracker: key must not be empty")]
    EmptyKey { kind: ObjectKind },

    #[error("invalid lifecycle code {code}")]
    InvalidCode { code: u8 },

    #[error("{kind} tracker: {message}")]
    Lock { kind: ObjectKind, message: String },
}

pub type TrackerResult<T> = Result<T, TrackerError>;
