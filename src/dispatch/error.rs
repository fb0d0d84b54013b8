//! Dispatcher Error Types

use crate::detection::DetectionError;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("batch limit must be at least 1")]
    InvalidLimit,

    #[error("unit {id} is already in the current batch")]
    DuplicateUnit { id: String },

    #[error("batch is full ({limit} units)")]
    BatchFull { limit: usize },

    /// The detection call for a whole batch failed; its units were released
    #[error("detection failed for a batch of {units} units: {source}")]
    Detection {
        units: usize,
        #[source]
        source: DetectionError,
    },

    #[error("dispatcher cancelled")]
    Cancelled,
}

pub type DispatchResult<T> = Result<T, DispatchError>;
