//! Scanner Error Types

use crate::chunker::ChunkError;
use crate::core::validation::ValidationError;
use crate::dispatch::DispatchError;
use crate::store::StoreError;
use crate::tracker::TrackerError;

/// Errors raised while scanning a repository
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Repository could not be opened or its history could not be read
    #[error("Repository error: {message}")]
    Repository { message: String },

    /// A blocking task failed or an IO operation failed
    #[error("IO error: {message}")]
    Io { message: String },

    /// Invalid settings detected before scanning started
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A response arrived for a different unit than the one waited on
    #[error("Correlation error: expected response for unit {expected}, got {actual}")]
    Correlation { expected: String, actual: String },

    /// Units of an object were released without a detection result
    #[error("Detection incomplete for object {object_id}: {missing} of {total} units returned no result")]
    Incomplete {
        object_id: String,
        missing: usize,
        total: usize,
    },

    #[error("Chunking failed: {0}")]
    Chunk(#[from] ChunkError),

    #[error("Dispatcher failed: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("Result store error: {0}")]
    Store(#[from] StoreError),

    /// Another run in the same manager is scanning this repository
    #[error("Repository {repository_id} is already being scanned")]
    AlreadyScanning { repository_id: String },

    #[error("Scan cancelled")]
    Cancelled,
}

impl crate::core::error_handling::ContextualError for ScanError {
    fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            ScanError::Configuration { .. } | ScanError::Validation(_) | ScanError::Repository { .. }
        )
    }

    fn user_message(&self) -> Option<String> {
        match self {
            ScanError::Configuration { message } | ScanError::Repository { message } => {
                Some(message.clone())
            }
            ScanError::Validation(err) => Some(err.message.clone()),
            _ => None,
        }
    }
}

pub type ScanResult<T> = Result<T, ScanError>;
