//! Error types for the result store

use crate::core::error_handling::ContextualError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// Rejected at the API boundary; nothing was applied
    #[error("Invalid store request: {0}")]
    Validation(String),

    #[error("No result record with hash {hash}")]
    NotFound { hash: String },

    #[error("Result store lock failed: {0}")]
    Lock(String),
}

impl ContextualError for StoreError {
    fn is_user_actionable(&self) -> bool {
        false
    }

    fn user_message(&self) -> Option<String> {
        None
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
