//! Chunker Error Types

use crate::core::validation::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    #[error("max chunk size must be at least 1 character")]
    InvalidChunkSize,

    #[error("failed to read object {object_id}: {message}")]
    Io { object_id: String, message: String },

    #[error("object {object_id} is not valid UTF-8 text")]
    InvalidEncoding { object_id: String },

    /// The object had content but no unit came out of it
    #[error("object {object_id} has content but produced no scan units")]
    ChunkFileFailed { object_id: String },

    #[error("invalid scan unit: {0}")]
    InvalidUnit(#[from] ValidationError),
}

pub type ChunkResult<T> = Result<T, ChunkError>;
