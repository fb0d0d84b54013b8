//! Detection Client Error Types

use crate::core::error_handling::ContextualError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DetectionError {
    /// Missing or unusable client configuration, raised before any scanning
    #[error("Detection service configuration error: {message}")]
    Configuration { message: String },

    /// The request was rejected before it was sent
    #[error("Invalid detection request: {message}")]
    Validation { message: String },

    #[error("Detection request failed: {message}")]
    Transport { message: String },

    #[error("Detection service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Could not decode detection response: {message}")]
    Decode { message: String },
}

impl ContextualError for DetectionError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, DetectionError::Configuration { .. })
    }

    fn user_message(&self) -> Option<String> {
        match self {
            DetectionError::Configuration { message } => Some(message.clone()),
            _ => None,
        }
    }
}
