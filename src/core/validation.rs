//! Validation helpers for settings and CLI values

/// A rejected setting or argument value
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl crate::core::error_handling::ContextualError for ValidationError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<String> {
        Some(self.message.clone())
    }
}

/// Validate a count that must be at least one
pub fn validate_positive(name: &str, value: usize) -> Result<usize, ValidationError> {
    if value == 0 {
        return Err(ValidationError::new(format!(
            "{} must be greater than 0",
            name
        )));
    }
    Ok(value)
}

/// Validate a confidence threshold in the closed range [0.0, 1.0]
pub fn validate_confidence(value: f64) -> Result<f64, ValidationError> {
    if !(0.0..=1.0).contains(&value) || value.is_nan() {
        return Err(ValidationError::new(format!(
            "confidence threshold must be between 0.0 and 1.0, got {}",
            value
        )));
    }
    Ok(value)
}

/// Normalise a file extension: strip a leading dot and lowercase
pub fn validate_extension(ext: &str) -> Result<String, ValidationError> {
    let cleaned = ext.trim().strip_prefix('.').unwrap_or(ext.trim());

    if cleaned.is_empty() {
        return Err(ValidationError::new("Extension cannot be empty"));
    }
    if cleaned.contains('/') || cleaned.contains('\\') {
        return Err(ValidationError::new(format!(
            "Extension '{}' cannot contain path separators",
            ext
        )));
    }

    Ok(cleaned.to_lowercase())
}

/// Validate glob pattern syntax used for ignored paths
pub fn validate_glob_pattern(pattern: &str) -> Result<String, ValidationError> {
    if pattern.starts_with('/') {
        return Err(ValidationError::new(format!(
            "Absolute paths are not supported in path patterns: '{}'",
            pattern
        )));
    }
    glob::Pattern::new(pattern)
        .map(|_| pattern.to_string())
        .map_err(|e| ValidationError::new(format!("Invalid glob pattern '{}': {}", pattern, e)))
}

/// Split comma-separated entries, trim them, drop empties and duplicates
///
/// Order of first occurrence is kept.
pub fn split_and_collect(values: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter(|part| seen.insert(part.to_string()))
        .map(str::to_string)
        .collect()
}
