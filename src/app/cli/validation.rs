//! CLI argument validation

use crate::core::validation::ValidationError;
use std::path::Path;

/// Every repository must name an existing directory
pub fn validate_repositories(repositories: &[String]) -> Result<(), ValidationError> {
    for (index, repository) in repositories.iter().enumerate() {
        let trimmed = repository.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::new(format!(
                "Repository at index {} cannot be empty",
                index
            )));
        }
        if trimmed.contains("://") || trimmed.starts_with("git@") {
            return Err(ValidationError::new(format!(
                "Remote repositories are not supported, clone '{}' first",
                trimmed
            )));
        }
        let path = Path::new(trimmed);
        if !path.exists() {
            return Err(ValidationError::new(format!(
                "Repository path does not exist: '{}'",
                trimmed
            )));
        }
        if !path.is_dir() {
            return Err(ValidationError::new(format!(
                "Repository path is not a directory: '{}'",
                trimmed
            )));
        }
    }
    Ok(())
}
