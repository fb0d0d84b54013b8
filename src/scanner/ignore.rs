//! Ignore policy for blobs that should not be submitted

use crate::core::validation::{validate_extension, validate_glob_pattern, ValidationError};
use crate::scanner::settings::IgnoreSettings;
use crate::scanner::walker::FileEntry;
use glob::{MatchOptions, Pattern};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct IgnorePolicy {
    paths: Vec<Pattern>,
    filenames: HashSet<String>,
    extensions: HashSet<String>,
    max_file_size: Option<u64>,
}

impl IgnorePolicy {
    pub fn new(settings: &IgnoreSettings) -> Result<Self, ValidationError> {
        let paths = settings
            .paths
            .iter()
            .map(|pattern| {
                validate_glob_pattern(pattern)?;
                Pattern::new(pattern).map_err(|e| ValidationError::new(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let extensions = settings
            .extensions
            .iter()
            .map(|ext| validate_extension(ext))
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(Self {
            paths,
            filenames: settings.filenames.iter().map(|n| n.trim().to_string()).collect(),
            extensions,
            max_file_size: settings.max_file_size,
        })
    }

    /// The reason `entry` should be ignored, or `None` to scan it
    pub fn check(&self, entry: &FileEntry) -> Option<String> {
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        if let Some(pattern) = self
            .paths
            .iter()
            .find(|pattern| pattern.matches_with(&entry.path, options))
        {
            return Some(format!("path matches '{}'", pattern.as_str()));
        }

        let file_name = entry.file_name();
        if self.filenames.contains(file_name) {
            return Some(format!("ignored filename '{}'", file_name));
        }
        if let Some((_, ext)) = file_name.rsplit_once('.') {
            let ext = ext.to_lowercase();
            if self.extensions.contains(&ext) {
                return Some(format!("ignored extension '{}'", ext));
            }
        }

        if entry.size == 0 {
            return Some("empty".to_string());
        }
        if let Some(limit) = self.max_file_size {
            if entry.size > limit {
                return Some(format!("{} bytes exceeds the {} byte limit", entry.size, limit));
            }
        }
        if entry.is_binary {
            return Some("binary".to_string());
        }
        None
    }
}
