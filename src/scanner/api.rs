//! Scanner API
//!
//! Public surface of the scanner for the application layer and library users.

// Run management
pub use crate::scanner::manager::ScannerManager;
pub use crate::scanner::report::ScanReport;
pub use crate::scanner::settings::{IgnoreSettings, ScanSettings};

// Error handling
pub use crate::scanner::error::{ScanError, ScanResult};

// Repository access
pub use crate::scanner::walker::{FileEntry, GixRepositoryWalker, RepositoryWalker, TreeEntry};

// Core data types
pub use crate::scanner::types::{DetectionResult, ScanResponse, ScanUnit, UnitMeta};
