//! Scanner Component
//!
//! Drives a scan run over one repository: walks its history, gates every commit
//! and blob on the state trackers, applies the ignore policy, chunks the remaining
//! blobs into scan units, and feeds them through the batch dispatcher. Findings go
//! to the result store and every object ends up settled in its tracker.
//!
//! ## Components
//!
//! - **ScannerManager**: shared collaborators and SHA-256 repository IDs
//! - **ScannerTask**: the run loop for a single repository
//! - **RepositoryWalker**: commit and tree access, backed by gix
//! - **IgnorePolicy**: binary, empty, oversize and excluded files
//! - **ScanReport**: per-object outcomes and findings of a finished run

pub mod api;
pub mod error;
pub mod ignore;
pub mod manager;
pub mod report;
pub mod settings;
pub mod task;
pub mod types;
pub mod walker;

#[cfg(test)]
mod tests;

pub use error::{ScanError, ScanResult};
pub use manager::ScannerManager;
pub use report::ScanReport;
pub use settings::{IgnoreSettings, ScanSettings};
pub use task::{ScanContext, ScannerTask, WalkedCommit};
pub use types::{DetectionResult, ScanResponse, ScanUnit, UnitMeta};
pub use walker::{FileEntry, GixRepositoryWalker, RepositoryWalker, TreeEntry};
