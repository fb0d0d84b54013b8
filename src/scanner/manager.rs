//! Scanner Manager
//!
//! Owns the collaborators shared by every scan run (settings, detection client,
//! trackers, result store) and starts one [`ScannerTask`] per repository, each
//! identified by a SHA-256 of the normalised repository path.

use crate::core::shutdown::ShutdownCoordinator;
use crate::core::sync::write_guard;
use crate::detection::{DetectionClient, LanguageServiceClient};
use crate::scanner::error::{ScanError, ScanResult};
use crate::scanner::ignore::IgnorePolicy;
use crate::scanner::report::ScanReport;
use crate::scanner::settings::ScanSettings;
use crate::scanner::task::{ScanContext, ScannerTask};
use crate::scanner::walker::{GixRepositoryWalker, RepositoryWalker};
use crate::store::{MemoryResultStore, ResultStore};
use crate::tracker::Trackers;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Length of the hex repository ID
pub const REPOSITORY_ID_LEN: usize = 16;

pub struct ScannerManager {
    context: ScanContext,
    /// Repository IDs with a run in progress
    active: RwLock<HashSet<String>>,
}

/// Removes a repository from the active set when its run ends
struct ActiveScan<'a> {
    active: &'a RwLock<HashSet<String>>,
    repository_id: String,
}

impl Drop for ActiveScan<'_> {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.write() {
            active.remove(&self.repository_id);
        }
    }
}

impl ScannerManager {
    /// Create a manager with an explicit client and store
    pub fn new(
        settings: ScanSettings,
        client: Arc<dyn DetectionClient>,
        store: Arc<dyn ResultStore>,
    ) -> ScanResult<Self> {
        settings.validate()?;
        let ignore = IgnorePolicy::new(&settings.ignore)?;
        Ok(Self {
            context: ScanContext {
                settings: Arc::new(settings),
                client,
                trackers: Arc::new(Trackers::new()),
                store,
                ignore: Arc::new(ignore),
            },
            active: RwLock::new(HashSet::new()),
        })
    }

    /// Create a manager talking to the configured language service, with an
    /// in-memory result store
    pub fn from_settings(settings: ScanSettings) -> ScanResult<Self> {
        settings.validate()?;
        let client = LanguageServiceClient::new(settings.detection.clone(), settings.client_options())
            .map_err(|e| ScanError::Configuration {
                message: e.to_string(),
            })?;
        Self::new(settings, Arc::new(client), Arc::new(MemoryResultStore::new()))
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.context.settings
    }

    pub fn trackers(&self) -> &Arc<Trackers> {
        &self.context.trackers
    }

    pub fn store(&self) -> &Arc<dyn ResultStore> {
        &self.context.store
    }

    /// Scan the local repository containing `repository_path`
    pub async fn scan_repository(
        &self,
        repository_path: &str,
        shutdown: &ShutdownCoordinator,
    ) -> ScanResult<ScanReport> {
        let path = PathBuf::from(repository_path.trim());
        let walker = tokio::task::spawn_blocking(move || GixRepositoryWalker::open(&path))
            .await
            .map_err(|e| ScanError::Io {
                message: format!("Failed to open repository: {}", e),
            })??;
        self.scan_with_walker(repository_path, Box::new(walker), shutdown)
            .await
    }

    /// Scan whatever `walker` yields, labelled as `repository_path`
    pub async fn scan_with_walker(
        &self,
        repository_path: &str,
        walker: Box<dyn RepositoryWalker>,
        shutdown: &ShutdownCoordinator,
    ) -> ScanResult<ScanReport> {
        let normalised = self.normalise_repository_path(repository_path);
        let repository_id = self.generate_repository_id(&normalised);
        let _active = self.claim(&repository_id)?;

        let task = ScannerTask::new(
            format!("scan-{}", repository_id),
            repository_id,
            normalised,
            self.context.clone(),
        );
        task.run(walker, shutdown).await
    }

    fn claim(&self, repository_id: &str) -> ScanResult<ActiveScan<'_>> {
        let mut active = write_guard(self.active.write(), |message| ScanError::Io { message })?;
        if !active.insert(repository_id.to_string()) {
            return Err(ScanError::AlreadyScanning {
                repository_id: repository_id.to_string(),
            });
        }
        Ok(ActiveScan {
            active: &self.active,
            repository_id: repository_id.to_string(),
        })
    }

    /// Normalise a repository path for ID generation
    ///
    /// The path is made absolute where it exists, trailing separators are removed,
    /// and a trailing `.git` (bare repository or git directory) is dropped, so the
    /// working tree and its git directory map to the same repository.
    pub fn normalise_repository_path(&self, repository_path: &str) -> String {
        let path = PathBuf::from(repository_path.trim());
        let absolute_path = path.canonicalize().unwrap_or(path);
        let mut normalised = absolute_path.to_string_lossy().to_string();

        while normalised.len() > 1 && normalised.ends_with('/') {
            normalised.pop();
        }
        if let Some(stripped) = normalised.strip_suffix("/.git") {
            normalised = stripped.to_string();
        } else if let Some(stripped) = normalised.strip_suffix(".git") {
            normalised = stripped.to_string();
        }
        normalised
    }

    /// SHA-256 of the normalised path, truncated to [`REPOSITORY_ID_LEN`] hex characters
    pub fn generate_repository_id(&self, normalised_path: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(normalised_path.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..REPOSITORY_ID_LEN].to_string()
    }
}
