//! Repository Walker
//!
//! History and tree access behind a small trait so the orchestrator can be driven
//! by something other than a real repository in tests.

use crate::scanner::error::{ScanError, ScanResult};
use gix::objs::tree::EntryKind;
use std::io::Cursor;
use std::path::Path;

/// How much of a blob is inspected for NUL bytes
pub const BINARY_PROBE_LEN: usize = 8000;

/// One blob in a commit's tree, before its content is read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub object_id: String,
    pub path: String,
}

/// A blob with its content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub object_id: String,
    pub path: String,
    pub size: u64,
    pub is_binary: bool,
    pub data: Vec<u8>,
}

impl FileEntry {
    pub fn new(object_id: impl Into<String>, path: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            object_id: object_id.into(),
            path: path.into(),
            size: data.len() as u64,
            is_binary: is_binary(&data),
            data,
        }
    }

    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.data.as_slice())
    }

    /// Final path component
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// True when a NUL byte appears in the first [`BINARY_PROBE_LEN`] bytes
pub fn is_binary(data: &[u8]) -> bool {
    data.iter().take(BINARY_PROBE_LEN).any(|&byte| byte == 0)
}

/// Commit and tree iteration for one repository
pub trait RepositoryWalker: Send {
    /// Commit IDs reachable from HEAD, newest first
    fn commits(&self) -> ScanResult<Vec<String>>;

    /// Every blob in the tree of `commit`
    fn tree(&self, commit: &str) -> ScanResult<Vec<TreeEntry>>;

    /// Read the content of one blob
    fn blob(&self, entry: &TreeEntry) -> ScanResult<FileEntry>;
}

/// Walker over a local repository using gix
pub struct GixRepositoryWalker {
    repository: gix::ThreadSafeRepository,
}

impl GixRepositoryWalker {
    /// Open the repository containing `path`
    pub fn open(path: &Path) -> ScanResult<Self> {
        let repository = gix::discover(path).map_err(|e| ScanError::Repository {
            message: format!("Failed to open repository '{}': {}", path.display(), e),
        })?;
        Ok(Self {
            repository: repository.into_sync(),
        })
    }

    fn parse_id(commit: &str) -> ScanResult<gix::ObjectId> {
        gix::ObjectId::from_hex(commit.as_bytes()).map_err(|e| ScanError::Repository {
            message: format!("Invalid object id '{}': {}", commit, e),
        })
    }
}

impl RepositoryWalker for GixRepositoryWalker {
    fn commits(&self) -> ScanResult<Vec<String>> {
        let repo = self.repository.to_thread_local();
        let head = repo.head_id().map_err(|e| ScanError::Repository {
            message: format!("Failed to resolve HEAD: {}", e),
        })?;

        let walk = repo
            .rev_walk([head.detach()])
            .all()
            .map_err(|e| ScanError::Repository {
                message: format!("Failed to walk history: {}", e),
            })?;

        let mut commits = Vec::new();
        for info in walk {
            let info = info.map_err(|e| ScanError::Repository {
                message: format!("Failed to read commit: {}", e),
            })?;
            commits.push(info.id.to_string());
        }
        Ok(commits)
    }

    fn tree(&self, commit: &str) -> ScanResult<Vec<TreeEntry>> {
        let repo = self.repository.to_thread_local();
        let id = Self::parse_id(commit)?;
        let object = repo.find_object(id).map_err(|e| ScanError::Repository {
            message: format!("Failed to find commit {}: {}", commit, e),
        })?;
        let tree = object
            .try_into_commit()
            .map_err(|e| ScanError::Repository {
                message: format!("Object {} is not a commit: {}", commit, e),
            })?
            .tree()
            .map_err(|e| ScanError::Repository {
                message: format!("Failed to read tree of {}: {}", commit, e),
            })?;

        let mut recorder = gix::traverse::tree::Recorder::default();
        tree.traverse()
            .breadthfirst(&mut recorder)
            .map_err(|e| ScanError::Repository {
                message: format!("Failed to traverse tree of {}: {}", commit, e),
            })?;

        Ok(recorder
            .records
            .into_iter()
            .filter(|entry| matches!(entry.mode.kind(), EntryKind::Blob | EntryKind::BlobExecutable))
            .map(|entry| TreeEntry {
                object_id: entry.oid.to_string(),
                path: entry.filepath.to_string(),
            })
            .collect())
    }

    fn blob(&self, entry: &TreeEntry) -> ScanResult<FileEntry> {
        let repo = self.repository.to_thread_local();
        let id = Self::parse_id(&entry.object_id)?;
        let object = repo.find_object(id).map_err(|e| ScanError::Repository {
            message: format!("Failed to read blob {} ({}): {}", entry.object_id, entry.path, e),
        })?;
        Ok(FileEntry::new(
            entry.object_id.clone(),
            entry.path.clone(),
            object.detach().data,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_probe() {
        assert!(!is_binary(b"plain text\n"));
        assert!(is_binary(b"PNG\0\x01"));

        let mut late_nul = vec![b'a'; BINARY_PROBE_LEN];
        late_nul.push(0);
        assert!(!is_binary(&late_nul));
    }

    #[test]
    fn test_file_entry() {
        let entry = FileEntry::new("abc", "docs/notes/visit.txt", b"hello".to_vec());
        assert_eq!(entry.size, 5);
        assert!(!entry.is_binary);
        assert_eq!(entry.file_name(), "visit.txt");

        let mut text = String::new();
        std::io::Read::read_to_string(&mut entry.reader(), &mut text).unwrap();
        assert_eq!(text, "hello");
    }
}
