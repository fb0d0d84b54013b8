//! Result store contract

use super::error::StoreResult;
use super::record::ResultRecord;

/// Storage for findings, keyed by content hash
///
/// All operations are safe under concurrent use. Writes upsert by hash and are
/// validated as a whole before anything is applied.
pub trait ResultStore: Send + Sync {
    /// Upsert `records`, returning how many were newly added
    fn write(&self, records: &[ResultRecord]) -> StoreResult<usize>;

    fn read(&self, hash: &str) -> StoreResult<ResultRecord>;

    /// Snapshot of every record, ordered by hash
    fn list(&self) -> StoreResult<Vec<ResultRecord>>;

    /// Remove and return the record for `hash`
    fn delete(&self, hash: &str) -> StoreResult<ResultRecord>;

    fn len(&self) -> StoreResult<usize>;

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}
