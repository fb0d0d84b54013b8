//! In-memory result store

use super::error::{StoreError, StoreResult};
use super::record::ResultRecord;
use super::traits::ResultStore;
use crate::core::sync::{read_guard, write_guard};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryResultStore {
    records: RwLock<HashMap<String, ResultRecord>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn require_hash(hash: &str) -> StoreResult<()> {
    if hash.is_empty() {
        return Err(StoreError::Validation("hash must not be empty".to_string()));
    }
    Ok(())
}

impl ResultStore for MemoryResultStore {
    fn write(&self, records: &[ResultRecord]) -> StoreResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        if let Some(position) = records.iter().position(|r| r.hash.is_empty()) {
            return Err(StoreError::Validation(format!(
                "record {} of {} has an empty hash",
                position + 1,
                records.len()
            )));
        }

        let mut map = write_guard(self.records.write(), StoreError::Lock)?;
        let mut added = 0;
        for record in records {
            if map.insert(record.hash.clone(), record.clone()).is_none() {
                added += 1;
            }
        }
        log::trace!("stored {} records ({} new)", records.len(), added);
        Ok(added)
    }

    fn read(&self, hash: &str) -> StoreResult<ResultRecord> {
        require_hash(hash)?;
        let map = read_guard(self.records.read(), StoreError::Lock)?;
        map.get(hash).cloned().ok_or_else(|| StoreError::NotFound {
            hash: hash.to_string(),
        })
    }

    fn list(&self) -> StoreResult<Vec<ResultRecord>> {
        let map = read_guard(self.records.read(), StoreError::Lock)?;
        let mut records: Vec<ResultRecord> = map.values().cloned().collect();
        records.sort_by(|a, b| a.hash.cmp(&b.hash));
        Ok(records)
    }

    fn delete(&self, hash: &str) -> StoreResult<ResultRecord> {
        require_hash(hash)?;
        let mut map = write_guard(self.records.write(), StoreError::Lock)?;
        map.remove(hash).ok_or_else(|| StoreError::NotFound {
            hash: hash.to_string(),
        })
    }

    fn len(&self) -> StoreResult<usize> {
        let map = read_guard(self.records.read(), StoreError::Lock)?;
        Ok(map.len())
    }
}
