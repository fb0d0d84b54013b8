//! Pending units and the bounded batch they are collected into

use super::error::{DispatchError, DispatchResult};
use crate::scanner::types::{ScanResponse, ScanUnit};
use std::collections::HashSet;
use tokio::sync::oneshot;

/// A unit waiting for detection, paired with the channel its response goes to
///
/// Dropping a `PendingUnit` closes the reply channel, which the waiting caller
/// observes as "released without a result".
#[derive(Debug)]
pub struct PendingUnit {
    pub unit: ScanUnit,
    pub reply: oneshot::Sender<ScanResponse>,
}

impl PendingUnit {
    pub fn new(unit: ScanUnit) -> (Self, oneshot::Receiver<ScanResponse>) {
        let (reply, receiver) = oneshot::channel();
        (Self { unit, reply }, receiver)
    }
}

/// Units collected for a single detection call
#[derive(Debug)]
pub struct ScanBatch {
    limit: usize,
    entries: Vec<PendingUnit>,
    ids: HashSet<String>,
}

impl ScanBatch {
    pub fn new(limit: usize) -> DispatchResult<Self> {
        if limit == 0 {
            return Err(DispatchError::InvalidLimit);
        }
        Ok(Self {
            limit,
            entries: Vec::with_capacity(limit),
            ids: HashSet::with_capacity(limit),
        })
    }

    /// Add a unit; on rejection the unit is dropped and its caller released
    pub fn add(&mut self, pending: PendingUnit) -> DispatchResult<()> {
        if self.is_full() {
            return Err(DispatchError::BatchFull { limit: self.limit });
        }
        if !self.ids.insert(pending.unit.id().to_string()) {
            return Err(DispatchError::DuplicateUnit {
                id: pending.unit.id().to_string(),
            });
        }
        self.entries.push(pending);
        Ok(())
    }

    /// Freeze the current contents and leave the batch empty
    pub fn take(&mut self) -> Vec<PendingUnit> {
        self.ids.clear();
        std::mem::replace(&mut self.entries, Vec::with_capacity(self.limit))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.limit
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
