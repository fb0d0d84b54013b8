//! Lock helpers for the shared scan state
//!
//! The key trackers and the in-memory result store each guard their maps with a
//! single `RwLock`. A poisoned lock means a writer panicked mid-update; rather than
//! propagating the panic into every scan task we surface it as a module error.

use std::sync::{LockResult, RwLockReadGuard, RwLockWriteGuard};

/// Acquire a read guard, mapping poisoning into the caller's error type
pub fn read_guard<'a, T, E>(
    result: LockResult<RwLockReadGuard<'a, T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockReadGuard<'a, T>, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "lock poisoned while reading (a writer panicked): {}",
            poison_err
        ))
    })
}

/// Acquire a write guard, mapping poisoning into the caller's error type
pub fn write_guard<'a, T, E>(
    result: LockResult<RwLockWriteGuard<'a, T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockWriteGuard<'a, T>, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "lock poisoned while writing (a holder panicked): {}",
            poison_err
        ))
    })
}
