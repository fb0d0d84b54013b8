//! Result Store
//!
//! Content-addressed persistence for findings. A [`ResultRecord`] is keyed by a
//! SHA-256 digest over its identifying fields, so storing the same finding twice
//! leaves one record. [`MemoryResultStore`] is the in-process implementation;
//! durable backends implement [`ResultStore`].

mod error;
mod memory;
mod record;
mod traits;


pub use error::{StoreError, StoreResult};
pub use memory::MemoryResultStore;
pub use record::ResultRecord;
pub use traits::ResultStore;
