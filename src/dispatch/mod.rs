//! Batch Dispatcher
//!
//! Turns a stream of [`PendingUnit`]s into bounded detection calls and routes
//! each result back over the one-shot channel its caller is waiting on.
//!
//! ```text
//!   callers ──PendingUnit──▶ mpsc ──▶ BatchDispatcher ──batch──▶ DetectionClient
//!      ▲                                   │
//!      └──────── oneshot ScanResponse ◀────┘ (matched by unit ID)
//! ```
//!
//! Many dispatchers can share one `Arc<dyn DetectionClient>`.

mod batch;
mod dispatcher;
mod error;


pub use batch::{PendingUnit, ScanBatch};
pub use dispatcher::{BatchDispatcher, DispatchStats, FlushReason};
pub use error::{DispatchError, DispatchResult};
