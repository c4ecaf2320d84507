//! Write serialization for spool.
//!
//! Every mutation of a segment file flows through this crate:
//! - [`LockTable`]: non-blocking per-path locks
//! - [`WriteQueue`]: FIFO queues of deferred writes, with batching
//! - [`PathCoordinator`]: the service tying both together
//!
//! Reads never take a lock; only writers are serialized.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod locks;
pub mod queue;

pub use coordinator::PathCoordinator;
pub use locks::LockTable;
pub use queue::{Batch, QueuedOp, WriteQueue, WriteRequest};
