//! spool - File-backed append-only JSON record log
//!
//! spool keeps JSON records in plain files that stay valid JSON after
//! every append: each segment is one wrapped array (or object), and new
//! records splice in through a small tail window instead of rewriting the
//! file. Writes to one path are serialized through a non-blocking lock
//! with a FIFO queue, and segments roll over to zero-padded successor
//! names once they cross a size limit.
//!
//! # Quick Start
//!
//! ```ignore
//! use spool::{Store, WriteOptions};
//!
//! let store = Store::new("/var/lib/app");
//!
//! // Each call appends one record; the file is valid JSON throughout.
//! store
//!     .write_continuous_json("events/app.json", &event, &WriteOptions::new())
//!     .await?;
//!
//! let events = store.read_json("events/app.json", &Default::default()).await?;
//! ```
//!
//! # Architecture
//!
//! The facade in [`Store`] is the whole public surface. Underneath,
//! `spool-concurrency` serializes writers per path, `spool-durability`
//! owns the segment format and rotation policy, and `spool-core` holds
//! the shared options, error, and JSON helpers.

pub use spool_api::{Journal, JournalConfig, Store};
pub use spool_core::{
    parse_lenient, serialize, serialize_pretty, Error, ReadOptions, Result, WriteOptions,
    WriteReceipt,
};
