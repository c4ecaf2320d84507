//! Public API layer for spool
//!
//! This crate provides the surface applications use:
//! - **Store**: path-addressed reads, writes, appends, and continuous-JSON
//!   logging, all serialized per path through one coordinator
//! - **Journal**: dated activity and error journals layered on the store
//!
//! ## Write Semantics
//!
//! Writes never clobber by accident: an existing target is only replaced
//! with `overwrite` set, only extended with `append` set, and otherwise
//! the call reports a skip instead of failing. Continuous-JSON writes are
//! the one mergeable operation: concurrent calls against one segment may
//! be coalesced into a single physical write, and every caller still gets
//! its own completion.
//!
//! ## Quick Start
//!
//! ```ignore
//! use spool_api::{Journal, Store};
//! use spool_core::WriteOptions;
//!
//! let store = Store::new("/var/lib/app");
//! store
//!     .write_continuous_json("events/app.json", &event, &WriteOptions::new())
//!     .await?;
//!
//! let journal = Journal::new(store.clone());
//! journal.write_entry("startup", &report).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod journal;
pub mod store;

pub use journal::{Journal, JournalConfig};
pub use store::Store;
