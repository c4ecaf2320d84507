//! Core types for the spool storage engine
//!
//! This crate defines the foundational pieces shared by every other spool
//! crate:
//! - Error: cloneable error hierarchy (batch completions fan it out)
//! - WriteOptions / ReadOptions: per-call configuration with defaults
//! - WriteReceipt: completion payload of every write-shaped operation
//! - json: tolerant parsing and serialization helpers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod json;
pub mod options;
pub mod types;

// Re-export commonly used types at the crate root
pub use error::{Error, Result};
pub use json::{parse_lenient, serialize, serialize_pretty, CONTROL_SWEEP_MAX};
pub use options::{ReadOptions, WriteOptions, DEFAULT_PAD_WIDTH, DEFAULT_SIZE_LIMIT_MB};
pub use types::WriteReceipt;
