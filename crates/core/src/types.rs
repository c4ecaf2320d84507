//! Shared result types for write operations
//!
//! Every write-shaped operation completes with a [`WriteReceipt`], whether
//! it ran immediately, ran later as part of a drained batch, or was skipped
//! because the target already existed and neither append nor overwrite was
//! requested.

use std::path::PathBuf;

/// Completion payload of a write operation.
///
/// Receipts are `Clone` because one physical write can complete a whole
/// batch of merged requests; each waiter receives the same receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    /// Absolute path the operation targeted.
    pub path: PathBuf,

    /// Bytes handed to the filesystem by this operation.
    ///
    /// For a merged batch this is the size of the combined payload, not the
    /// size of any single caller's contribution.
    pub bytes: u64,

    /// False when the write was safely skipped (target existed and the
    /// options allowed neither append nor overwrite).
    pub written: bool,
}

impl WriteReceipt {
    /// Receipt for a write that reached the filesystem.
    pub fn written(path: impl Into<PathBuf>, bytes: u64) -> Self {
        WriteReceipt {
            path: path.into(),
            bytes,
            written: true,
        }
    }

    /// Receipt for a write that was skipped without touching the target.
    pub fn skipped(path: impl Into<PathBuf>) -> Self {
        WriteReceipt {
            path: path.into(),
            bytes: 0,
            written: false,
        }
    }
}
