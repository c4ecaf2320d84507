//! Per-path non-blocking lock table.
//!
//! The table maps each absolute path to a locked flag. Entries are created
//! lazily on first acquisition and live for the rest of the process;
//! release stores `false` rather than removing, so an absent entry and a
//! `false` entry mean the same thing: unlocked.
//!
//! `try_lock` never blocks. A caller that loses the race enqueues its
//! request instead of retrying, which is what keeps writer scheduling
//! strictly FIFO per path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Non-blocking per-path lock flags.
#[derive(Debug, Default)]
pub struct LockTable {
    flags: HashMap<PathBuf, bool>,
}

impl LockTable {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `path` if it is free.
    ///
    /// Returns true and marks the path locked when it was unlocked (or
    /// never seen); returns false with no side effect otherwise.
    pub fn try_lock(&mut self, path: &Path) -> bool {
        let flag = self.flags.entry(path.to_path_buf()).or_insert(false);
        if *flag {
            false
        } else {
            *flag = true;
            true
        }
    }

    /// Mark `path` unlocked.
    ///
    /// Unconditional; releasing an unheld lock is a no-op in effect.
    pub fn release(&mut self, path: &Path) {
        self.flags.insert(path.to_path_buf(), false);
    }

    /// True when `path` is currently locked.
    pub fn is_locked(&self, path: &Path) -> bool {
        self.flags.get(path).copied().unwrap_or(false)
    }

    /// Number of paths the table has ever tracked.
    pub fn tracked_paths(&self) -> usize {
        self.flags.len()
    }
}
