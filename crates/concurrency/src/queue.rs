//! FIFO pending-write queues with batching.
//!
//! Each path owns an ordered queue of requests that arrived while the path
//! was locked. Draining coalesces a run of consecutive mergeable requests
//! into one batch: payloads are comma-joined in arrival order, completion
//! channels are concatenated, and the first request's operation settings
//! win for the whole batch.
//!
//! A barrier request never merges. It ends the run in front of it and,
//! when it is the head, forms a batch of exactly one. Raw overwrites and
//! appends are submitted as barriers; only continuous-JSON splices merge.
//! A request whose operation kind differs from the head's also ends the
//! run: mixing kinds in one physical write would corrupt the payload.

use spool_core::{Result, WriteReceipt};
use spool_durability::ELEMENT_SEPARATOR;
use std::collections::{HashMap, VecDeque};
use std::mem::discriminant;
use std::path::{Path, PathBuf};
use tokio::sync::oneshot;
use tracing::{trace, warn};

/// Write operation a queued request wants performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuedOp {
    /// Raw write that creates or truncates the target.
    Overwrite,
    /// Raw append to the end of the target.
    Append,
    /// Continuous-JSON element splice through the tail window.
    JsonSplice {
        /// Opening wrapper of the segment, `[` or `{`.
        wrapper: char,
        /// Reset the segment instead of splicing into it.
        overwrite: bool,
    },
}

impl QueuedOp {
    /// True when both operations are the same kind and may share a batch.
    ///
    /// Field differences (wrapper, overwrite) do not block merging; the
    /// first request's fields win for the whole batch.
    pub fn merges_with(&self, other: &QueuedOp) -> bool {
        discriminant(self) == discriminant(other)
    }
}

/// One pending write awaiting its turn on a locked path.
#[derive(Debug)]
pub struct WriteRequest {
    /// Serialized payload, ready for the filesystem.
    pub payload: String,
    /// Operation to perform with the payload.
    pub op: QueuedOp,
    /// Barriers execute alone and fence the merge scan.
    pub barrier: bool,
    /// Channels completed when the write finishes.
    pub completions: Vec<oneshot::Sender<Result<WriteReceipt>>>,
}

impl WriteRequest {
    /// Request that may be merged with its queue neighbors.
    pub fn mergeable(
        payload: impl Into<String>,
        op: QueuedOp,
        completion: oneshot::Sender<Result<WriteReceipt>>,
    ) -> Self {
        WriteRequest {
            payload: payload.into(),
            op,
            barrier: false,
            completions: vec![completion],
        }
    }

    /// Request that must execute alone.
    pub fn barrier(
        payload: impl Into<String>,
        op: QueuedOp,
        completion: oneshot::Sender<Result<WriteReceipt>>,
    ) -> Self {
        WriteRequest {
            payload: payload.into(),
            op,
            barrier: true,
            completions: vec![completion],
        }
    }
}

/// A drained run of requests, executed as one physical write.
#[derive(Debug)]
pub struct Batch {
    /// Combined payload of every member, comma-joined in arrival order.
    pub payload: String,
    /// Operation settings of the first member.
    pub op: QueuedOp,
    /// Completion channels of every member.
    pub completions: Vec<oneshot::Sender<Result<WriteReceipt>>>,
    /// How many requests the batch absorbed.
    pub merged: usize,
}

impl Batch {
    /// Batch holding a single request.
    pub fn of(request: WriteRequest) -> Self {
        Batch {
            payload: request.payload,
            op: request.op,
            completions: request.completions,
            merged: 1,
        }
    }

    /// Fan the outcome out to every waiting caller.
    ///
    /// Send failures mean the caller dropped its receiver; the write
    /// already happened, so those are ignored.
    pub fn complete(self, result: Result<WriteReceipt>) {
        for completion in self.completions {
            let _ = completion.send(result.clone());
        }
    }
}

/// Pending-write queues, one per path.
#[derive(Debug, Default)]
pub struct WriteQueue {
    pending: HashMap<PathBuf, VecDeque<WriteRequest>>,
}

impl WriteQueue {
    /// Create an empty queue table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request to the back of the path's queue.
    pub fn enqueue(&mut self, path: &Path, request: WriteRequest) {
        let queue = self.pending.entry(path.to_path_buf()).or_default();
        queue.push_back(request);
        trace!(path = %path.display(), depth = queue.len(), "Queued write behind held lock");
    }

    /// Number of requests waiting for the path.
    pub fn depth(&self, path: &Path) -> usize {
        self.pending.get(path).map_or(0, VecDeque::len)
    }

    /// Remove and coalesce the next batch for the path.
    ///
    /// A mergeable head absorbs every consecutive mergeable request of the
    /// same operation kind behind it and stops at the first barrier or
    /// kind change, which stays queued. A barrier head is returned alone.
    /// Returns `None` when nothing is pending.
    pub fn drain_batch(&mut self, path: &Path) -> Option<Batch> {
        let queue = self.pending.get_mut(path)?;
        let first = queue.pop_front()?;
        let merge = !first.barrier;
        let mut batch = Batch::of(first);

        if merge {
            loop {
                match queue.front() {
                    Some(next) if next.barrier => break,
                    Some(next) if !next.op.merges_with(&batch.op) => {
                        warn!(
                            path = %path.display(),
                            "Mixed write operations queued for one path; ending batch early"
                        );
                        break;
                    }
                    Some(_) => {}
                    None => break,
                }
                let Some(next) = queue.pop_front() else { break };
                if !next.payload.is_empty() {
                    if !batch.payload.is_empty() {
                        batch.payload.push(ELEMENT_SEPARATOR as char);
                    }
                    batch.payload.push_str(&next.payload);
                }
                batch.completions.extend(next.completions);
                batch.merged += 1;
            }
        }

        if batch.merged > 1 {
            trace!(
                path = %path.display(),
                merged = batch.merged,
                "Coalesced queued writes into one batch"
            );
        }
        Some(batch)
    }
}
