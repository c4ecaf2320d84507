//! Path write coordinator.
//!
//! The coordinator is the process-wide service object owning the lock
//! table and the pending-write queues. Both live behind one mutex, which
//! makes "release the lock and claim the next batch" a single atomic
//! step. Without that atomicity a submitter could slip in between the
//! release and the drain, acquire the lock out of turn, and break the
//! per-path FIFO guarantee.
//!
//! Submitted requests either run at once (lock acquired) or queue behind
//! the current holder. Execution happens on a detached task; the caller
//! only waits on a completion channel, so dropping a caller's future
//! never cancels a write in flight.

use crate::locks::LockTable;
use crate::queue::{Batch, QueuedOp, WriteQueue, WriteRequest};
use parking_lot::Mutex;
use spool_core::{Result, WriteReceipt};
use spool_durability::segment;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error};

/// Lock table and queues, guarded together.
#[derive(Debug, Default)]
struct CoordState {
    locks: LockTable,
    queue: WriteQueue,
}

/// Process-wide write coordinator.
///
/// Cheap to clone; clones share the same lock table and queues. Construct
/// one per store and hand it to everything that writes.
#[derive(Debug, Clone, Default)]
pub struct PathCoordinator {
    inner: Arc<CoordInner>,
}

#[derive(Debug, Default)]
struct CoordInner {
    state: Mutex<CoordState>,
}

impl PathCoordinator {
    /// Create a coordinator with no locks held and empty queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit a write for `path` and return its completion channel.
    ///
    /// Runs immediately when the path lock is free; otherwise the request
    /// queues and runs, possibly merged into a batch, once the holder
    /// finishes. The receiver resolves with the outcome either way.
    pub fn submit(
        &self,
        path: PathBuf,
        payload: String,
        op: QueuedOp,
        barrier: bool,
    ) -> oneshot::Receiver<Result<WriteReceipt>> {
        let (tx, rx) = oneshot::channel();
        let request = if barrier {
            WriteRequest::barrier(payload, op, tx)
        } else {
            WriteRequest::mergeable(payload, op, tx)
        };
        self.submit_request(path, request);
        rx
    }

    /// Submit a prebuilt request for `path`.
    pub fn submit_request(&self, path: PathBuf, request: WriteRequest) {
        let immediate = {
            let mut state = self.inner.state.lock();
            if state.locks.try_lock(&path) {
                Some(request)
            } else {
                state.queue.enqueue(&path, request);
                None
            }
        };
        if let Some(request) = immediate {
            self.spawn_driver(path, Batch::of(request));
        }
    }

    /// Acquire `path` without submitting work.
    ///
    /// A caller holding a path this way owns its queue and must call
    /// [`release`](Self::release) eventually; writes submitted meanwhile
    /// wait queued until then. There is no deadlock detection and no
    /// timeout.
    pub fn try_lock(&self, path: &Path) -> bool {
        self.inner.state.lock().locks.try_lock(path)
    }

    /// Release `path`, starting the next queued batch if one is waiting.
    ///
    /// When the queue is non-empty the lock is never observably free: the
    /// drain happens under the same mutex hold as the release, and the
    /// path stays locked for the duration of the drained batch.
    pub fn release(&self, path: &Path) {
        if let Some(batch) = self.unlock_or_next(path) {
            self.spawn_driver(path.to_path_buf(), batch);
        }
    }

    /// True when `path` is currently locked.
    pub fn is_locked(&self, path: &Path) -> bool {
        self.inner.state.lock().locks.is_locked(path)
    }

    /// Number of requests queued behind the holder of `path`.
    pub fn queue_depth(&self, path: &Path) -> usize {
        self.inner.state.lock().queue.depth(path)
    }

    /// Atomically hand the lock to the next batch, or release it when the
    /// queue is empty.
    fn unlock_or_next(&self, path: &Path) -> Option<Batch> {
        let mut state = self.inner.state.lock();
        match state.queue.drain_batch(path) {
            Some(batch) => Some(batch),
            None => {
                state.locks.release(path);
                None
            }
        }
    }

    fn spawn_driver(&self, path: PathBuf, first: Batch) {
        let coordinator = self.clone();
        tokio::spawn(async move { coordinator.drive(path, first).await });
    }

    /// Run batches for a held path until its queue drains.
    ///
    /// Per iteration: perform the write, hand the lock onward (or release
    /// it), then complete the batch's waiters. The lease guarantees the
    /// handoff happens even if an iteration aborts, so one failed batch
    /// cannot starve the path.
    async fn drive(self, path: PathBuf, first: Batch) {
        let mut batch = first;
        loop {
            let lease = PathLease::new(self.clone(), path.clone());
            let result = execute(&path, &batch).await;
            if let Err(err) = &result {
                debug!(path = %path.display(), error = %err, "Write batch failed");
            }
            let next = lease.handoff();
            batch.complete(result);
            match next {
                Some(n) => batch = n,
                None => break,
            }
        }
    }
}

/// Perform a batch's physical write.
async fn execute(path: &Path, batch: &Batch) -> Result<WriteReceipt> {
    let bytes = match batch.op {
        QueuedOp::Overwrite => segment::write_bytes(path, batch.payload.as_bytes()).await?,
        QueuedOp::Append => segment::append_bytes(path, batch.payload.as_bytes()).await?,
        QueuedOp::JsonSplice { wrapper, overwrite } => {
            segment::append_record(path, &batch.payload, wrapper, overwrite).await?
        }
    };
    Ok(WriteReceipt::written(path, bytes))
}

/// Scoped guard tying a held path lock to one driver iteration.
///
/// Dropping an armed lease performs the same unlock-or-handoff step the
/// normal path takes, so the lock cannot leak when a driver unwinds. A
/// batch recovered this way restarts on a fresh task; the aborted batch's
/// waiters see their completion channel close.
struct PathLease {
    coordinator: PathCoordinator,
    path: PathBuf,
    armed: bool,
}

impl PathLease {
    fn new(coordinator: PathCoordinator, path: PathBuf) -> Self {
        PathLease {
            coordinator,
            path,
            armed: true,
        }
    }

    /// Disarm and atomically pass the lock to the next batch, releasing
    /// the path when nothing is queued.
    fn handoff(mut self) -> Option<Batch> {
        self.armed = false;
        self.coordinator.unlock_or_next(&self.path)
    }
}

impl Drop for PathLease {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        error!(path = %self.path.display(), "Write driver aborted; recovering path lock");
        if let Some(batch) = self.coordinator.unlock_or_next(&self.path) {
            // Outside a runtime (teardown) the batch is dropped instead,
            // which closes its waiters' channels.
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let coordinator = self.coordinator.clone();
                let path = self.path.clone();
                handle.spawn(async move { coordinator.drive(path, batch).await });
            }
        }
    }
}
