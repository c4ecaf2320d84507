//! Storage facade.
//!
//! [`Store`] is the single entry point for everything the engine does to
//! disk: raw writes and appends, continuous-JSON logging, reads, and the
//! rotation lookups. Every mutation goes through the coordinator, so two
//! stores cloned from the same instance never interleave on one path.
//!
//! ## Write routing
//!
//! | Call | Routed as |
//! |------|-----------|
//! | `write` (overwrite or missing target) | barrier overwrite |
//! | `write` (target exists, `append` set) | barrier append |
//! | `write` (target exists, neither set) | skipped, `written: false` |
//! | `append` | barrier append (overwrite when missing) |
//! | `write_continuous_json` | mergeable tail splice |

use serde::Serialize;
use spool_concurrency::{PathCoordinator, QueuedOp};
use spool_core::{
    parse_lenient, serialize, serialize_pretty, Error, ReadOptions, Result, WriteOptions,
    WriteReceipt,
};
use spool_durability::{
    find_latest_by_stem, is_size_exceeded, latest_segment_name, opposite_bracket, scan_rotation,
};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::oneshot;
use tracing::debug;

/// File store rooted at a base directory.
///
/// Cheap to clone; clones share one write coordinator and therefore one
/// set of path locks.
///
/// ## Quick Start
///
/// ```ignore
/// use spool_api::Store;
/// use spool_core::WriteOptions;
///
/// let store = Store::new("/var/lib/app");
/// store
///     .write_continuous_json("events/app.json", &event, &WriteOptions::new())
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Store {
    base: PathBuf,
    coordinator: PathCoordinator,
}

impl Store {
    /// Create a store resolving relative paths against `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Store {
            base: base.into(),
            coordinator: PathCoordinator::new(),
        }
    }

    /// Base directory for relative path resolution.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Coordinator serializing this store's writes.
    pub fn coordinator(&self) -> &PathCoordinator {
        &self.coordinator
    }

    /// Resolve a caller path against the base directory.
    pub fn resolve(&self, path: impl AsRef<Path>, relative: bool) -> PathBuf {
        if relative {
            self.base.join(path)
        } else {
            path.as_ref().to_path_buf()
        }
    }

    // ------------------------------------------------------------------
    // Reads (never locked)
    // ------------------------------------------------------------------

    /// Read a file's full contents.
    pub async fn read(&self, path: impl AsRef<Path>, opts: &ReadOptions) -> Result<Vec<u8>> {
        let target = self.resolve(path, opts.relative);
        fs::read(&target).await.map_err(|e| Error::io(&target, e))
    }

    /// Read a file and parse it as JSON.
    ///
    /// Parsing is lenient: a segment polluted by control characters from
    /// an interrupted write still parses after a control-character sweep.
    pub async fn read_json(
        &self,
        path: impl AsRef<Path>,
        opts: &ReadOptions,
    ) -> Result<serde_json::Value> {
        let target = self.resolve(path, opts.relative);
        let bytes = fs::read(&target).await.map_err(|e| Error::io(&target, e))?;
        parse_lenient(&target, &bytes)
    }

    /// True when the path points at an existing file or directory.
    pub async fn exists(&self, path: impl AsRef<Path>, opts: &ReadOptions) -> bool {
        let target = self.resolve(path, opts.relative);
        fs::try_exists(&target).await.unwrap_or(false)
    }

    /// Create a directory (and its ancestors) if absent.
    pub async fn assert_dir(&self, path: impl AsRef<Path>, opts: &ReadOptions) -> Result<()> {
        let target = self.resolve(path, opts.relative);
        fs::create_dir_all(&target)
            .await
            .map_err(|e| Error::io(&target, e))
    }

    // ------------------------------------------------------------------
    // Raw writes (barriers)
    // ------------------------------------------------------------------

    /// Write `contents` to a file, routing by the write options.
    ///
    /// With the target present and neither `overwrite` nor `append` set,
    /// nothing happens and the receipt reports `written: false`.
    pub async fn write(
        &self,
        path: impl AsRef<Path>,
        contents: impl AsRef<str>,
        opts: &WriteOptions,
    ) -> Result<WriteReceipt> {
        let target = self.resolve(path, opts.relative);
        self.write_resolved(target, contents.as_ref(), opts).await
    }

    /// Serialize `value` as JSON and [`write`](Self::write) it.
    pub async fn write_json<T: Serialize + ?Sized>(
        &self,
        path: impl AsRef<Path>,
        value: &T,
        opts: &WriteOptions,
    ) -> Result<WriteReceipt> {
        let contents = Self::render(value, opts)?;
        let target = self.resolve(path, opts.relative);
        self.write_resolved(target, &contents, opts).await
    }

    /// Append `contents` to a file, creating it when missing.
    ///
    /// An existing target gets the optional `prepend` prefix in front of
    /// the payload; a missing target is created without it.
    pub async fn append(
        &self,
        path: impl AsRef<Path>,
        contents: impl AsRef<str>,
        opts: &WriteOptions,
    ) -> Result<WriteReceipt> {
        let target = self.resolve(path, opts.relative);
        self.append_resolved(target, contents.as_ref(), opts).await
    }

    /// Serialize `value` as JSON and [`append`](Self::append) it.
    pub async fn append_json<T: Serialize + ?Sized>(
        &self,
        path: impl AsRef<Path>,
        value: &T,
        opts: &WriteOptions,
    ) -> Result<WriteReceipt> {
        let contents = Self::render(value, opts)?;
        let target = self.resolve(path, opts.relative);
        self.append_resolved(target, &contents, opts).await
    }

    async fn write_resolved(
        &self,
        mut target: PathBuf,
        contents: &str,
        opts: &WriteOptions,
    ) -> Result<WriteReceipt> {
        if opts.auto_create_path {
            self.ensure_parent(&target).await?;
        }
        let exists = self.target_exists(&target).await?;

        if exists && !opts.overwrite && opts.append {
            return self.append_resolved(target, contents, opts).await;
        }

        if exists && opts.next_file_name {
            if let Some((dir, name)) = split_segment(&target) {
                let scan = scan_rotation(
                    dir,
                    name,
                    opts.pad_width,
                    opts.check_file_size,
                    opts.size_limit_mb,
                )
                .await?;
                let rotated = dir.join(scan.next);
                target = rotated;
            }
            return self
                .submit_barrier(target, contents.to_string(), QueuedOp::Overwrite)
                .await;
        }

        if opts.overwrite || !exists {
            return self
                .submit_barrier(target, contents.to_string(), QueuedOp::Overwrite)
                .await;
        }

        debug!(path = %target.display(), "Write skipped; target exists and overwrite not set");
        Ok(WriteReceipt::skipped(target))
    }

    async fn append_resolved(
        &self,
        target: PathBuf,
        contents: &str,
        opts: &WriteOptions,
    ) -> Result<WriteReceipt> {
        if opts.auto_create_path {
            self.ensure_parent(&target).await?;
        }
        if !self.target_exists(&target).await? {
            return self
                .submit_barrier(target, contents.to_string(), QueuedOp::Overwrite)
                .await;
        }

        let payload = match &opts.prepend {
            Some(prefix) => format!("{prefix}{contents}"),
            None => contents.to_string(),
        };
        self.submit_barrier(target, payload, QueuedOp::Append).await
    }

    // ------------------------------------------------------------------
    // Continuous JSON (mergeable)
    // ------------------------------------------------------------------

    /// Serialize `value` and splice it into a continuous-JSON segment.
    ///
    /// The segment rotates first when it is over the size limit, so the
    /// splice lands in a fresh file. Concurrent calls for one path queue
    /// behind each other and may share a single physical write.
    pub async fn write_continuous_json<T: Serialize + ?Sized>(
        &self,
        path: impl AsRef<Path>,
        value: &T,
        opts: &WriteOptions,
    ) -> Result<WriteReceipt> {
        let element = Self::render(value, opts)?;
        self.write_continuous_record(path, element, opts).await
    }

    /// Splice a pre-serialized element into a continuous-JSON segment.
    ///
    /// The element must be exactly one JSON value with no trailing comma;
    /// it is written byte for byte.
    pub async fn write_continuous_record(
        &self,
        path: impl AsRef<Path>,
        element: impl Into<String>,
        opts: &WriteOptions,
    ) -> Result<WriteReceipt> {
        let mut target = self.resolve(path, opts.relative);
        // Unknown wrappers fail here, before anything is queued.
        opposite_bracket(&target, opts.wrapper)?;

        if opts.auto_create_path {
            self.ensure_parent(&target).await?;
        }

        // A set size limit always arms the rollover check; the check flag
        // only selects the walk predicate.
        if is_size_exceeded(&target, opts.size_limit_mb).await? {
            if let Some((dir, name)) = split_segment(&target) {
                let scan = scan_rotation(
                    dir,
                    name,
                    opts.pad_width,
                    opts.check_file_size,
                    opts.size_limit_mb,
                )
                .await?;
                let rotated = dir.join(scan.next);
                debug!(
                    from = %target.display(),
                    to = %rotated.display(),
                    "Segment over size limit; splice retargeted"
                );
                target = rotated;
            }
        }

        let rx = self.coordinator.submit(
            target,
            element.into(),
            QueuedOp::JsonSplice {
                wrapper: opts.wrapper,
                overwrite: opts.overwrite,
            },
            false,
        );
        await_receipt(rx).await
    }

    // ------------------------------------------------------------------
    // Rotation lookups
    // ------------------------------------------------------------------

    /// Path of the newest existing segment for a rotating base name.
    ///
    /// Returns `None` when the base segment itself does not exist.
    pub async fn latest_segment_path(
        &self,
        path: impl AsRef<Path>,
        opts: &WriteOptions,
    ) -> Result<Option<PathBuf>> {
        let target = self.resolve(path, opts.relative);
        if !self.target_exists(&target).await? {
            return Ok(None);
        }
        let Some((dir, name)) = split_segment(&target) else {
            return Ok(Some(target));
        };
        let latest = latest_segment_name(dir, name, opts.pad_width).await?;
        Ok(Some(dir.join(latest)))
    }

    /// Most-recently-modified file under `dir` whose name contains the
    /// stem of `file_name`, searching subdirectories too.
    pub async fn find_latest_by_stem(
        &self,
        dir: impl AsRef<Path>,
        file_name: &str,
        opts: &ReadOptions,
    ) -> Result<Option<PathBuf>> {
        let target = self.resolve(dir, opts.relative);
        find_latest_by_stem(&target, file_name).await
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn render<T: Serialize + ?Sized>(value: &T, opts: &WriteOptions) -> Result<String> {
        if opts.pretty {
            serialize_pretty(value)
        } else {
            serialize(value)
        }
    }

    async fn target_exists(&self, target: &Path) -> Result<bool> {
        fs::try_exists(target)
            .await
            .map_err(|e| Error::io(target, e))
    }

    async fn ensure_parent(&self, target: &Path) -> Result<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(parent, e))?;
        }
        Ok(())
    }

    async fn submit_barrier(
        &self,
        target: PathBuf,
        payload: String,
        op: QueuedOp,
    ) -> Result<WriteReceipt> {
        let rx = self.coordinator.submit(target, payload, op, true);
        await_receipt(rx).await
    }
}

/// Split a target into its directory and file name for rotation walks.
///
/// `None` for paths like `/` that cannot rotate.
fn split_segment(target: &Path) -> Option<(&Path, &str)> {
    let dir = target.parent()?;
    let name = target.file_name()?.to_str()?;
    Some((dir, name))
}

async fn await_receipt(
    rx: oneshot::Receiver<Result<WriteReceipt>>,
) -> Result<WriteReceipt> {
    match rx.await {
        Ok(result) => result,
        Err(_) => Err(Error::Internal(
            "write completion channel closed before a result arrived".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &tempfile::TempDir) -> Store {
        Store::new(dir.path())
    }

    #[tokio::test]
    async fn test_write_and_read_roundtrip() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        let receipt = store
            .write("note.txt", "hello", &WriteOptions::new())
            .await
            .unwrap();
        assert!(receipt.written);
        assert_eq!(receipt.bytes, 5);

        let bytes = store.read("note.txt", &ReadOptions::new()).await.unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn test_write_skips_when_append_and_overwrite_off() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let opts = WriteOptions::new().with_append(false);

        store.write("note.txt", "first", &opts).await.unwrap();
        let receipt = store.write("note.txt", "second", &opts).await.unwrap();

        assert!(!receipt.written);
        let bytes = store.read("note.txt", &ReadOptions::new()).await.unwrap();
        assert_eq!(bytes, b"first");
    }

    #[tokio::test]
    async fn test_write_overwrite_replaces() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        store
            .write("note.txt", "first", &WriteOptions::new())
            .await
            .unwrap();
        store
            .write("note.txt", "second", &WriteOptions::new().with_overwrite(true))
            .await
            .unwrap();

        let bytes = store.read("note.txt", &ReadOptions::new()).await.unwrap();
        assert_eq!(bytes, b"second");
    }

    #[tokio::test]
    async fn test_write_with_append_set_delegates() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let opts = WriteOptions::new().with_append(true);

        store.write("note.txt", "one", &opts).await.unwrap();
        store.write("note.txt", "two", &opts).await.unwrap();

        let bytes = store.read("note.txt", &ReadOptions::new()).await.unwrap();
        assert_eq!(bytes, b"onetwo");
    }

    #[tokio::test]
    async fn test_append_missing_target_creates_without_prepend() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let opts = WriteOptions::new().with_prepend("\n");

        store.append("log.txt", "first", &opts).await.unwrap();
        store.append("log.txt", "second", &opts).await.unwrap();

        let bytes = store.read("log.txt", &ReadOptions::new()).await.unwrap();
        assert_eq!(bytes, b"first\nsecond");
    }

    #[tokio::test]
    async fn test_auto_create_path_makes_parents() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        let receipt = store
            .write(
                "deep/nested/note.txt",
                "hi",
                &WriteOptions::new().with_auto_create_path(true),
            )
            .await
            .unwrap();
        assert!(receipt.written);
        assert!(dir.path().join("deep/nested/note.txt").exists());
    }

    #[tokio::test]
    async fn test_write_without_auto_create_fails_on_missing_parent() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        let err = store
            .write("deep/nested/note.txt", "hi", &WriteOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[tokio::test]
    async fn test_continuous_json_appends_elements() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let opts = WriteOptions::new();

        store
            .write_continuous_json("app.json", &serde_json::json!({"n": 1}), &opts)
            .await
            .unwrap();
        store
            .write_continuous_json("app.json", &serde_json::json!({"n": 2}), &opts)
            .await
            .unwrap();

        let value = store.read_json("app.json", &ReadOptions::new()).await.unwrap();
        assert_eq!(value, serde_json::json!([{"n": 1}, {"n": 2}]));
    }

    #[tokio::test]
    async fn test_continuous_record_writes_verbatim() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        store
            .write_continuous_record("app.json", "{\"raw\":true}", &WriteOptions::new())
            .await
            .unwrap();

        let bytes = store.read("app.json", &ReadOptions::new()).await.unwrap();
        assert_eq!(bytes, b"[{\"raw\":true}]");
    }

    #[tokio::test]
    async fn test_continuous_json_rejects_unknown_wrapper() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        let err = store
            .write_continuous_json(
                "app.json",
                &serde_json::json!({"n": 1}),
                &WriteOptions::new().with_wrapper('('),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BracketRecognition { .. }));
        assert!(!dir.path().join("app.json").exists());
    }

    #[tokio::test]
    async fn test_continuous_json_rotates_over_limit() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let opts = WriteOptions::for_testing();

        // Fill the base segment past the 1KB testing limit.
        let big = "x".repeat(1200);
        store
            .write_continuous_json("app.json", &serde_json::json!({ "pad": big }), &opts)
            .await
            .unwrap();
        store
            .write_continuous_json("app.json", &serde_json::json!({"n": 2}), &opts)
            .await
            .unwrap();

        assert!(dir.path().join("app0001.json").exists());
        let value = store
            .read_json("app0001.json", &ReadOptions::new())
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!([{"n": 2}]));
    }

    #[tokio::test]
    async fn test_exists_and_assert_dir() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);
        let ropts = ReadOptions::new();

        assert!(!store.exists("sub", &ropts).await);
        store.assert_dir("sub", &ropts).await.unwrap();
        assert!(store.exists("sub", &ropts).await);

        // Idempotent.
        store.assert_dir("sub", &ropts).await.unwrap();
    }

    #[tokio::test]
    async fn test_latest_segment_path_none_without_base() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        let latest = store
            .latest_segment_path("app.json", &WriteOptions::new())
            .await
            .unwrap();
        assert_eq!(latest, None);
    }

    #[tokio::test]
    async fn test_latest_segment_path_finds_highest() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        std::fs::write(dir.path().join("app.json"), b"[1]").unwrap();
        std::fs::write(dir.path().join("app0001.json"), b"[1]").unwrap();

        let latest = store
            .latest_segment_path("app.json", &WriteOptions::new())
            .await
            .unwrap();
        assert_eq!(latest, Some(dir.path().join("app0001.json")));
    }

    #[tokio::test]
    async fn test_resolve_honors_relative_flag() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        assert_eq!(store.resolve("a.json", true), dir.path().join("a.json"));
        assert_eq!(
            store.resolve("/abs/a.json", false),
            PathBuf::from("/abs/a.json")
        );
    }

    #[tokio::test]
    async fn test_next_file_name_writes_rotated_segment() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir);

        // Base file exists and exceeds the tiny limit, so the write lands
        // on the rotated name. Append stays off; an append-routed write
        // would win the dispatch before the rotation branch is reached.
        std::fs::write(dir.path().join("app.json"), vec![b'x'; 2048]).unwrap();
        let receipt = store
            .write(
                "app.json",
                "[]",
                &WriteOptions::for_testing()
                    .with_append(false)
                    .with_next_file_name(true),
            )
            .await
            .unwrap();

        assert!(receipt.written);
        assert_eq!(receipt.path, dir.path().join("app0001.json"));
        assert_eq!(
            std::fs::read(dir.path().join("app0001.json")).unwrap(),
            b"[]"
        );
    }
}
