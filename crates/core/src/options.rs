//! Per-call options for reads and writes.
//!
//! Every facade operation takes an options value; the defaults cover the
//! common "append a record to a relative JSON log" case.

/// Default segment size limit in megabytes.
pub const DEFAULT_SIZE_LIMIT_MB: f64 = 5.0;

/// Default zero-pad width for rotation counters.
pub const DEFAULT_PAD_WIDTH: usize = 4;

/// Options accepted by every write-shaped facade operation.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Resolve the path against the store's base directory (default: true).
    pub relative: bool,

    /// When the target exists and `overwrite` is off, append instead of
    /// skipping the write (default: true).
    pub append: bool,

    /// Replace the target even when it already exists (default: false).
    pub overwrite: bool,

    /// When the target exists, write to the next rotated name instead of
    /// touching the existing file (default: false).
    pub next_file_name: bool,

    /// Create the parent directory chain before writing (default: false).
    pub auto_create_path: bool,

    /// Pretty-print serialized JSON payloads (default: false).
    ///
    /// Pretty output widens the closing-bracket region of a segment, which
    /// the fixed tail window of the incremental appender may not cover.
    pub pretty: bool,

    /// Opening wrapper of a continuous-JSON segment, `[` or `{`
    /// (default: `[`).
    pub wrapper: char,

    /// Fixed prefix spliced in front of appended payloads (default: none).
    pub prepend: Option<String>,

    /// Segment size limit in megabytes; `None` disables rotation by size
    /// (default: 5 MB).
    pub size_limit_mb: Option<f64>,

    /// Whether the rotation walk checks candidate sizes in addition to
    /// name collisions (default: true).
    ///
    /// Turned off, the walk skips every existing candidate, so an
    /// over-limit segment rolls to the first unused name instead of
    /// refilling a rotated segment still under the limit. The rollover
    /// check itself runs whenever `size_limit_mb` is set.
    pub check_file_size: bool,

    /// Zero-pad width for rotation counters (default: 4).
    pub pad_width: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            relative: true,
            append: true,
            overwrite: false,
            next_file_name: false,
            auto_create_path: false,
            pretty: false,
            wrapper: '[',
            prepend: None,
            size_limit_mb: Some(DEFAULT_SIZE_LIMIT_MB),
            check_file_size: true,
            pad_width: DEFAULT_PAD_WIDTH,
        }
    }
}

impl WriteOptions {
    /// Create write options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set relative-path resolution (builder pattern).
    pub fn with_relative(mut self, relative: bool) -> Self {
        self.relative = relative;
        self
    }

    /// Set append-on-existing behavior (builder pattern).
    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// Set overwrite behavior (builder pattern).
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set rotation to the next free name (builder pattern).
    pub fn with_next_file_name(mut self, next: bool) -> Self {
        self.next_file_name = next;
        self
    }

    /// Set parent-directory auto-creation (builder pattern).
    pub fn with_auto_create_path(mut self, auto_create: bool) -> Self {
        self.auto_create_path = auto_create;
        self
    }

    /// Set pretty-printing of JSON payloads (builder pattern).
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Set the segment wrapper character (builder pattern).
    pub fn with_wrapper(mut self, wrapper: char) -> Self {
        self.wrapper = wrapper;
        self
    }

    /// Set a fixed prefix for appended payloads (builder pattern).
    pub fn with_prepend(mut self, prefix: impl Into<String>) -> Self {
        self.prepend = Some(prefix.into());
        self
    }

    /// Set the size limit in megabytes, `None` to disable (builder pattern).
    pub fn with_size_limit_mb(mut self, limit: Option<f64>) -> Self {
        self.size_limit_mb = limit;
        self
    }

    /// Set whether rotation checks candidate sizes (builder pattern).
    pub fn with_check_file_size(mut self, check: bool) -> Self {
        self.check_file_size = check;
        self
    }

    /// Set the zero-pad width for rotation counters (builder pattern).
    pub fn with_pad_width(mut self, width: usize) -> Self {
        self.pad_width = width;
        self
    }

    /// Create options tuned for tests (tiny size limit, fast rotation).
    pub fn for_testing() -> Self {
        WriteOptions::default().with_size_limit_mb(Some(0.001)) // 1KB
    }
}

/// Options accepted by the facade read operations.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Resolve the path against the store's base directory (default: true).
    pub relative: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions { relative: true }
    }
}

impl ReadOptions {
    /// Create read options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set relative-path resolution (builder pattern).
    pub fn with_relative(mut self, relative: bool) -> Self {
        self.relative = relative;
        self
    }
}
