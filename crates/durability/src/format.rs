//! On-disk format of continuous-JSON segments.
//!
//! A segment is one file holding a wrapped, comma-joined sequence of JSON
//! elements:
//!
//! ```text
//! ┌───┬─────────┬───┬─────────┬───┬─────────┬───┐
//! │ [ │ element │ , │ element │ , │ element │ ] │
//! └───┴─────────┴───┴─────────┴───┴─────────┴───┘
//!                                  ◄─ tail window ─►
//!                                    (last 16 bytes)
//! ```
//!
//! The wrapper pair is `[`/`]` or `{`/`}`, chosen per stream. Appends never
//! rewrite the body: the writer reads only the final [`TAIL_WINDOW`] bytes,
//! locates the closing wrapper inside them, and splices the new element in
//! front of it. Bytes before the tail window are never touched, so the cost
//! of an append does not grow with segment size.
//!
//! The tail window is a hard constant. A segment whose closing wrapper sits
//! further than [`TAIL_WINDOW`] bytes from the end (trailing padding, pretty
//! formatting) is outside the format, and appends to it fail rather than
//! guess at an offset.

use spool_core::{Error, Result};
use std::path::Path;

/// Bytes read from the end of a segment to locate the closing wrapper.
///
/// Fixed at 16. Compact serialization puts the closing wrapper within a few
/// bytes of the end; 16 leaves room for a trailing newline or stray
/// whitespace without ever scanning element content.
pub const TAIL_WINDOW: u64 = 16;

/// Separator written between elements of a segment.
pub const ELEMENT_SEPARATOR: u8 = b',';

/// Map an opening wrapper to its closing counterpart.
///
/// `path` only tags the error for unsupported wrappers; no I/O happens
/// here. Callers run this before touching the file so a bad wrapper never
/// reaches the write path.
pub fn opposite_bracket(path: &Path, wrapper: char) -> Result<char> {
    match wrapper {
        '[' => Ok(']'),
        '{' => Ok('}'),
        other => Err(Error::BracketRecognition {
            path: path.to_path_buf(),
            reason: format!("wrapper '{other}' has no known closing bracket"),
        }),
    }
}

/// True for the two closing wrapper bytes the tail scan recognizes.
///
/// The scan accepts either closer regardless of the configured wrapper: the
/// last closing bracket of a well-formed segment is always the wrapper's
/// own, and accepting both keeps the scan independent of per-call options.
pub fn is_closing_bracket(byte: u8) -> bool {
    byte == b']' || byte == b'}'
}

/// True for the two opening wrapper bytes.
pub fn is_opening_bracket(byte: u8) -> bool {
    byte == b'[' || byte == b'{'
}
