//! Incremental segment writer.
//!
//! The writer keeps a segment valid JSON between any two completed
//! operations without ever rewriting its body. A fresh or overwritten
//! segment is laid down as a stub (opening wrapper, first element, closing
//! wrapper); every later append patches only the tail: it reads the final
//! [`TAIL_WINDOW`] bytes, finds the closing wrapper inside them, and
//! rewrites the file from that offset with the new element spliced in
//! front of the old tail fragment.
//!
//! Callers are expected to hold the path's write lock for the whole call.
//! Two interleaved appends to the same path would both compute the tail
//! offset from the same stale size and corrupt each other's splice.

use crate::format::{
    is_closing_bracket, is_opening_bracket, opposite_bracket, ELEMENT_SEPARATOR, TAIL_WINDOW,
};
use spool_core::{Error, Result};
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, trace};

/// Append one serialized element to a continuous-JSON segment.
///
/// `element` must already be serialized; for a merged batch it is the
/// comma-joined payload of every member. Returns the number of bytes
/// handed to the filesystem.
///
/// Dispatch:
/// - missing, empty, or `overwrite` set: write a fresh stub
/// - existing non-empty file: patch the tail
///
/// The stub path performs two physical writes with no atomicity across
/// the pair. If the second fails the file is left as a one-byte dangling
/// stub, which later appends reject (no closing bracket in the tail)
/// instead of corrupting.
pub async fn append_record(
    path: &Path,
    element: &str,
    wrapper: char,
    overwrite: bool,
) -> Result<u64> {
    // Unsupported wrappers fail before the file is even stat'ed.
    let closer = opposite_bracket(path, wrapper)?;

    let size = match fs::metadata(path).await {
        Ok(meta) => Some(meta.len()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(Error::io(path, e)),
    };

    match size {
        Some(len) if len > 0 && !overwrite => splice_into_tail(path, len, element).await,
        _ => write_stub(path, element, wrapper, closer).await,
    }
}

/// Lay down a fresh segment: wrapper byte, then element plus closer.
async fn write_stub(path: &Path, element: &str, wrapper: char, closer: char) -> Result<u64> {
    debug!(path = %path.display(), wrapper = %wrapper, "Creating segment stub");

    fs::write(path, &[wrapper as u8])
        .await
        .map_err(|e| Error::io(path, e))?;

    let mut rest = String::with_capacity(element.len() + 1);
    rest.push_str(element);
    rest.push(closer);

    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .await
        .map_err(|e| Error::io(path, e))?;
    file.write_all(rest.as_bytes())
        .await
        .map_err(|e| Error::io(path, e))?;
    file.flush().await.map_err(|e| Error::io(path, e))?;

    Ok(1 + rest.len() as u64)
}

/// Patch the tail of an existing segment.
///
/// Reads the final `min(size, TAIL_WINDOW)` bytes, scans them backwards
/// for a closing bracket, and rewrites the file from the bracket's
/// absolute offset with `separator + element + old tail fragment`. The
/// separator is omitted for an element-free segment (nothing but
/// whitespace between the wrapper pair), so a seeded `[]` takes its
/// first element cleanly.
async fn splice_into_tail(path: &Path, size: u64, element: &str) -> Result<u64> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .await
        .map_err(|e| Error::io(path, e))?;

    let window = size.min(TAIL_WINDOW);
    let start = size - window;
    file.seek(SeekFrom::Start(start))
        .await
        .map_err(|e| Error::io(path, e))?;
    let mut tail = vec![0u8; window as usize];
    file.read_exact(&mut tail)
        .await
        .map_err(|e| Error::io(path, e))?;

    // Backwards scan finds the last closing bracket of the file, which in
    // a well-formed segment is the closing wrapper itself.
    let hit = tail
        .iter()
        .rposition(|b| is_closing_bracket(*b))
        .ok_or_else(|| Error::BracketRecognition {
            path: path.to_path_buf(),
            reason: format!("no closing bracket in the last {window} bytes"),
        })?;
    let bracket_offset = start + hit as u64;
    trace!(
        path = %path.display(),
        size,
        bracket_offset,
        "Tail scan located closing wrapper"
    );

    // Element-free segments are only recognizable when the window covers
    // the whole file; anything longer has element bytes out of view and
    // gets the separator.
    let empty = start == 0
        && is_opening_bracket(tail[0])
        && tail[1..hit].iter().all(|b| b.is_ascii_whitespace());

    let mut patch = Vec::with_capacity(1 + element.len() + tail.len() - hit);
    if !empty {
        patch.push(ELEMENT_SEPARATOR);
    }
    patch.extend_from_slice(element.as_bytes());
    patch.extend_from_slice(&tail[hit..]);

    file.seek(SeekFrom::Start(bracket_offset))
        .await
        .map_err(|e| Error::io(path, e))?;
    file.write_all(&patch)
        .await
        .map_err(|e| Error::io(path, e))?;
    file.flush().await.map_err(|e| Error::io(path, e))?;

    Ok(patch.len() as u64)
}

/// Write raw bytes, creating or truncating the target.
pub async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<u64> {
    fs::write(path, bytes)
        .await
        .map_err(|e| Error::io(path, e))?;
    Ok(bytes.len() as u64)
}

/// Append raw bytes, creating the target when missing.
pub async fn append_bytes(path: &Path, bytes: &[u8]) -> Result<u64> {
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .await
        .map_err(|e| Error::io(path, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| Error::io(path, e))?;
    file.flush().await.map_err(|e| Error::io(path, e))?;
    Ok(bytes.len() as u64)
}
