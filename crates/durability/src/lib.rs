//! Durability layer for spool
//!
//! This crate handles everything that touches disk:
//!
//! - Segment format: wrapped, comma-joined continuous-JSON files
//! - Incremental appends: tail-window patching instead of whole-file writes
//! - Rotation: size-driven rollover to zero-padded successor names
//! - Raw file helpers used by the facade's plain write and append paths

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod format; // Segment layout, tail window, wrapper brackets
pub mod rotation; // Size checks and rotation-name walks
pub mod segment; // Stub creation and tail patching

pub use format::{is_closing_bracket, opposite_bracket, ELEMENT_SEPARATOR, TAIL_WINDOW};
pub use rotation::{
    find_latest_by_stem, is_size_exceeded, latest_segment_name, scan_rotation, RotationScan,
    SegmentName,
};
pub use segment::{append_bytes, append_record, write_bytes};
