//! JSON helpers shared by the segment writer and the facade
//!
//! This module owns the two JSON conversions the engine performs:
//! - Serialization of caller values before they enter the write pipeline
//! - Tolerant parsing of segment content on the read side
//!
//! # Tolerant parsing
//!
//! Segments are patched in place at the byte level, and files occasionally
//! pick up stray control characters (editor artifacts, truncated escapes
//! from older tooling). Reads therefore try a strict parse first and, when
//! that fails, strip every control character in `U+0000..=U+0019` and retry
//! once. Only when both attempts fail does the read surface a parse error,
//! carrying the message of the strict attempt.

use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// Highest code point removed by the tolerant-parse sweep (U+0019)
///
/// The sweep removes the sub-space control range, which covers every
/// control byte that makes strict parsers reject otherwise sound content.
/// Characters from U+0020 (space) upward are never touched.
pub const CONTROL_SWEEP_MAX: char = '\u{19}';

/// Parse bytes as JSON, tolerating stray control characters.
///
/// `path` only tags the error; no I/O happens here.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use spool_core::json::parse_lenient;
///
/// let noisy = b"[{\"a\":1},\x02{\"a\":2}]";
/// let value = parse_lenient(Path::new("log.json"), noisy).unwrap();
/// assert_eq!(value.as_array().unwrap().len(), 2);
/// ```
pub fn parse_lenient(path: &Path, bytes: &[u8]) -> Result<Value> {
    match serde_json::from_slice(bytes) {
        Ok(value) => Ok(value),
        Err(strict_err) => {
            let swept: String = String::from_utf8_lossy(bytes)
                .chars()
                .filter(|c| *c > CONTROL_SWEEP_MAX)
                .collect();
            serde_json::from_str(&swept).map_err(|_| Error::Parse {
                path: path.to_path_buf(),
                message: strict_err.to_string(),
            })
        }
    }
}

/// Serialize a value to compact JSON.
pub fn serialize<T>(value: &T) -> Result<String>
where
    T: Serialize + ?Sized,
{
    Ok(serde_json::to_string(value)?)
}

/// Serialize a value to pretty-printed JSON.
///
/// Pretty output is meant for standalone files; continuous-JSON segments
/// stay compact so the closing bracket sits inside the appender's tail
/// window.
pub fn serialize_pretty<T>(value: &T) -> Result<String>
where
    T: Serialize + ?Sized,
{
    Ok(serde_json::to_string_pretty(value)?)
}
