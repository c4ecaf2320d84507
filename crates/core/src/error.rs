//! Error types for the spool engine
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Every variant is `Clone`. A single physical write can complete a whole
//! batch of queued requests, and the same failure has to be fanned out to
//! each waiting caller. `std::io::Error` is not cloneable, so I/O failures
//! carry the `ErrorKind` and rendered message instead of the source error.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for spool operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the spool engine
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// I/O error (stat, open, read, write, create)
    #[error("I/O error ({kind:?}) at {}: {message}", path.display())]
    Io {
        /// Kind reported by the failed operation
        kind: io::ErrorKind,
        /// Path the operation was addressing
        path: PathBuf,
        /// Rendered message of the underlying error
        message: String,
    },

    /// No closing bracket inside the tail window, or an unsupported wrapper
    #[error("Bracket recognition failed at {}: {reason}", path.display())]
    BracketRecognition {
        /// Segment the scan ran against
        path: PathBuf,
        /// What the scan was looking for and did not find
        reason: String,
    },

    /// Content failed strict JSON parsing and the control-sweep retry
    #[error("Parse failure at {}: {message}", path.display())]
    Parse {
        /// File the content was read from
        path: PathBuf,
        /// Message from the strict parse attempt
        message: String,
    },

    /// Value could not be serialized to JSON
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invariant breakage inside the engine (dropped channels, poisoned state)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap an I/O failure together with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, err: io::Error) -> Self {
        Error::Io {
            kind: err.kind(),
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_display_io() {
        let err = Error::io(
            Path::new("logs/app.json"),
            io::Error::new(io::ErrorKind::NotFound, "file not found"),
        );
        let msg = err.to_string();
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("logs/app.json"));
        assert!(msg.contains("file not found"));
    }

    #[test]
    fn test_error_display_bracket_recognition() {
        let err = Error::BracketRecognition {
            path: PathBuf::from("data/events.json"),
            reason: "no closing bracket in the last 16 bytes".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Bracket recognition failed"));
        assert!(msg.contains("data/events.json"));
        assert!(msg.contains("16 bytes"));
    }

    #[test]
    fn test_error_display_parse() {
        let err = Error::Parse {
            path: PathBuf::from("data/events.json"),
            message: "expected value at line 1 column 2".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Parse failure"));
        assert!(msg.contains("line 1 column 2"));
    }

    #[test]
    fn test_error_display_serialization() {
        let err = Error::Serialization("key must be a string".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Serialization error"));
        assert!(msg.contains("key must be a string"));
    }

    #[test]
    fn test_error_display_internal() {
        let err = Error::Internal("completion channel dropped".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Internal error"));
        assert!(msg.contains("completion channel dropped"));
    }

    #[test]
    fn test_error_io_preserves_kind() {
        let err = Error::io(
            Path::new("x"),
            io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
        );
        match err {
            Error::Io { kind, .. } => assert_eq!(kind, io::ErrorKind::PermissionDenied),
            _ => panic!("Wrong error variant"),
        }
    }

    #[test]
    fn test_error_clone_for_batch_fanout() {
        // One failed write completes every request in the batch, so the
        // error must clone without losing information.
        let err = Error::io(
            Path::new("logs/app.json"),
            io::Error::new(io::ErrorKind::Other, "disk full"),
        );
        let copies: Vec<Error> = (0..3).map(|_| err.clone()).collect();
        for copy in copies {
            assert_eq!(copy.to_string(), err.to_string());
        }
    }

    #[test]
    fn test_error_from_serde_json() {
        let result: std::result::Result<serde_json::Value, _> = serde_json::from_str("not json");
        let err: Error = result.unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }

        fn returns_error() -> Result<i32> {
            Err(Error::Internal("test".to_string()))
        }

        assert_eq!(returns_result().unwrap(), 42);
        assert!(returns_error().is_err());
    }

    #[test]
    fn test_error_pattern_matching() {
        let err = Error::BracketRecognition {
            path: PathBuf::from("a.json"),
            reason: "unsupported wrapper '('".to_string(),
        };

        match err {
            Error::BracketRecognition { path, reason } => {
                assert_eq!(path, PathBuf::from("a.json"));
                assert!(reason.contains('('));
            }
            _ => panic!("Wrong error variant"),
        }
    }
}
