//! Dated activity journal.
//!
//! The journal is a thin layer over [`Store`]: one folder per UTC day,
//! one continuous-JSON segment per entry name, each element wrapped with
//! the moment it was recorded. Error records get their own folder tree
//! and, unlike everything else in this crate, never fail outward: a
//! journal that cannot write its own error report drops the record after
//! a `tracing` warning instead of handing the failure back.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use spool_core::{Result, WriteOptions, WriteReceipt};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::store::Store;

/// Folders journal output lands in, relative to the store base.
#[derive(Debug, Clone)]
pub struct JournalConfig {
    /// Folder for regular entries.
    pub log_dir: PathBuf,
    /// Folder for error records.
    pub error_dir: PathBuf,
}

impl Default for JournalConfig {
    fn default() -> Self {
        JournalConfig {
            log_dir: PathBuf::from("logging"),
            error_dir: PathBuf::from("logging"),
        }
    }
}

impl JournalConfig {
    /// Config with both folders set to `logging/`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the folder for regular entries (builder pattern).
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Set the folder for error records (builder pattern).
    pub fn with_error_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.error_dir = dir.into();
        self
    }
}

/// Append-only journal with one folder per UTC day.
#[derive(Debug, Clone)]
pub struct Journal {
    store: Store,
    config: JournalConfig,
}

#[derive(Debug, Serialize)]
struct JournalRecord<'a, T: Serialize + ?Sized> {
    timestamp: String,
    data: &'a T,
}

#[derive(Debug, Serialize)]
struct ErrorRecord<'a> {
    timestamp: String,
    signature: &'a str,
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a serde_json::Value>,
}

impl Journal {
    /// Journal writing through `store` with the default folders.
    pub fn new(store: Store) -> Self {
        Journal {
            store,
            config: JournalConfig::default(),
        }
    }

    /// Journal with explicit folder configuration.
    pub fn with_config(store: Store, config: JournalConfig) -> Self {
        Journal { store, config }
    }

    /// Append `data` to `<log_dir>/<YYYY-MM-DD>/<name>.json`.
    ///
    /// The element on disk is `{"timestamp": "<RFC 3339 UTC>", "data": ...}`.
    pub async fn write_entry<T: Serialize + ?Sized>(
        &self,
        name: &str,
        data: &T,
    ) -> Result<WriteReceipt> {
        let dir = self.config.log_dir.join(today());
        self.write_entry_at(&dir, name, data).await
    }

    /// Like [`write_entry`](Self::write_entry), nested one folder deeper:
    /// `<log_dir>/<YYYY-MM-DD>/<subfolder>/<name>.json`.
    ///
    /// The dated folder stays on top; the subfolder partitions within
    /// the day.
    pub async fn write_entry_in<T: Serialize + ?Sized>(
        &self,
        subfolder: &str,
        name: &str,
        data: &T,
    ) -> Result<WriteReceipt> {
        let dir = self.config.log_dir.join(today()).join(subfolder);
        self.write_entry_at(&dir, name, data).await
    }

    /// Append an entry under an explicit folder instead of the dated one.
    pub async fn write_entry_at<T: Serialize + ?Sized>(
        &self,
        dir: &Path,
        name: &str,
        data: &T,
    ) -> Result<WriteReceipt> {
        let record = JournalRecord {
            timestamp: now_stamp(),
            data,
        };
        let path = dir.join(format!("{name}.json"));
        self.store
            .write_continuous_json(path, &record, &Self::options())
            .await
    }

    /// Record an error under `<error_dir>/logger/<YYYY-MM-DD>/errors.json`.
    ///
    /// `signature` tags the reporting call site. This method cannot fail:
    /// a write error is logged and the record dropped, so error reporting
    /// never turns into another error to report.
    pub async fn record_error(
        &self,
        signature: &str,
        error_text: &str,
        context: Option<&serde_json::Value>,
    ) {
        let record = ErrorRecord {
            timestamp: now_stamp(),
            signature,
            error: error_text,
            context,
        };
        let path = self
            .config
            .error_dir
            .join("logger")
            .join(today())
            .join("errors.json");
        if let Err(err) = self
            .store
            .write_continuous_json(&path, &record, &Self::options())
            .await
        {
            warn!(
                path = %path.display(),
                error = %err,
                "Error journal write failed; record dropped"
            );
        }
    }

    fn options() -> WriteOptions {
        WriteOptions::new().with_auto_create_path(true)
    }
}

fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

fn now_stamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
