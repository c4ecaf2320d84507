//! Segment rotation policy.
//!
//! A logical stream rolls over to a new file once its current segment
//! crosses the size limit. Rotated names derive from the base name by a
//! zero-padded counter in front of the extension: `app.json` rolls to
//! `app0001.json`, then `app0002.json`, and so on. Within a process
//! lifetime counters only advance; a rotation walk never reuses or
//! decrements a name.
//!
//! The walk re-reads the directory on every call. Rollover decisions made
//! from a cached listing would go stale the moment another producer (or
//! process) creates the next segment.

use spool_core::{Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::debug;

/// Parsed form of a rotating segment name.
///
/// `app0003.json` splits into prefix `app`, counter 3, extension `json`.
/// A name without trailing digits parses with counter 0; the extension is
/// whatever follows the last dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentName {
    /// Stem up to the trailing digits.
    pub prefix: String,
    /// Trailing counter of the stem (0 when absent).
    pub counter: u64,
    /// Extension after the last dot, without the dot.
    pub ext: Option<String>,
}

impl SegmentName {
    /// Split a file name into prefix, trailing counter, and extension.
    pub fn parse(name: &str) -> Self {
        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) => (stem, Some(ext.to_string())),
            None => (name, None),
        };

        let digits_len = stem.chars().rev().take_while(|c| c.is_ascii_digit()).count();
        let (prefix, digits) = stem.split_at(stem.len() - digits_len);

        let counter = if digits.is_empty() {
            0
        } else {
            match digits.parse::<u64>() {
                Ok(n) => n,
                // A counter wider than u64 stays part of the prefix.
                Err(_) => {
                    return SegmentName {
                        prefix: stem.to_string(),
                        counter: 0,
                        ext,
                    }
                }
            }
        };

        SegmentName {
            prefix: prefix.to_string(),
            counter,
            ext,
        }
    }

    /// Render the name with the counter zero-padded to `pad_width`.
    pub fn format(&self, pad_width: usize) -> String {
        match &self.ext {
            Some(ext) => format!(
                "{}{:0width$}.{}",
                self.prefix,
                self.counter,
                ext,
                width = pad_width
            ),
            None => format!("{}{:0width$}", self.prefix, self.counter, width = pad_width),
        }
    }
}

/// Outcome of a rotation walk over a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationScan {
    /// First candidate the walk stopped at: a name that does not exist,
    /// or (with size checking) one that exists but is under the limit.
    pub next: String,
    /// Candidate visited immediately before `next`; with the walk still
    /// on its first candidate this is the base name itself.
    pub previous: String,
}

/// True when the file exists and its size is strictly over the limit.
///
/// `None` disables the check. The comparison uses decimal megabytes, so a
/// limit of 5.0 trips at 5,000,001 bytes.
pub async fn is_size_exceeded(path: &Path, limit_mb: Option<f64>) -> Result<bool> {
    let Some(limit) = limit_mb else {
        return Ok(false);
    };
    let size = match fs::metadata(path).await {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(Error::io(path, e)),
    };
    Ok(size as f64 / 1_000_000.0 > limit)
}

/// Walk rotation candidates for `file_name` against a fresh listing of
/// `dir`.
///
/// The first candidate is `file_name` exactly as given; later candidates
/// come from bumping the trailing counter and zero-padding it to
/// `pad_width`. The walk advances while the candidate exists and, when
/// `check_size` is set, is over `limit_mb`. With `check_size` off it
/// advances past every existing candidate, so `next` is the first unused
/// name and `previous` the highest existing one.
pub async fn scan_rotation(
    dir: &Path,
    file_name: &str,
    pad_width: usize,
    check_size: bool,
    limit_mb: Option<f64>,
) -> Result<RotationScan> {
    let mut listing = HashSet::new();
    let mut entries = fs::read_dir(dir).await.map_err(|e| Error::io(dir, e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::io(dir, e))?
    {
        listing.insert(entry.file_name().to_string_lossy().into_owned());
    }

    let mut name = SegmentName::parse(file_name);
    let mut candidate = file_name.to_string();
    let mut previous = candidate.clone();

    loop {
        let advance = listing.contains(&candidate)
            && (!check_size || is_size_exceeded(&dir.join(&candidate), limit_mb).await?);
        if !advance {
            if candidate != file_name {
                debug!(
                    dir = %dir.display(),
                    base = file_name,
                    next = %candidate,
                    "Rotation advanced segment name"
                );
            }
            return Ok(RotationScan {
                next: candidate,
                previous,
            });
        }
        previous = candidate;
        name.counter += 1;
        candidate = name.format(pad_width);
    }
}

/// Name of the newest existing segment for `file_name`, or the base name
/// itself when no segment exists yet.
pub async fn latest_segment_name(
    dir: &Path,
    file_name: &str,
    pad_width: usize,
) -> Result<String> {
    let scan = scan_rotation(dir, file_name, pad_width, false, None).await?;
    Ok(scan.previous)
}

/// Most-recently-modified file under `dir` whose name contains the stem
/// of `file_name`, searching subdirectories too.
///
/// Matching is by substring of the stem (the name up to the last dot), so
/// a query of `app.json` finds rotated segments like `app0003.json`.
/// Returns `Ok(None)` when nothing matches or the directory is missing.
pub async fn find_latest_by_stem(dir: &Path, file_name: &str) -> Result<Option<PathBuf>> {
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => file_name,
    };

    let mut best: Option<(SystemTime, PathBuf)> = None;
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let mut entries = match fs::read_dir(&current).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(Error::io(&current, e)),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::io(&current, e))?
        {
            let path = entry.path();
            let file_type = entry.file_type().await.map_err(|e| Error::io(&path, e))?;
            if file_type.is_dir() {
                stack.push(path);
                continue;
            }
            if !entry.file_name().to_string_lossy().contains(stem) {
                continue;
            }
            let modified = entry
                .metadata()
                .await
                .and_then(|meta| meta.modified())
                .map_err(|e| Error::io(&path, e))?;
            let newer = match &best {
                Some((latest, _)) => modified > *latest,
                None => true,
            };
            if newer {
                best = Some((modified, path));
            }
        }
    }
    Ok(best.map(|(_, path)| path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_name_with_counter() {
        let name = SegmentName::parse("app0003.json");
        assert_eq!(name.prefix, "app");
        assert_eq!(name.counter, 3);
        assert_eq!(name.ext.as_deref(), Some("json"));
    }

    #[test]
    fn test_parse_name_without_counter() {
        let name = SegmentName::parse("app.json");
        assert_eq!(name.prefix, "app");
        assert_eq!(name.counter, 0);
        assert_eq!(name.ext.as_deref(), Some("json"));
    }

    #[test]
    fn test_parse_name_without_extension() {
        let name = SegmentName::parse("app7");
        assert_eq!(name.prefix, "app");
        assert_eq!(name.counter, 7);
        assert_eq!(name.ext, None);
    }

    #[test]
    fn test_parse_splits_at_last_dot() {
        let name = SegmentName::parse("app.backup2.json");
        assert_eq!(name.prefix, "app.backup");
        assert_eq!(name.counter, 2);
        assert_eq!(name.ext.as_deref(), Some("json"));
    }

    #[test]
    fn test_parse_oversized_counter_stays_in_prefix() {
        let name = SegmentName::parse("app99999999999999999999.json");
        assert_eq!(name.prefix, "app99999999999999999999");
        assert_eq!(name.counter, 0);
    }

    #[test]
    fn test_format_pads_counter() {
        let mut name = SegmentName::parse("app.json");
        name.counter = 5;
        assert_eq!(name.format(4), "app0005.json");
        assert_eq!(name.format(6), "app000005.json");

        let mut bare = SegmentName::parse("segment");
        bare.counter = 12;
        assert_eq!(bare.format(4), "segment0012");
    }

    #[test]
    fn test_format_does_not_truncate_wide_counters() {
        let mut name = SegmentName::parse("app.json");
        name.counter = 123456;
        assert_eq!(name.format(4), "app123456.json");
    }

    #[tokio::test]
    async fn test_size_exceeded_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(!is_size_exceeded(&path, Some(0.000001)).await.unwrap());
    }

    #[tokio::test]
    async fn test_size_exceeded_limit_disabled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.json");
        std::fs::write(&path, vec![b'x'; 4096]).unwrap();
        assert!(!is_size_exceeded(&path, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_size_exceeded_strict_comparison() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("exact.json");
        std::fs::write(&path, vec![b'x'; 100]).unwrap();

        // 100 bytes is exactly 0.0001 MB; the comparison is strictly
        // greater, so the limit is not exceeded.
        assert!(!is_size_exceeded(&path, Some(0.0001)).await.unwrap());
        assert!(is_size_exceeded(&path, Some(0.000099)).await.unwrap());
    }

    #[tokio::test]
    async fn test_scan_missing_base_returns_base() {
        let dir = tempdir().unwrap();
        let scan = scan_rotation(dir.path(), "app.json", 4, true, Some(5.0))
            .await
            .unwrap();
        assert_eq!(scan.next, "app.json");
        assert_eq!(scan.previous, "app.json");
    }

    #[tokio::test]
    async fn test_scan_under_limit_keeps_current() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("app.json"), b"[1]").unwrap();

        let scan = scan_rotation(dir.path(), "app.json", 4, true, Some(5.0))
            .await
            .unwrap();
        assert_eq!(scan.next, "app.json");
    }

    #[tokio::test]
    async fn test_scan_over_limit_advances() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("app.json"), vec![b'x'; 64]).unwrap();

        let scan = scan_rotation(dir.path(), "app.json", 4, true, Some(0.00001))
            .await
            .unwrap();
        assert_eq!(scan.next, "app0001.json");
        assert_eq!(scan.previous, "app.json");
    }

    #[tokio::test]
    async fn test_scan_walks_past_full_segments() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("app.json"), vec![b'x'; 64]).unwrap();
        std::fs::write(dir.path().join("app0001.json"), vec![b'x'; 64]).unwrap();
        std::fs::write(dir.path().join("app0002.json"), vec![b'x'; 64]).unwrap();

        let scan = scan_rotation(dir.path(), "app.json", 4, true, Some(0.00001))
            .await
            .unwrap();
        assert_eq!(scan.next, "app0003.json");
    }

    #[tokio::test]
    async fn test_scan_stops_at_partial_segment() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("app.json"), vec![b'x'; 64]).unwrap();
        std::fs::write(dir.path().join("app0001.json"), b"[1]").unwrap();

        // app0001.json exists but is under the limit, so it is still the
        // writable segment.
        let scan = scan_rotation(dir.path(), "app.json", 4, true, Some(0.00001))
            .await
            .unwrap();
        assert_eq!(scan.next, "app0001.json");
    }

    #[tokio::test]
    async fn test_scan_without_size_check_finds_first_unused() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("app.json"), b"[1]").unwrap();
        std::fs::write(dir.path().join("app0001.json"), b"[1]").unwrap();

        let scan = scan_rotation(dir.path(), "app.json", 4, false, None)
            .await
            .unwrap();
        assert_eq!(scan.next, "app0002.json");
        assert_eq!(scan.previous, "app0001.json");
    }

    #[tokio::test]
    async fn test_latest_segment_name() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("app.json"), b"[1]").unwrap();
        std::fs::write(dir.path().join("app0001.json"), b"[1]").unwrap();
        std::fs::write(dir.path().join("app0002.json"), b"[1]").unwrap();

        let latest = latest_segment_name(dir.path(), "app.json", 4).await.unwrap();
        assert_eq!(latest, "app0002.json");
    }

    #[tokio::test]
    async fn test_latest_segment_name_empty_directory() {
        let dir = tempdir().unwrap();
        let latest = latest_segment_name(dir.path(), "app.json", 4).await.unwrap();
        assert_eq!(latest, "app.json");
    }

    #[tokio::test]
    async fn test_find_latest_by_stem_scans_subdirectories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("2026-08-25");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("app.json"), b"[1]").unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        std::fs::write(nested.join("app0001.json"), b"[1]").unwrap();

        let latest = find_latest_by_stem(dir.path(), "app.json").await.unwrap();
        assert_eq!(latest, Some(nested.join("app0001.json")));
    }

    #[tokio::test]
    async fn test_find_latest_by_stem_ignores_other_names() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("other.json"), b"[1]").unwrap();

        let latest = find_latest_by_stem(dir.path(), "app.json").await.unwrap();
        assert_eq!(latest, None);
    }

    #[tokio::test]
    async fn test_find_latest_by_stem_missing_directory() {
        let dir = tempdir().unwrap();
        let latest = find_latest_by_stem(&dir.path().join("absent"), "app.json")
            .await
            .unwrap();
        assert_eq!(latest, None);
    }

    #[tokio::test]
    async fn test_scan_preserves_explicit_counter() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("app0007.json"), vec![b'x'; 64]).unwrap();

        let scan = scan_rotation(dir.path(), "app0007.json", 4, true, Some(0.00001))
            .await
            .unwrap();
        assert_eq!(scan.next, "app0008.json");
    }
}
