//! Path normalization and modification-time sampling
//!
//! Cache map keys must be stable across platforms that share one cache root
//! (for example over a network share), so every key is an absolute path with
//! forward slashes only. Case folding follows the host OS convention: paths
//! are lowercased on Windows and left untouched on POSIX systems, where case
//! is significant.

use crate::error::{CacheError, CacheResult};
use crate::time::datetime_to_iso;
use chrono::DateTime;
use filetime::FileTime;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Transform a path into an absolute, case-normalized path with forward slashes
///
/// Relative paths are resolved against the current working directory. `.` and
/// `..` components are collapsed lexically; symlinks are not resolved.
pub fn normalize_path(path: &Path) -> CacheResult<String> {
    let absolute = absolutize(path)?;
    let text = normcase(&absolute.to_string_lossy());
    Ok(text.replace('\\', "/"))
}

fn absolutize(path: &Path) -> CacheResult<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| CacheError::io("getting current directory", e))?
            .join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

#[cfg(windows)]
fn normcase(path: &str) -> String {
    path.to_lowercase().replace('/', "\\")
}

#[cfg(not(windows))]
fn normcase(path: &str) -> String {
    path.to_string()
}

/// Last modified time of a file or directory in epoch seconds
///
/// Returns `None` when the path does not exist or cannot be inspected.
pub fn modified_time(path: &Path) -> Option<f64> {
    let meta = fs::metadata(path).ok()?;
    let mtime = FileTime::from_last_modification_time(&meta);
    Some(mtime.unix_seconds() as f64 + f64::from(mtime.nanoseconds()) / 1e9)
}

/// Last modified time of a file or directory as a cache map timestamp
///
/// The time is floored to whole seconds before formatting, so the result
/// always ends in `.000Z`. Returns `None` when the path does not exist or
/// cannot be inspected; callers comparing against a recorded value treat that
/// as "modified".
pub fn modified_time_iso(path: &Path) -> Option<String> {
    let meta = fs::metadata(path).ok()?;
    let secs = FileTime::from_last_modification_time(&meta).unix_seconds();
    DateTime::from_timestamp(secs, 0).map(|dt| datetime_to_iso(&dt))
}
