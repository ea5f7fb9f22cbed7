//! The `.cacheMap` file of a cache directory
//!
//! A JSON object mapping normalized local paths to the ISO modification time
//! recorded when the path was registered:
//!
//! ```json
//! {"/home/me/data/a.csv":"2019-07-01T00:03:01.000Z"}
//! ```
//!
//! The file always ends with a newline; some JSON readers sharing the cache
//! root expect one.

use crate::error::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File name of the cache map inside a cache directory
pub const CACHE_MAP_FILE_NAME: &str = ".cacheMap";

/// Recorded modification times keyed by normalized path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheMap {
    entries: BTreeMap<String, String>,
}

impl CacheMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the map file inside `cache_dir`
    pub fn file_path(cache_dir: &Path) -> PathBuf {
        cache_dir.join(CACHE_MAP_FILE_NAME)
    }

    /// Read the map stored in `cache_dir`
    ///
    /// A map file that was never written reads as an empty map.
    pub fn read(cache_dir: &Path) -> CacheResult<Self> {
        let path = Self::file_path(cache_dir);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => {
                return Err(CacheError::io(
                    format!("reading cache map {}", path.display()),
                    e,
                ))
            }
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the map into `cache_dir`, creating the directory if needed
    ///
    /// The file is produced by a single create/write/close so that readers
    /// not holding the lock see either the old or the complete new content
    /// on filesystems where small writes land at once.
    pub fn write(&self, cache_dir: &Path) -> CacheResult<()> {
        fs::create_dir_all(cache_dir).map_err(|e| {
            CacheError::io(
                format!("creating cache directory {}", cache_dir.display()),
                e,
            )
        })?;

        let path = Self::file_path(cache_dir);
        let mut content = serde_json::to_string(self)?;
        content.push('\n');
        fs::write(&path, content)
            .map_err(|e| CacheError::io(format!("writing cache map {}", path.display()), e))
    }

    /// Record `modified` for `path`, returning the previous value
    pub fn insert(&mut self, path: impl Into<String>, modified: impl Into<String>) -> Option<String> {
        self.entries.insert(path.into(), modified.into())
    }

    /// Drop the entry for `path`
    pub fn remove(&mut self, path: &str) -> Option<String> {
        self.entries.remove(path)
    }

    /// The recorded time for `path`
    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    /// Whether `path` is recorded
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Recorded paths, in key order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `(path, recorded time)` pairs, in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(path, time)| (path.as_str(), time.as_str()))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return every entry
    pub fn take(&mut self) -> CacheMap {
        std::mem::take(self)
    }
}

impl IntoIterator for CacheMap {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, String)> for CacheMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
