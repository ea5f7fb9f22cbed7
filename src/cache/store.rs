//! The file handle cache
//!
//! Every mutation of a cache map happens while holding the `.cacheMap` lock
//! of that cache directory, so writers in different threads and processes
//! are serialized per content identifier. Different identifiers never
//! contend with each other.

use super::map::{CacheMap, CACHE_MAP_FILE_NAME};
use crate::config::schema::{Config, LockConfig};
use crate::dozer::{ListenerRegistry, DEFAULT_LISTENER_CHECK_INTERVAL};
use crate::error::{CacheError, CacheResult};
use crate::lock::{Lock, DEFAULT_BLOCKING_TIMEOUT, DEFAULT_MAX_AGE, DEFAULT_POLL_INTERVAL};
use crate::path::{modified_time_iso, normalize_path};
use crate::time::iso_to_datetime;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::ErrorKind;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Number of buckets content identifiers are spread over
pub const DEFAULT_BUCKET_SIZE: NonZeroU64 = match NonZeroU64::new(1000) {
    Some(size) => size,
    None => unreachable!(),
};

/// Directory name of the cache root inside the home directory
pub const DEFAULT_CACHE_DIR_NAME: &str = ".synapseCache";

/// The per-user cache root shared by every client on this machine
pub fn default_cache_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_CACHE_DIR_NAME)
}

/// How the cache builds the locks guarding its cache maps
#[derive(Debug, Clone)]
pub struct LockSettings {
    /// Age after which a cache map lock may be broken
    pub max_age: Duration,
    /// How long an operation waits for a cache map lock
    pub blocking_timeout: Duration,
    /// Pause between acquisition attempts
    pub poll_interval: Duration,
    /// How often listeners run while waiting
    pub listener_check_interval: Duration,
    /// Listeners invoked while waiting
    pub listeners: ListenerRegistry,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            blocking_timeout: DEFAULT_BLOCKING_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            listener_check_interval: DEFAULT_LISTENER_CHECK_INTERVAL,
            listeners: ListenerRegistry::default(),
        }
    }
}

impl From<&LockConfig> for LockSettings {
    fn from(config: &LockConfig) -> Self {
        Self {
            max_age: Duration::from_secs(config.max_age_secs),
            blocking_timeout: Duration::from_secs(config.blocking_timeout_secs),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            listener_check_interval: Duration::from_millis(config.listener_check_interval_ms),
            listeners: ListenerRegistry::default(),
        }
    }
}

/// Maps content identifiers to the local files holding their content
///
/// The cache for identifier `id` lives in `<root>/<id % bucket_size>/<id>/`
/// and records its files in the `.cacheMap` file there. Identifiers are
/// unsigned; negative ids have no cache directory.
#[derive(Debug, Clone)]
pub struct Cache {
    root: PathBuf,
    bucket_size: NonZeroU64,
    lock_settings: LockSettings,
}

impl Cache {
    /// Create a cache rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            bucket_size: DEFAULT_BUCKET_SIZE,
            lock_settings: LockSettings::default(),
        }
    }

    /// Create a cache in the default per-user location
    pub fn open_default() -> Self {
        Self::new(default_cache_root())
    }

    /// Create a cache from loaded configuration
    pub fn from_config(config: &Config) -> CacheResult<Self> {
        let root = config
            .cache
            .root_dir
            .clone()
            .unwrap_or_else(default_cache_root);
        let bucket_size = NonZeroU64::new(config.cache.bucket_size).ok_or_else(|| {
            CacheError::invalid_argument("cache.bucket_size must be greater than zero")
        })?;
        Ok(Self::new(root)
            .with_bucket_size(bucket_size)
            .with_lock_settings(LockSettings::from(&config.lock)))
    }

    /// Spread identifiers over `bucket_size` bucket directories
    pub fn with_bucket_size(mut self, bucket_size: NonZeroU64) -> Self {
        self.bucket_size = bucket_size;
        self
    }

    /// Use these settings for every cache map lock
    pub fn with_lock_settings(mut self, settings: LockSettings) -> Self {
        self.lock_settings = settings;
        self
    }

    /// The cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The number of bucket directories
    pub fn bucket_size(&self) -> NonZeroU64 {
        self.bucket_size
    }

    /// The listeners invoked while waiting on cache map locks
    pub fn listeners(&self) -> &ListenerRegistry {
        &self.lock_settings.listeners
    }

    /// The cache directory assigned to `id`
    pub fn cache_dir(&self, id: u64) -> PathBuf {
        self.root
            .join((id % self.bucket_size.get()).to_string())
            .join(id.to_string())
    }

    /// Registered paths for `id` whose files are unmodified since registration
    ///
    /// A path is included only when the file's current modification time
    /// equals the recorded one exactly. Paths whose files no longer exist are
    /// left out.
    pub fn list_unmodified_paths(&self, id: u64) -> CacheResult<Vec<String>> {
        let cache_dir = self.cache_dir(id);
        if !cache_dir.is_dir() {
            return Ok(Vec::new());
        }

        let map = self.read_map(&cache_dir)?;
        let unmodified: Vec<String> = map
            .iter()
            .filter(|(path, recorded)| {
                modified_time_iso(Path::new(path)).as_deref() == Some(*recorded)
            })
            .map(|(path, _)| path.to_string())
            .collect();

        debug!(
            "Cache {} has {} of {} paths unmodified",
            id,
            unmodified.len(),
            map.len()
        );
        Ok(unmodified)
    }

    /// Whether `path` is unmodified since it was registered under `id`
    ///
    /// A path that was never registered counts as unmodified.
    pub fn is_unmodified(&self, id: u64, path: &Path) -> CacheResult<bool> {
        let cache_dir = self.cache_dir(id);
        let key = normalize_path(path)?;
        if !cache_dir.is_dir() {
            return Ok(true);
        }

        let map = self.read_map(&cache_dir)?;
        Ok(match map.get(&key) {
            None => true,
            Some(recorded) => modified_time_iso(path).as_deref() == Some(recorded),
        })
    }

    /// Register `path` as holding the content of `id`
    ///
    /// Records the file's current modification time under its normalized
    /// path, replacing any earlier record for the same path, and returns the
    /// updated map.
    pub fn register(&self, id: u64, path: &Path) -> CacheResult<CacheMap> {
        if path.as_os_str().is_empty() || !path.exists() {
            return Err(CacheError::invalid_argument(format!(
                "Can't find file \"{}\"",
                path.display()
            )));
        }

        let cache_dir = self.cache_dir(id);
        let key = normalize_path(path)?;
        let modified = modified_time_iso(path).ok_or_else(|| {
            CacheError::invalid_argument(format!("Can't find file \"{}\"", path.display()))
        })?;

        let mut lock = self.lock_for(&cache_dir);
        let _guard = lock.lock()?;
        let mut map = CacheMap::read(&cache_dir)?;
        map.insert(key.clone(), modified);
        map.write(&cache_dir)?;

        info!("Registered {} for {}", key, id);
        Ok(map)
    }

    /// Remove registrations for `id`
    ///
    /// With `path`, only that registration is removed; without it, every
    /// registration for `id` is. When `delete_file` is set the corresponding
    /// files are deleted as well, on a best-effort basis: a failed deletion is
    /// logged and the registration is removed anyway. The updated map is
    /// always written back. Returns the removed paths.
    pub fn remove(&self, id: u64, path: Option<&Path>, delete_file: bool) -> CacheResult<Vec<String>> {
        let cache_dir = self.cache_dir(id);
        let key = path.map(normalize_path).transpose()?;

        let mut lock = self.lock_for(&cache_dir);
        let _guard = lock.lock()?;
        let mut map = CacheMap::read(&cache_dir)?;

        let mut removed = Vec::new();
        match key {
            None => {
                for (path, _) in map.take() {
                    if delete_file {
                        delete_file_best_effort(Path::new(&path));
                    }
                    removed.push(path);
                }
            }
            Some(key) => {
                let recorded = map.remove(&key).is_some();
                let deleted = delete_file && delete_file_best_effort(Path::new(&key));
                if recorded || deleted {
                    removed.push(key);
                }
            }
        }
        map.write(&cache_dir)?;

        info!("Removed {} path(s) for {}", removed.len(), id);
        Ok(removed)
    }

    /// Remove every registration recorded before `before`
    ///
    /// Files of removed registrations are deleted when they exist. A cache
    /// directory left without registrations is deleted entirely. With
    /// `dry_run` nothing is changed and the paths that would be removed are
    /// returned.
    pub fn purge(&self, before: DateTime<Utc>, dry_run: bool) -> CacheResult<Vec<String>> {
        let mut removed = Vec::new();
        for cache_dir in cache_dirs(&self.root)? {
            removed.extend(self.purge_cache_dir(&cache_dir, before, dry_run)?);
        }

        if dry_run {
            info!("Purge dry run: {} path(s) would be removed", removed.len());
        } else {
            info!("Purged {} path(s) recorded before {}", removed.len(), before);
        }
        Ok(removed)
    }

    fn purge_cache_dir(
        &self,
        cache_dir: &Path,
        before: DateTime<Utc>,
        dry_run: bool,
    ) -> CacheResult<Vec<String>> {
        let mut lock = self.lock_for(cache_dir);
        let _guard = lock.lock()?;
        let map = CacheMap::read(cache_dir)?;

        // every timestamp is parsed before any file is touched
        let mut removed = Vec::new();
        let mut retained = CacheMap::new();
        for (path, recorded) in map {
            if iso_to_datetime(&recorded)? < before {
                removed.push(path);
            } else {
                retained.insert(path, recorded);
            }
        }

        if dry_run {
            return Ok(removed);
        }

        for path in &removed {
            delete_file_best_effort(Path::new(path));
        }

        if retained.is_empty() {
            debug!("Deleting emptied cache directory {}", cache_dir.display());
            // takes the lock directory with it, so the guard has nothing left to release
            match fs::remove_dir_all(cache_dir) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(CacheError::io(
                        format!("deleting cache directory {}", cache_dir.display()),
                        e,
                    ))
                }
            }
        } else {
            retained.write(cache_dir)?;
        }
        Ok(removed)
    }

    /// Read a cache map under its lock; a missing map reads as empty
    fn read_map(&self, cache_dir: &Path) -> CacheResult<CacheMap> {
        if !CacheMap::file_path(cache_dir).exists() {
            return Ok(CacheMap::new());
        }
        let mut lock = self.lock_for(cache_dir);
        let _guard = lock.lock()?;
        CacheMap::read(cache_dir)
    }

    fn lock_for(&self, cache_dir: &Path) -> Lock {
        let settings = &self.lock_settings;
        Lock::new(CACHE_MAP_FILE_NAME, cache_dir)
            .with_max_age(settings.max_age)
            .with_default_blocking_timeout(settings.blocking_timeout)
            .with_poll_interval(settings.poll_interval)
            .with_listener_check_interval(settings.listener_check_interval)
            .with_listeners(settings.listeners.clone())
    }
}

/// Delete a file if it exists, logging failures
///
/// Returns whether a file was deleted.
fn delete_file_best_effort(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Deleted {}", path.display());
            true
        }
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Failed to delete {}: {}", path.display(), e);
            false
        }
    }
}

/// Every cache directory under `root`, of the form `<root>/949/59949`
///
/// Only directories whose bucket and identifier names are both purely
/// numeric are returned, in ascending numeric order.
pub fn cache_dirs(root: &Path) -> CacheResult<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for bucket in numeric_subdirs(root)? {
        dirs.extend(numeric_subdirs(&bucket)?);
    }
    Ok(dirs)
}

fn numeric_subdirs(dir: &Path) -> CacheResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(CacheError::io(
                format!("reading cache directory {}", dir.display()),
                e,
            ))
        }
    };

    let mut found = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| CacheError::io(format!("reading entry of {}", dir.display()), e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !is_numeric(name) {
            continue;
        }
        let is_dir = entry
            .file_type()
            .map_err(|e| CacheError::io(format!("inspecting {}", entry.path().display()), e))?
            .is_dir();
        if is_dir {
            found.push((name.to_string(), entry.path()));
        }
    }

    // numeric order without parsing: shorter digit strings are smaller
    found.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    Ok(found.into_iter().map(|(_, path)| path).collect())
}

fn is_numeric(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

/// The content identifier a cache directory belongs to
///
/// `<root>/543/678543` belongs to `678543`.
pub fn file_handle_id_of(cache_dir: &Path) -> Option<u64> {
    cache_dir.file_name()?.to_str()?.parse().ok()
}
