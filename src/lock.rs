//! Advisory cross-process lock backed by a directory
//!
//! A lock named `foo` in directory `cwd` is the directory `cwd/foo.lock`.
//! There is no portable atomic "check whether a file exists and create it"
//! operation, but directory creation is atomic everywhere: when several
//! processes race to create the same directory, exactly one succeeds. That
//! creation is the only source of mutual exclusion here.
//!
//! The lock directory's modification time is the only persisted state. A
//! holder stamps it on acquisition and renewal and remembers the stamp; a
//! [`Lock`] only believes it holds the lock while the directory's mtime still
//! matches its own last stamp, so a holder whose lock was broken as stale
//! notices it has been preempted.
//!
//! ```no_run
//! use fhcache::lock::Lock;
//! use std::time::Duration;
//!
//! # fn main() -> fhcache::CacheResult<()> {
//! let mut lock = Lock::new("foo", "/tmp").with_max_age(Duration::from_secs(5));
//! {
//!     let _guard = lock.lock()?;
//!     // critical section
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Nesting
//!
//! Two `Lock` values with the same name are independent contenders even on one
//! thread. Acquiring one while an enclosing scope holds the other does not
//! re-enter: the inner acquisition waits until the outer lock ages past
//! `max_age`, breaks it, and its release then leaves the outer scope running
//! without the lock. Do not nest locks on the same name.

use crate::dozer::{doze, ListenerRegistry, DEFAULT_LISTENER_CHECK_INTERVAL};
use crate::error::{CacheError, CacheResult};
use crate::time::system_time_to_iso;
use filetime::FileTime;
use std::fs;
use std::io::ErrorKind;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, trace, warn};

/// Time after which a held lock may be broken by another acquirer
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(10);

/// How long [`Lock::acquire_blocking`] waits when no timeout is given
pub const DEFAULT_BLOCKING_TIMEOUT: Duration = Duration::from_secs(70);

/// Pause between acquisition attempts while blocking
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Suffix appended to the lock name to form the lock directory
pub const LOCK_DIR_SUFFIX: &str = "lock";

/// Whether this instance owns the lock directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    /// This instance has not stamped the lock directory
    Unheld,
    /// This instance last stamped the directory at `last_write`
    Held {
        /// ISO timestamp of this instance's most recent stamp
        last_write: String,
    },
}

/// A named, directory-scoped mutual-exclusion lock
#[derive(Debug)]
pub struct Lock {
    name: String,
    dir: PathBuf,
    path: PathBuf,
    max_age: Duration,
    default_blocking_timeout: Duration,
    poll_interval: Duration,
    listener_check_interval: Duration,
    listeners: ListenerRegistry,
    state: LockState,
}

impl Lock {
    /// Create a lock named `name` whose directory lives in `dir`
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        let name = name.into();
        let dir = dir.into();
        let path = dir.join(format!("{name}.{LOCK_DIR_SUFFIX}"));
        Self {
            name,
            dir,
            path,
            max_age: DEFAULT_MAX_AGE,
            default_blocking_timeout: DEFAULT_BLOCKING_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            listener_check_interval: DEFAULT_LISTENER_CHECK_INTERVAL,
            listeners: ListenerRegistry::default(),
            state: LockState::Unheld,
        }
    }

    /// Create a lock named `name` in the process working directory
    pub fn in_current_dir(name: impl Into<String>) -> CacheResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| CacheError::io("getting current directory", e))?;
        Ok(Self::new(name, cwd))
    }

    /// Set the age after which this lock may be broken by others
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Set the timeout used by [`Lock::acquire_blocking`] and [`Lock::lock`]
    pub fn with_default_blocking_timeout(mut self, timeout: Duration) -> Self {
        self.default_blocking_timeout = timeout;
        self
    }

    /// Set the pause between blocking acquisition attempts
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set how often listeners are invoked while waiting
    pub fn with_listener_check_interval(mut self, interval: Duration) -> Self {
        self.listener_check_interval = interval;
        self
    }

    /// Invoke these listeners while waiting for the lock
    pub fn with_listeners(mut self, listeners: ListenerRegistry) -> Self {
        self.listeners = listeners;
        self
    }

    /// The lock name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The directory the lock directory is created in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The lock directory itself
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The age after which this lock may be broken
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// The timeout used when none is given
    pub fn default_blocking_timeout(&self) -> Duration {
        self.default_blocking_timeout
    }

    /// This instance's view of ownership
    pub fn state(&self) -> &LockState {
        &self.state
    }

    /// Acquire the lock, waiting up to `timeout` (default: the configured
    /// blocking timeout)
    ///
    /// Between attempts the thread dozes for the poll interval while invoking
    /// the registered listeners.
    pub fn acquire_blocking(
        &mut self,
        timeout: Option<Duration>,
        break_old_locks: bool,
    ) -> CacheResult<()> {
        let timeout = timeout.unwrap_or(self.default_blocking_timeout);
        let start = Instant::now();
        let mut contended = false;

        while start.elapsed() < timeout {
            if self.try_acquire(break_old_locks)? {
                if contended {
                    debug!(
                        "Acquired lock {} after waiting {:?}",
                        self.path.display(),
                        start.elapsed()
                    );
                }
                return Ok(());
            }
            if !contended {
                debug!("Lock {} is held elsewhere, waiting", self.path.display());
                contended = true;
            }
            doze(
                &self.listeners,
                self.poll_interval,
                self.listener_check_interval,
            );
        }

        warn!(
            "Timed out after {:?} waiting for lock {}",
            timeout,
            self.path.display()
        );
        Err(CacheError::LockTimeout { timeout })
    }

    /// Attempt to acquire the lock without waiting
    ///
    /// Returns `Ok(false)` when another holder owns a lock that is not stale
    /// (or stale locks may not be broken). Unexpected OS errors are returned
    /// as-is.
    pub fn try_acquire(&mut self, break_old_locks: bool) -> CacheResult<bool> {
        if self.renew() {
            return Ok(true);
        }

        fs::create_dir_all(&self.dir).map_err(|e| {
            CacheError::io(format!("creating lock parent {}", self.dir.display()), e)
        })?;

        match fs::create_dir(&self.path) {
            Ok(()) => {
                self.stamp()?;
                trace!("Acquired lock {}", self.path.display());
            }
            // Windows reports a directory pending deletion as access denied
            Err(e) if matches!(e.kind(), ErrorKind::AlreadyExists | ErrorKind::PermissionDenied) => {
                if !break_old_locks {
                    return Ok(false);
                }
                let age = self.age()?;
                if age <= self.max_age {
                    return Ok(false);
                }
                warn!(
                    "Breaking stale lock {} (age {:?} exceeds {:?})",
                    self.path.display(),
                    age,
                    self.max_age
                );
                self.stamp()?;
            }
            Err(e) => {
                return Err(CacheError::io(
                    format!("creating lock {}", self.path.display()),
                    e,
                ));
            }
        }

        Ok(self.has_lock())
    }

    /// Extend a held lock by re-stamping its directory
    ///
    /// Returns `false` without error when this instance does not hold the
    /// lock, or when the lock has already aged past `max_age` and may have
    /// been claimed by someone else.
    pub fn renew(&mut self) -> bool {
        if !self.has_lock() {
            return false;
        }
        match self.age() {
            Ok(age) if age < self.max_age => {}
            Ok(_) => return false,
            Err(e) => {
                debug!("Cannot renew lock {}: {}", self.path.display(), e);
                return false;
            }
        }
        match self.stamp() {
            Ok(()) => {
                trace!("Renewed lock {}", self.path.display());
                true
            }
            Err(e) => {
                debug!("Cannot renew lock {}: {}", self.path.display(), e);
                false
            }
        }
    }

    /// Release the lock if this instance holds it
    ///
    /// A lock directory that is already gone counts as released.
    pub fn release(&mut self) -> CacheResult<()> {
        if !self.has_lock() {
            self.state = LockState::Unheld;
            return Ok(());
        }
        self.state = LockState::Unheld;
        match fs::remove_dir_all(&self.path) {
            Ok(()) => {
                trace!("Released lock {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io(
                format!("releasing lock {}", self.path.display()),
                e,
            )),
        }
    }

    /// Acquire the lock with default settings for the lifetime of the guard
    pub fn lock(&mut self) -> CacheResult<LockGuard<'_>> {
        self.acquire_blocking(None, true)?;
        Ok(LockGuard {
            lock: self,
            released: false,
        })
    }

    /// Whether this instance currently holds the lock
    ///
    /// True only while the lock directory's mtime still matches this
    /// instance's last stamp.
    pub fn has_lock(&self) -> bool {
        let LockState::Held { last_write } = &self.state else {
            return false;
        };
        match fs::metadata(&self.path).and_then(|meta| meta.modified()) {
            Ok(mtime) => system_time_to_iso(mtime) == *last_write,
            Err(_) => false,
        }
    }

    /// Time since the lock directory was last stamped
    ///
    /// A missing or inaccessible lock directory has age zero.
    pub fn age(&self) -> CacheResult<Duration> {
        match fs::metadata(&self.path).and_then(|meta| meta.modified()) {
            Ok(mtime) => Ok(SystemTime::now()
                .duration_since(mtime)
                .unwrap_or(Duration::ZERO)),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
                Ok(Duration::ZERO)
            }
            Err(e) => Err(CacheError::io(
                format!("reading age of lock {}", self.path.display()),
                e,
            )),
        }
    }

    /// Set the lock directory's mtime to now and remember it as our stamp
    fn stamp(&mut self) -> CacheResult<()> {
        // consecutive stamps must differ even on a coarse clock
        thread::sleep(Duration::from_millis(1));

        // whole milliseconds so the value read back formats identically
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        let millis = since_epoch.as_millis();
        let stamp = UNIX_EPOCH + Duration::from_millis(millis as u64);
        let mtime = FileTime::from_unix_time(
            (millis / 1000) as i64,
            ((millis % 1000) * 1_000_000) as u32,
        );

        filetime::set_file_mtime(&self.path, mtime).map_err(|e| {
            CacheError::io(format!("stamping lock {}", self.path.display()), e)
        })?;
        self.state = LockState::Held {
            last_write: system_time_to_iso(stamp),
        };
        Ok(())
    }
}

/// Holds a [`Lock`] until dropped
///
/// Dereferences to the lock so the holder can [`Lock::renew`] it. Dropping
/// the guard releases the lock and logs any failure; use
/// [`LockGuard::unlock`] to observe release errors.
#[derive(Debug)]
pub struct LockGuard<'a> {
    lock: &'a mut Lock,
    released: bool,
}

impl LockGuard<'_> {
    /// Release the lock now, returning any error
    pub fn unlock(mut self) -> CacheResult<()> {
        self.released = true;
        self.lock.release()
    }
}

impl Deref for LockGuard<'_> {
    type Target = Lock;

    fn deref(&self) -> &Lock {
        self.lock
    }
}

impl DerefMut for LockGuard<'_> {
    fn deref_mut(&mut self) -> &mut Lock {
        self.lock
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.lock.release() {
            warn!("Failed to release lock {}: {}", self.lock.path.display(), e);
        }
    }
}
