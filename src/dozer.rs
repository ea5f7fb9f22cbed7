//! Sleep while servicing registered listeners
//!
//! [`doze`] blocks the calling thread for a given duration, invoking every
//! listener in a [`ListenerRegistry`] at a fixed check interval instead of
//! sleeping uninterrupted. Lock acquisition uses it between attempts so code
//! outside the lock can observe long waits (progress output, heartbeats,
//! cancellation flags).
//!
//! Registering or clearing listeners while another thread is dozing is safe,
//! but which listeners the sleeping thread sees on its next tick is up to the
//! callers.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Default interval between listener invocations
pub const DEFAULT_LISTENER_CHECK_INTERVAL: Duration = Duration::from_millis(100);

type Listener = Arc<dyn Fn() + Send + Sync>;

/// A shared, thread-safe set of zero-argument callbacks
///
/// Clones share the same underlying set.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    listeners: Arc<Mutex<Vec<Listener>>>,
}

impl ListenerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new listener
    pub fn register<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.lock().push(Arc::new(listener));
    }

    /// Remove all listeners
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Invoke every registered listener once, in registration order
    ///
    /// The set is snapshotted first, so a listener may register or clear
    /// listeners without deadlocking.
    pub fn notify(&self) {
        let snapshot: Vec<Listener> = self.lock().clone();
        for listener in snapshot {
            listener();
        }
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no listener is registered
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Listener>> {
        // a panicking listener never runs under this mutex, so the data is intact
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

/// Wait for `wait`, invoking the registry's listeners every `check_interval`
pub fn doze(registry: &ListenerRegistry, wait: Duration, check_interval: Duration) {
    let deadline = Instant::now() + wait;
    loop {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        registry.notify();
        thread::sleep(check_interval.min(deadline - now));
    }
}
