//! fhcache - local file handle cache
//!
//! Maps remote content identifiers to local file paths and their last-known
//! modification times, guarded by a directory lock that works across threads
//! and processes sharing one cache root.

pub mod cache;
pub mod cli;
pub mod config;
pub mod digest;
pub mod dozer;
pub mod error;
pub mod lock;
pub mod path;
pub mod time;

pub use cache::{Cache, CacheMap};
pub use error::{CacheError, CacheResult};
pub use lock::{Lock, LockGuard};
