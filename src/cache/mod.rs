//! Local file handle cache
//!
//! Records which local files hold the content of which remote content
//! identifier, so downloads and uploads can be skipped when an unmodified
//! copy already exists.
//!
//! # Layout
//!
//! | Path | Description |
//! |------|-------------|
//! | `<root>/<id % 1000>/<id>/` | Cache directory of identifier `id` |
//! | `<cache dir>/.cacheMap` | JSON map of normalized path to ISO mtime |
//! | `<cache dir>/.cacheMap.lock/` | Lock directory while a map is in use |
//!
//! The layout is shared with other clients using the same cache root and must
//! not change.

pub mod map;
pub mod store;

pub use map::{CacheMap, CACHE_MAP_FILE_NAME};
pub use store::{
    cache_dirs, default_cache_root, file_handle_id_of, Cache, LockSettings, DEFAULT_BUCKET_SIZE,
};
