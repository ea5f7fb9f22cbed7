//! Configuration schema for fhcache
//!
//! Configuration is stored at `~/.config/fhcache/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache layout settings
    pub cache: CacheConfig,

    /// Cache map lock settings
    pub lock: LockConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Cache layout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache root directory (default: ~/.synapseCache)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_dir: Option<PathBuf>,

    /// Number of bucket directories under the root
    pub bucket_size: u64,

    /// Default age in days for `purge` when no cutoff is given
    pub purge_days: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root_dir: None,
            bucket_size: 1000,
            purge_days: 30,
        }
    }
}

/// Cache map lock configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Seconds after which a held lock may be broken
    pub max_age_secs: u64,

    /// Seconds to wait for a lock before giving up
    pub blocking_timeout_secs: u64,

    /// Milliseconds between acquisition attempts
    pub poll_interval_ms: u64,

    /// Milliseconds between listener invocations while waiting
    pub listener_check_interval_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            max_age_secs: 10,
            blocking_timeout_secs: 70,
            poll_interval_ms: 500,
            listener_check_interval_ms: 100,
        }
    }
}
