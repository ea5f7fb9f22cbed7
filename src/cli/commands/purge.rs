//! Purge command - remove registrations recorded before a cutoff

use super::print_paths;
use crate::cache::Cache;
use crate::cli::args::PurgeArgs;
use crate::config::Config;
use crate::error::{CacheError, CacheResult};
use crate::time::{datetime_to_iso, iso_to_datetime};
use chrono::{DateTime, Duration, Utc};
use console::style;
use tracing::debug;

/// Execute the purge command
pub fn execute(args: PurgeArgs, cache: &Cache, config: &Config) -> CacheResult<()> {
    let before = cutoff(&args, config)?;
    debug!("Purging registrations recorded before {}", datetime_to_iso(&before));

    let removed = cache.purge(before, args.dry_run)?;
    print_paths(&removed, args.format, "Nothing to purge")?;

    if args.dry_run && !removed.is_empty() {
        eprintln!(
            "{} {} path(s) would be removed; run without --dry-run to purge",
            style("[DRY RUN]").yellow(),
            removed.len()
        );
    }
    Ok(())
}

fn cutoff(args: &PurgeArgs, config: &Config) -> CacheResult<DateTime<Utc>> {
    if let Some(before) = &args.before {
        return parse_cutoff(before);
    }
    let days = args.days.unwrap_or(config.cache.purge_days);
    Duration::try_days(i64::from(days))
        .and_then(|age| Utc::now().checked_sub_signed(age))
        .ok_or_else(|| CacheError::invalid_argument(format!("--days {days} is out of range")))
}

/// Accept the cache map timestamp form or any RFC 3339 timestamp
fn parse_cutoff(value: &str) -> CacheResult<DateTime<Utc>> {
    iso_to_datetime(value).or_else(|_| {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                CacheError::invalid_argument(format!("invalid --before value {value:?}: {e}"))
            })
    })
}
