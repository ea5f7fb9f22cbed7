//! List command - show unmodified cached copies

use super::print_paths;
use crate::cache::Cache;
use crate::cli::args::ListArgs;
use crate::error::CacheResult;

/// Execute the list command
pub fn execute(args: ListArgs, cache: &Cache) -> CacheResult<()> {
    let paths = cache.list_unmodified_paths(args.id)?;
    print_paths(&paths, args.format, "No unmodified copies cached")
}
