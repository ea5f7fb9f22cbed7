//! Path command - show where a file handle is cached

use crate::cache::Cache;
use crate::cli::args::IdArgs;
use crate::error::CacheResult;

/// Execute the path command
pub fn execute(args: IdArgs, cache: &Cache) -> CacheResult<()> {
    println!("{}", cache.cache_dir(args.id).display());
    Ok(())
}
