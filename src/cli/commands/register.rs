//! Register command - record a local copy of a file handle

use crate::cache::Cache;
use crate::cli::args::RegisterArgs;
use crate::error::CacheResult;
use console::style;

/// Execute the register command
pub fn execute(args: RegisterArgs, cache: &Cache) -> CacheResult<()> {
    let map = cache.register(args.id, &args.path)?;

    println!(
        "{} Registered {} for {} ({} cached cop{})",
        style("[OK]").green(),
        args.path.display(),
        args.id,
        map.len(),
        if map.len() == 1 { "y" } else { "ies" }
    );
    Ok(())
}
