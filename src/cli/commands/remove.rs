//! Remove command - drop registrations of a file handle

use crate::cache::Cache;
use crate::cli::args::RemoveArgs;
use crate::error::CacheResult;
use console::style;

/// Execute the remove command
pub fn execute(args: RemoveArgs, cache: &Cache) -> CacheResult<()> {
    let removed = cache.remove(args.id, args.path.as_deref(), args.delete_file)?;

    if removed.is_empty() {
        println!("{}", style("Nothing to remove").dim());
        return Ok(());
    }

    for path in &removed {
        println!("{}", path);
    }
    println!(
        "{} Removed {} registration(s){}",
        style("[OK]").green(),
        removed.len(),
        if args.delete_file { " and file(s)" } else { "" }
    );
    Ok(())
}
