//! CLI command implementations

pub mod config;
pub mod digest;
pub mod list;
pub mod path;
pub mod purge;
pub mod register;
pub mod remove;

pub use config::execute as config;
pub use digest::execute as digest;
pub use list::execute as list;
pub use path::execute as path;
pub use purge::execute as purge;
pub use register::execute as register;
pub use remove::execute as remove;

use crate::cli::args::OutputFormat;
use crate::error::CacheResult;
use console::style;

/// Print a list of cache paths in the requested format
pub(crate) fn print_paths(paths: &[String], format: OutputFormat, empty: &str) -> CacheResult<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(paths)?),
        OutputFormat::Plain => {
            for path in paths {
                println!("{}", path);
            }
        }
        OutputFormat::Table => {
            if paths.is_empty() {
                println!("{}", style(empty).dim());
                return Ok(());
            }
            println!("{}", style("PATH").bold());
            println!("{}", "-".repeat(60));
            for path in paths {
                println!("{}", path);
            }
            println!();
            println!("{} path(s)", paths.len());
        }
    }
    Ok(())
}
