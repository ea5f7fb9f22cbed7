//! fhcache - local file handle cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use fhcache::cache::Cache;
use fhcache::cli::{commands, Cli, Commands};
use fhcache::config::{Config, ConfigManager};
use fhcache::error::CacheResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> CacheResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let mut config = config_manager.load()?;

    init_logging(cli.verbose, &config);
    debug!("Using configuration at {}", config_manager.path().display());

    if let Commands::Config(args) = cli.command {
        return commands::config(args, &config_manager, &config);
    }

    if let Some(root) = cli.cache_root {
        config.cache.root_dir = Some(root);
    }
    let cache = Cache::from_config(&config)?;
    debug!("Cache root: {}", cache.root().display());

    // Dispatch to command
    match cli.command {
        Commands::Config(_) => unreachable!("Config handled above"),
        Commands::Path(args) => commands::path(args, &cache),
        Commands::List(args) => commands::list(args, &cache),
        Commands::Register(args) => commands::register(args, &cache),
        Commands::Remove(args) => commands::remove(args, &cache),
        Commands::Purge(args) => commands::purge(args, &cache, &config),
        Commands::Digest(args) => commands::digest(args),
    }
}

/// 0 = warn, 1 = info, 2+ = debug; RUST_LOG takes precedence when set
fn init_logging(verbose: u8, config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("fhcache=warn"),
        1 => EnvFilter::new("fhcache=info"),
        _ => EnvFilter::new("fhcache=debug"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
