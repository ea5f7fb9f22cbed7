//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{CacheError, CacheResult};
use console::style;
use std::path::PathBuf;

/// Execute the config command
pub fn execute(args: ConfigArgs, manager: &ConfigManager, config: &Config) -> CacheResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => show_path(manager),
        Some(ConfigAction::Init { force }) => init_config(manager, force)?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, config, &key, &value)?,
    }

    Ok(())
}

fn show_config(config: &Config) -> CacheResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn show_path(manager: &ConfigManager) {
    println!("{}", manager.path().display());
}

fn init_config(manager: &ConfigManager, force: bool) -> CacheResult<()> {
    let path = manager.path();

    if path.exists() && !force {
        println!(
            "{} Config already exists at {}",
            style("[WARN]").yellow(),
            path.display()
        );
        println!("  Use --force to overwrite");
        return Ok(());
    }

    manager.save(&Config::default())?;
    println!(
        "{} Configuration initialized: {}",
        style("[OK]").green(),
        path.display()
    );
    Ok(())
}

fn set_value(manager: &ConfigManager, config: &Config, key: &str, value: &str) -> CacheResult<()> {
    let mut config = config.clone();
    apply(&mut config, key, value)?;
    manager.save(&config)?;

    println!("{} Set {} = {}", style("[OK]").green(), key, value);
    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> CacheResult<()> {
    // Parse dot-separated key path
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => match value {
            "text" | "json" => config.general.log_format = value.to_string(),
            _ => {
                return Err(CacheError::invalid_argument(format!(
                    "log_format must be \"text\" or \"json\", got {value:?}"
                )))
            }
        },

        ["cache", "root_dir"] => config.cache.root_dir = Some(PathBuf::from(value)),
        ["cache", "bucket_size"] => {
            let size = parse_u64(value)?;
            if size == 0 {
                return Err(CacheError::invalid_argument(
                    "cache.bucket_size must be greater than zero",
                ));
            }
            config.cache.bucket_size = size;
        }
        ["cache", "purge_days"] => {
            config.cache.purge_days = value.parse().map_err(|_| {
                CacheError::invalid_argument(format!("Invalid number: {value}"))
            })?
        }

        ["lock", "max_age_secs"] => config.lock.max_age_secs = parse_u64(value)?,
        ["lock", "blocking_timeout_secs"] => config.lock.blocking_timeout_secs = parse_u64(value)?,
        ["lock", "poll_interval_ms"] => config.lock.poll_interval_ms = parse_u64(value)?,
        ["lock", "listener_check_interval_ms"] => {
            config.lock.listener_check_interval_ms = parse_u64(value)?
        }

        _ => {
            return Err(CacheError::invalid_argument(format!(
                "Unknown configuration key: {key}"
            )))
        }
    }
    Ok(())
}

fn parse_u64(value: &str) -> CacheResult<u64> {
    value
        .parse()
        .map_err(|_| CacheError::invalid_argument(format!("Invalid number: {value}")))
}
