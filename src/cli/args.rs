//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// fhcache - local file handle cache
///
/// Tracks which local files hold the content of which remote file handle,
/// and whether they have been modified since.
#[derive(Parser, Debug)]
#[command(name = "fhcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "FHCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cache root directory (overrides configuration)
    #[arg(long, global = true, env = "FHCACHE_ROOT")]
    pub cache_root: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the cache directory of a file handle
    Path(IdArgs),

    /// List registered files that are unmodified since registration
    List(ListArgs),

    /// Register a local file for a file handle
    Register(RegisterArgs),

    /// Remove registrations of a file handle
    Remove(RemoveArgs),

    /// Remove registrations recorded before a cutoff
    Purge(PurgeArgs),

    /// Print the content digest of a file
    Digest(DigestArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// A file handle id argument
#[derive(Parser, Debug)]
pub struct IdArgs {
    /// File handle id
    pub id: u64,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// File handle id
    pub id: u64,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the register command
#[derive(Parser, Debug)]
pub struct RegisterArgs {
    /// File handle id
    pub id: u64,

    /// Local file holding the content
    pub path: PathBuf,
}

/// Arguments for the remove command
#[derive(Parser, Debug)]
pub struct RemoveArgs {
    /// File handle id
    pub id: u64,

    /// Remove only this file's registration (default: all)
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// Also delete the registered files
    #[arg(long)]
    pub delete_file: bool,
}

/// Arguments for the purge command
#[derive(Parser, Debug)]
pub struct PurgeArgs {
    /// Remove registrations recorded before this time (e.g. 2024-01-31T00:00:00.000Z)
    #[arg(long, conflicts_with = "days")]
    pub before: Option<String>,

    /// Remove registrations older than N days (default: from config)
    #[arg(long)]
    pub days: Option<u32>,

    /// Dry run - show what would be removed
    #[arg(long)]
    pub dry_run: bool,

    /// Output format
    #[arg(short, long, default_value = "plain")]
    pub format: OutputFormat,
}

/// Arguments for the digest command
#[derive(Parser, Debug)]
pub struct DigestArgs {
    /// File to hash
    pub path: PathBuf,

    /// Digest algorithm
    #[arg(short, long, default_value = "md5")]
    pub algorithm: AlgorithmArg,
}

/// Digest algorithm choices
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AlgorithmArg {
    /// MD5
    Md5,
    /// SHA-256
    Sha256,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., lock.max_age_secs)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Output format for listing commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
