//! CLI argument definitions using clap derive

use crate::config::CONFIG_ENV;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// fmtd - warm source formatter
///
/// Resolves project formatting config once and keeps it cached between
/// requests.
#[derive(Parser, Debug)]
#[command(name = "fmtd")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Daemon settings file path
    #[arg(long, global = true, env = CONFIG_ENV)]
    pub daemon_config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Format source read from stdin as FILE
    Format(FormatArgs),

    /// Drop every cached config resolution
    FlushCache,

    /// Show which formatter a directory resolves to and cache counts
    DebugInfo(DebugInfoArgs),

    /// Show or initialize daemon settings
    Config(ConfigArgs),
}

/// Arguments for the format command
#[derive(Parser, Debug)]
pub struct FormatArgs {
    /// File the source belongs to (need not exist)
    pub file: String,

    /// Formatting flags, e.g. --tab-width 4 --single-quote
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Arguments for the debug-info command
#[derive(Parser, Debug)]
pub struct DebugInfoArgs {
    /// Output format
    #[arg(short, long, default_value = "text")]
    pub output: OutputFormat,

    /// Target file and flags, as for `format`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
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

    /// Write default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for debug-info
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    Text,
    /// JSON snapshot
    Json,
}
