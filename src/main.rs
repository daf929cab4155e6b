//! fmtd - warm source formatter
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use fmtd::cli::{Cli, Commands};
use fmtd::config::{Config, ConfigManager};
use fmtd::error::FmtdResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            fmtd::ui::error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> FmtdResult<()> {
    let cli = Cli::parse();

    let config_manager = if let Some(ref path) = cli.daemon_config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config);
    debug!(path = %config_manager.path().display(), "daemon settings loaded");

    match cli.command {
        Commands::Format(args) => fmtd::cli::commands::format(args, &config).await,
        Commands::FlushCache => fmtd::cli::commands::flush_cache(&config).await,
        Commands::DebugInfo(args) => fmtd::cli::commands::debug_info(args, &config).await,
        Commands::Config(args) => fmtd::cli::commands::config(args, &config, &config_manager).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug. Logs go to stderr so stdout carries only output.
fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("fmtd=warn"),
        1 => EnvFilter::new("fmtd=info"),
        _ => EnvFilter::new("fmtd=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
