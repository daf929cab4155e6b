//! Debug-info command - report resolved formatter and cache counts

use crate::cli::args::{DebugInfoArgs, OutputFormat};
use crate::config::Config;
use crate::error::{FmtdError, FmtdResult};
use crate::service::{DebugSnapshot, FormatService};
use std::fmt::Write;

/// Execute the debug-info command
pub async fn execute(args: DebugInfoArgs, config: &Config) -> FmtdResult<()> {
    let cwd = std::env::current_dir().map_err(|e| FmtdError::io("getting current directory", e))?;
    let service = FormatService::from_config(config);
    let snapshot = service.debug_info(&cwd, &args.args).await;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        OutputFormat::Text => {
            println!("fmtd {}", env!("CARGO_PKG_VERSION"));
            print!("{}", render(&snapshot));
        }
    }

    Ok(())
}

/// Human-readable report of a snapshot
pub fn render(snapshot: &DebugSnapshot) -> String {
    let mut out = String::new();

    // writing into a String cannot fail
    let _ = match &snapshot.resolved_formatter {
        Some(formatter) => writeln!(
            out,
            "{} version: {}\nLoaded from: {}\nCache: {}",
            formatter.name,
            formatter.version,
            formatter.loaded_from.display(),
            if formatter.cache_hit { "hit" } else { "miss" }
        ),
        None => writeln!(out, "No formatter resolved"),
    };

    out.push_str("\nCache information:\n");
    for info in &snapshot.cache_info {
        let _ = writeln!(out, "- \"{}\" contains {} items", info.name, info.item_count);
    }
    out
}
