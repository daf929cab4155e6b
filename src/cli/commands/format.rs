//! Format command - format stdin as the given file

use crate::cli::args::FormatArgs;
use crate::config::Config;
use crate::error::{FmtdError, FmtdResult};
use crate::service::{retain_client_env, FormatRequest, FormatResult, FormatService};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

/// Execute the format command
pub async fn execute(args: FormatArgs, config: &Config) -> FmtdResult<()> {
    let mut source_text = String::new();
    tokio::io::stdin()
        .read_to_string(&mut source_text)
        .await
        .map_err(|e| FmtdError::io("reading source from stdin", e))?;

    let cwd = std::env::current_dir().map_err(|e| FmtdError::io("getting current directory", e))?;
    let client_env = retain_client_env(
        std::env::vars_os().filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
    );

    let mut request_args = Vec::with_capacity(args.args.len() + 1);
    request_args.push(args.file);
    request_args.extend(args.args);
    debug!(args = ?request_args, bytes = source_text.len(), "format request");

    let service = FormatService::from_config(config);
    let request = FormatRequest {
        cwd,
        args: request_args,
        client_env,
        source_text,
    };

    match service.handle_format(request).await {
        FormatResult::Formatted { text } => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(text.as_bytes())
                .await
                .map_err(|e| FmtdError::io("writing formatted output", e))?;
            stdout
                .flush()
                .await
                .map_err(|e| FmtdError::io("writing formatted output", e))?;
            Ok(())
        }
        FormatResult::Failed { kind, message } => Err(FmtdError::FormatFailed { kind, message }),
    }
}
