//! Turning a request's argument list and client environment into a target
//! file and typed overrides

use crate::resolve::{EndOfLine, OverrideOptions, PartialOptions};
use clap::Parser;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of client environment keys the service looks at
pub const ENV_PREFIX: &str = "FMTD_";

/// Config file used when discovery finds nothing
pub const DEFAULT_CONFIG_ENV: &str = "FMTD_DEFAULT_CONFIG";

#[derive(Parser, Debug)]
#[command(
    name = "fmtd format",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true
)]
struct RequestArgs {
    /// File the source text belongs to
    file: PathBuf,

    #[arg(long)]
    print_width: Option<u16>,

    #[arg(long)]
    tab_width: Option<u8>,

    #[arg(long)]
    use_tabs: bool,

    #[arg(long)]
    single_quote: bool,

    #[arg(long)]
    end_of_line: Option<EndOfLine>,

    /// Use this config file instead of discovering one
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    no_config: bool,

    #[arg(long)]
    no_editorconfig: bool,

    /// Replaces discovered ignore files
    #[arg(long = "ignore-path")]
    ignore_paths: Vec<PathBuf>,
}

/// What a request asks to format, and with which overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    /// Absolute path of the target file
    pub file: PathBuf,
    pub overrides: OverrideOptions,
}

impl RequestTarget {
    /// Parse `args` relative to `cwd`. The error is a one-line message.
    pub fn parse(
        cwd: &Path,
        args: &[String],
        client_env: &BTreeMap<String, String>,
    ) -> Result<Self, String> {
        let parsed = RequestArgs::try_parse_from(args).map_err(|e| {
            let rendered = e.to_string();
            let first = rendered.lines().next().unwrap_or_default();
            first.trim_start_matches("error: ").to_string()
        })?;

        let absolute = |p: &Path| -> PathBuf {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                cwd.join(p)
            }
        };

        let mut default_config = None;
        for (key, value) in client_env.iter().filter(|(k, _)| k.starts_with(ENV_PREFIX)) {
            if key == DEFAULT_CONFIG_ENV {
                if !value.is_empty() {
                    default_config = Some(absolute(Path::new(value)));
                }
            } else {
                debug!(key = %key, "ignoring unknown client environment key");
            }
        }

        let overrides = OverrideOptions {
            options: PartialOptions {
                print_width: parsed.print_width,
                tab_width: parsed.tab_width,
                use_tabs: parsed.use_tabs.then_some(true),
                single_quote: parsed.single_quote.then_some(true),
                end_of_line: parsed.end_of_line,
            },
            config_path: parsed.config.as_deref().map(absolute),
            default_config,
            no_config: parsed.no_config,
            editorconfig: !parsed.no_editorconfig,
            ignore_paths: parsed.ignore_paths.iter().map(|p| absolute(p)).collect(),
        };

        Ok(Self {
            file: absolute(&parsed.file),
            overrides,
        })
    }

    /// Directory resolution starts from
    pub fn dir(&self) -> &Path {
        self.file.parent().unwrap_or(&self.file)
    }
}

/// Keep only keys the service understands the prefix of
pub fn retain_client_env<I>(env: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    env.into_iter()
        .filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .collect()
}
