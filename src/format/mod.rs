//! Formatting engines and the executor that runs them
//!
//! A [`Formatter`] is a fixed capability: given text, the target path and
//! resolved options it returns the formatted text or a [`FormatFailure`].
//! Which engine serves a project is decided by the resolver through the
//! [`FormatterRegistry`]; the [`FormatExecutor`] only runs what it is handed.
//!
//! # Failure kinds
//!
//! | Failure | Meaning |
//! |---------|---------|
//! | `Syntax` | input does not lex/parse as the target language |
//! | `Unsupported` | no engine handles the file type |
//! | `Internal` | anything else, message passed through verbatim |

pub mod json;
pub mod script;

use crate::resolve::FormatOptions;
use script::Dialect;
use semver::{Version, VersionReq};
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a formatter produced no output
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatFailure {
    #[error("syntax error: {message}")]
    Syntax { message: String },

    #[error("no formatter for {}", path.display())]
    Unsupported { path: PathBuf },

    #[error("{message}")]
    Internal { message: String },
}

/// A pluggable formatting engine
pub trait Formatter: Send + Sync + fmt::Debug {
    /// Engine name shown in diagnostics
    fn name(&self) -> &str;

    fn version(&self) -> &Version;

    /// Where the engine was loaded from
    fn source_path(&self) -> &Path;

    /// Whether the engine handles files like `path`
    fn supports(&self, path: &Path) -> bool;

    /// Format `text` as the contents of `path`. All or nothing.
    fn format(&self, text: &str, path: &Path, options: &FormatOptions) -> Result<String, FormatFailure>;
}

/// Languages the built-in engine understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Script,
    Style,
    Json,
}

impl Language {
    /// Infer the language from the file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "js" | "mjs" | "cjs" | "jsx" | "ts" | "mts" | "cts" | "tsx" => Some(Self::Script),
            "css" | "scss" | "less" => Some(Self::Style),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// The engine compiled into this binary
#[derive(Debug)]
pub struct BuiltinFormatter {
    version: Version,
    source_path: PathBuf,
}

impl BuiltinFormatter {
    pub fn new() -> Self {
        let version = Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or_else(|_| Version::new(0, 0, 0));
        let source_path = std::env::current_exe().unwrap_or_else(|_| PathBuf::from(env!("CARGO_PKG_NAME")));
        Self {
            version,
            source_path,
        }
    }
}

impl Default for BuiltinFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for BuiltinFormatter {
    fn name(&self) -> &str {
        "fmtd"
    }

    fn version(&self) -> &Version {
        &self.version
    }

    fn source_path(&self) -> &Path {
        &self.source_path
    }

    fn supports(&self, path: &Path) -> bool {
        Language::from_path(path).is_some()
    }

    fn format(&self, text: &str, path: &Path, options: &FormatOptions) -> Result<String, FormatFailure> {
        let language = Language::from_path(path).ok_or_else(|| FormatFailure::Unsupported {
            path: path.to_path_buf(),
        })?;

        let source = normalize_newlines(text);
        let body = match language {
            Language::Script => script::layout(&source, Dialect::Script, options)?,
            Language::Style => script::layout(&source, Dialect::Style, options)?,
            Language::Json => json::reprint(&source, options)?,
        };

        let eol = options.end_of_line.resolve_for(text);
        Ok(if eol == "\n" {
            body
        } else {
            body.replace('\n', eol)
        })
    }
}

/// Engines lay out `\n`-only text; the configured ending is applied afterwards.
fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// The set of engines a project can be served by
#[derive(Debug, Clone)]
pub struct FormatterRegistry {
    engines: Vec<Arc<dyn Formatter>>,
}

impl FormatterRegistry {
    /// Registry holding only the built-in engine
    pub fn builtin() -> Self {
        Self::with_engines(vec![Arc::new(BuiltinFormatter::new())])
    }

    pub fn with_engines(engines: Vec<Arc<dyn Formatter>>) -> Self {
        Self { engines }
    }

    /// Newest engine satisfying `requirement` (any engine when `None`)
    pub fn select(&self, requirement: Option<&VersionReq>) -> Option<Arc<dyn Formatter>> {
        self.engines
            .iter()
            .filter(|e| requirement.map_or(true, |req| req.matches(e.version())))
            .max_by(|a, b| a.version().cmp(b.version()))
            .cloned()
    }
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Runs a formatter off the async executor
#[derive(Debug, Clone, Default)]
pub struct FormatExecutor;

impl FormatExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Format `text` with `formatter` on a blocking worker.
    ///
    /// A panic inside the engine is reported as `Internal` instead of
    /// taking the daemon down.
    pub async fn run(
        &self,
        formatter: Arc<dyn Formatter>,
        text: String,
        path: PathBuf,
        options: FormatOptions,
    ) -> Result<String, FormatFailure> {
        if !formatter.supports(&path) {
            debug!(path = %path.display(), engine = formatter.name(), "unsupported input");
            return Err(FormatFailure::Unsupported { path });
        }

        let task = tokio::task::spawn_blocking(move || formatter.format(&text, &path, &options));

        match task.await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "formatter task failed");
                let message = match e.try_into_panic() {
                    Ok(payload) => panic_message(payload.as_ref()),
                    Err(e) => e.to_string(),
                };
                Err(FormatFailure::Internal { message })
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "formatter panicked".to_string()
    }
}
