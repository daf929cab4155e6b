//! Formatting service
//!
//! [`FormatService`] is what a transport talks to. It owns the
//! [`ResolutionCache`] for the lifetime of the process and drives
//! resolver → cache → executor for each request. Expected failures come back
//! as [`FormatResult::Failed`], never as errors.

pub mod protocol;
pub mod request;

pub use crate::cache::CacheInfo;
pub use request::{retain_client_env, RequestTarget, DEFAULT_CONFIG_ENV, ENV_PREFIX};

use crate::cache::ResolutionCache;
use crate::config::Config;
use crate::format::{FormatExecutor, FormatFailure, FormatterRegistry};
use crate::resolve::{ConfigResolver, OverrideOptions, ResolutionError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

/// Failure tag carried back to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MalformedConfig,
    UnreadableDirectory,
    FormatterUnavailable,
    SyntaxError,
    UnsupportedInput,
    InternalError,
    InvalidRequest,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MalformedConfig => "malformed config",
            Self::UnreadableDirectory => "unreadable directory",
            Self::FormatterUnavailable => "formatter unavailable",
            Self::SyntaxError => "syntax error",
            Self::UnsupportedInput => "unsupported input",
            Self::InternalError => "internal error",
            Self::InvalidRequest => "invalid request",
        };
        write!(f, "{}", name)
    }
}

/// One format invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatRequest {
    /// Client working directory; relative paths in `args` resolve against it
    pub cwd: PathBuf,
    /// Target file first, then option flags
    pub args: Vec<String>,
    /// Client environment, `FMTD_` keys only
    #[serde(default)]
    pub client_env: BTreeMap<String, String>,
    pub source_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatResult {
    Formatted { text: String },
    Failed { kind: FailureKind, message: String },
}

impl FormatResult {
    fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }
}

impl From<ResolutionError> for FormatResult {
    fn from(e: ResolutionError) -> Self {
        let kind = match e {
            ResolutionError::MalformedConfig { .. } => FailureKind::MalformedConfig,
            ResolutionError::UnreadableDirectory { .. } => FailureKind::UnreadableDirectory,
            ResolutionError::FormatterUnavailable { .. } => FailureKind::FormatterUnavailable,
        };
        Self::failed(kind, e.to_string())
    }
}

impl From<FormatFailure> for FormatResult {
    fn from(e: FormatFailure) -> Self {
        let kind = match e {
            FormatFailure::Syntax { .. } => FailureKind::SyntaxError,
            FormatFailure::Unsupported { .. } => FailureKind::UnsupportedInput,
            FormatFailure::Internal { .. } => FailureKind::InternalError,
        };
        Self::failed(kind, e.to_string())
    }
}

/// Engine that served a debug resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFormatter {
    pub name: String,
    pub version: String,
    pub loaded_from: PathBuf,
    pub cache_hit: bool,
}

/// Diagnostics returned by [`FormatService::debug_info`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugSnapshot {
    pub resolved_formatter: Option<ResolvedFormatter>,
    pub cache_info: Vec<CacheInfo>,
}

pub struct FormatService {
    cache: ResolutionCache,
    executor: FormatExecutor,
}

impl FormatService {
    pub fn new(cache: ResolutionCache) -> Self {
        Self {
            cache,
            executor: FormatExecutor::new(),
        }
    }

    /// Service with the built-in engine, configured from daemon settings
    pub fn from_config(config: &Config) -> Self {
        let resolver = ConfigResolver::new(FormatterRegistry::builtin())
            .with_boundary(config.resolver.boundary.clone())
            .with_editorconfig(config.resolver.editorconfig);
        let cache = ResolutionCache::new(Arc::new(resolver)).with_revalidate(config.cache.revalidate);
        Self::new(cache)
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Resolve, then format `request.source_text` as the target file
    pub async fn handle_format(&self, request: FormatRequest) -> FormatResult {
        let request_id = Uuid::new_v4();
        let span = info_span!("format", request_id = %request_id);
        self.format(request).instrument(span).await
    }

    async fn format(&self, request: FormatRequest) -> FormatResult {
        let target = match RequestTarget::parse(&request.cwd, &request.args, &request.client_env) {
            Ok(target) => target,
            Err(message) => {
                debug!(%message, "rejecting request");
                return FormatResult::failed(FailureKind::InvalidRequest, message);
            }
        };
        let Some(file_name) = target.file.file_name() else {
            return FormatResult::failed(
                FailureKind::InvalidRequest,
                format!("{} does not name a file", target.file.display()),
            );
        };

        let lookup = match self.cache.get_or_resolve(target.dir(), &target.overrides).await {
            Ok(lookup) => lookup,
            Err(e) => {
                warn!(error = %e, "resolution failed");
                return e.into();
            }
        };
        let file = lookup.config.root().join(file_name);

        if lookup.config.is_ignored(&file) {
            debug!(file = %file.display(), "file is ignored, returning input");
            return FormatResult::Formatted {
                text: request.source_text,
            };
        }

        let options = self.cache.file_options(&lookup, &file);
        let formatter = Arc::clone(lookup.config.formatter());
        debug!(
            file = %file.display(),
            cache_hit = lookup.cache_hit,
            engine = formatter.name(),
            "formatting"
        );

        match self
            .executor
            .run(formatter, request.source_text, file, options)
            .await
        {
            Ok(text) => FormatResult::Formatted { text },
            Err(e) => {
                debug!(error = %e, "format failed");
                e.into()
            }
        }
    }

    /// Discard every cached resolution
    pub fn flush_cache(&self) {
        self.cache.flush();
    }

    /// Resolve like [`Self::handle_format`] would and report what was used.
    ///
    /// Cache counts are taken before the resolution, so a fresh process
    /// reports empty tables.
    pub async fn debug_info(&self, cwd: &Path, args: &[String]) -> DebugSnapshot {
        let cache_info = self.cache.snapshot();

        let (dir, overrides) = if args.is_empty() {
            (cwd.to_path_buf(), OverrideOptions::default())
        } else {
            match RequestTarget::parse(cwd, args, &BTreeMap::new()) {
                Ok(target) => (target.dir().to_path_buf(), target.overrides),
                Err(message) => {
                    debug!(%message, "debug request has unusable args");
                    return DebugSnapshot {
                        resolved_formatter: None,
                        cache_info,
                    };
                }
            }
        };

        let resolved_formatter = match self.cache.get_or_resolve(&dir, &overrides).await {
            Ok(lookup) => {
                let formatter = lookup.config.formatter();
                Some(ResolvedFormatter {
                    name: formatter.name().to_string(),
                    version: formatter.version().to_string(),
                    loaded_from: formatter.source_path().to_path_buf(),
                    cache_hit: lookup.cache_hit,
                })
            }
            Err(e) => {
                debug!(error = %e, "debug resolution failed");
                None
            }
        };

        DebugSnapshot {
            resolved_formatter,
            cache_info,
        }
    }
}
