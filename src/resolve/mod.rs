//! Project configuration resolution
//!
//! Walks from a working directory toward the filesystem root (or a
//! configured boundary) and collects everything that shapes formatting:
//!
//! - the nearest config file (`.formatrc`, `.formatrc.json`,
//!   `.formatrc.toml`, or a `"fmtd"` key in `package.json`)
//! - every `.formatignore` on the way up
//! - `.editorconfig` files up to one marked `root = true`
//!
//! The result is an immutable [`ResolvedConfig`]. Nothing is cached here;
//! that is the job of [`crate::cache::ResolutionCache`].

pub mod editorconfig;
pub mod options;
pub mod rules;

pub use options::{EndOfLine, FormatOptions, OverrideOptions, PartialOptions};

use crate::format::{Formatter, FormatterRegistry};
use async_trait::async_trait;
use editorconfig::EditorConfig;
use rules::RuleSet;
use semver::VersionReq;
use serde::Deserialize;
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

/// Config file names checked in every directory, in priority order
pub const CONFIG_FILES: &[&str] = &[".formatrc", ".formatrc.json", ".formatrc.toml"];

/// Manifest that may carry a `"fmtd"` config object
pub const PACKAGE_MANIFEST: &str = "package.json";

pub const IGNORE_FILE: &str = ".formatignore";

pub const EDITORCONFIG_FILE: &str = ".editorconfig";

/// Why a directory could not be resolved
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Malformed config {path}: {reason}")]
    MalformedConfig { path: PathBuf, reason: String },

    #[error("Cannot read directory {path}: {source}")]
    UnreadableDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No formatter satisfies version requirement `{requirement}`")]
    FormatterUnavailable { requirement: String },
}

impl ResolutionError {
    fn malformed(path: &Path, reason: impl ToString) -> Self {
        Self::MalformedConfig {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// On-disk config file schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
struct ConfigFile {
    #[serde(alias = "printWidth")]
    print_width: Option<u16>,

    #[serde(alias = "tabWidth")]
    tab_width: Option<u8>,

    #[serde(alias = "useTabs")]
    use_tabs: Option<bool>,

    #[serde(alias = "singleQuote")]
    single_quote: Option<bool>,

    #[serde(alias = "endOfLine")]
    end_of_line: Option<EndOfLine>,

    /// Semver requirement on the formatter engine
    #[serde(alias = "requireVersion")]
    require_version: Option<VersionReq>,

    /// Per-file option sections
    overrides: Vec<OverrideSection>,
}

impl ConfigFile {
    fn options(&self) -> PartialOptions {
        PartialOptions {
            print_width: self.print_width,
            tab_width: self.tab_width,
            use_tabs: self.use_tabs,
            single_quote: self.single_quote,
            end_of_line: self.end_of_line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct OverrideSection {
    files: Vec<String>,
    #[serde(default)]
    options: PartialOptions,
}

#[derive(Debug, Deserialize)]
struct PackageManifest {
    fmtd: Option<ConfigFile>,
}

/// `[[overrides]]` section compiled against its config directory
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileOverride {
    rules: RuleSet,
    options: PartialOptions,
}

/// Everything that decides how files below one directory are formatted
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    root: PathBuf,
    formatter: Arc<dyn Formatter>,
    config_file: Option<PathBuf>,
    base: PartialOptions,
    overrides: Vec<FileOverride>,
    editorconfigs: Vec<EditorConfig>,
    ignores: Vec<RuleSet>,
    explicit: PartialOptions,
    sources: Vec<PathBuf>,
}

impl ResolvedConfig {
    /// Canonical directory this config was resolved for
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn formatter(&self) -> &Arc<dyn Formatter> {
        &self.formatter
    }

    /// Config file that supplied the base options, if any
    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    /// Every existing file consulted during resolution
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Effective options for `file`
    pub fn options_for(&self, file: &Path) -> FormatOptions {
        let mut layered = PartialOptions::default();
        for editorconfig in &self.editorconfigs {
            editorconfig.apply(file, &mut layered);
        }
        layered.layer(&self.base);
        for section in &self.overrides {
            if section.rules.matches(file) {
                layered.layer(&section.options);
            }
        }
        layered.layer(&self.explicit);
        layered.apply_to(FormatOptions::default())
    }

    /// Whether an ignore rule excludes `file` from formatting
    pub fn is_ignored(&self, file: &Path) -> bool {
        self.ignores.iter().any(|rules| rules.excludes(file))
    }
}

impl PartialEq for ResolvedConfig {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
            && self.formatter.name() == other.formatter.name()
            && self.formatter.version() == other.formatter.version()
            && self.formatter.source_path() == other.formatter.source_path()
            && self.config_file == other.config_file
            && self.base == other.base
            && self.overrides == other.overrides
            && self.editorconfigs == other.editorconfigs
            && self.ignores == other.ignores
            && self.explicit == other.explicit
            && self.sources == other.sources
    }
}

/// Something that can turn a directory into a [`ResolvedConfig`]
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(
        &self,
        dir: &Path,
        overrides: &OverrideOptions,
    ) -> Result<ResolvedConfig, ResolutionError>;
}

/// Filesystem-backed resolver
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    registry: FormatterRegistry,
    boundary: Option<PathBuf>,
    editorconfig: bool,
}

impl ConfigResolver {
    pub fn new(registry: FormatterRegistry) -> Self {
        Self {
            registry,
            boundary: None,
            editorconfig: true,
        }
    }

    /// Do not look above `boundary`
    pub fn with_boundary(mut self, boundary: Option<PathBuf>) -> Self {
        self.boundary = boundary;
        self
    }

    /// Globally enable or disable `.editorconfig` support
    pub fn with_editorconfig(mut self, enabled: bool) -> Self {
        self.editorconfig = enabled;
        self
    }

    async fn find_config(
        &self,
        dir: &Path,
    ) -> Result<Option<(PathBuf, ConfigFile)>, ResolutionError> {
        for name in CONFIG_FILES {
            let path = dir.join(name);
            if let Some(contents) = read_optional(&path).await? {
                let config = parse_config_file(&path, &contents)?;
                return Ok(Some((path, config)));
            }
        }

        let manifest = dir.join(PACKAGE_MANIFEST);
        if let Some(contents) = read_optional(&manifest).await? {
            if let Some(config) = parse_manifest(&manifest, &contents)? {
                return Ok(Some((manifest, config)));
            }
        }

        Ok(None)
    }

    async fn load_config(&self, path: &Path) -> Result<ConfigFile, ResolutionError> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|e| ResolutionError::malformed(path, e))?;
        if path.file_name() == Some(OsStr::new(PACKAGE_MANIFEST)) {
            return Ok(parse_manifest(path, &contents)?.unwrap_or_default());
        }
        parse_config_file(path, &contents)
    }

    async fn load_ignore(&self, path: &Path) -> Result<Option<RuleSet>, ResolutionError> {
        match read_optional(path).await? {
            Some(contents) => RuleSet::from_ignore_file(path, &contents)
                .map(Some)
                .map_err(|e| ResolutionError::malformed(path, e)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Resolve for ConfigResolver {
    async fn resolve(
        &self,
        dir: &Path,
        overrides: &OverrideOptions,
    ) -> Result<ResolvedConfig, ResolutionError> {
        let unreadable = |source: std::io::Error| ResolutionError::UnreadableDirectory {
            path: dir.to_path_buf(),
            source,
        };
        let meta = fs::metadata(dir).await.map_err(unreadable)?;
        if !meta.is_dir() {
            return Err(unreadable(std::io::Error::other("not a directory")));
        }
        let root = fs::canonicalize(dir).await.map_err(unreadable)?;

        let boundary = match &self.boundary {
            Some(b) => Some(fs::canonicalize(b).await.unwrap_or_else(|_| b.clone())),
            None => None,
        };

        let discover_config = !overrides.no_config && overrides.config_path.is_none();
        let discover_ignores = overrides.ignore_paths.is_empty();
        let mut discover_editorconfig = overrides.editorconfig && self.editorconfig;

        let mut config: Option<(PathBuf, ConfigFile)> = None;
        let mut ignores = Vec::new();
        let mut editorconfigs = Vec::new();
        let mut sources = Vec::new();

        for ancestor in root.ancestors() {
            if discover_config && config.is_none() {
                config = self.find_config(ancestor).await?;
                if let Some((path, _)) = &config {
                    debug!(path = %path.display(), "found config file");
                    sources.push(path.clone());
                }
            }

            if discover_ignores {
                let path = ancestor.join(IGNORE_FILE);
                if let Some(rules) = self.load_ignore(&path).await? {
                    debug!(path = %path.display(), "found ignore file");
                    ignores.push(rules);
                    sources.push(path);
                }
            }

            if discover_editorconfig {
                let path = ancestor.join(EDITORCONFIG_FILE);
                if let Some(contents) = read_optional(&path).await? {
                    let parsed = EditorConfig::parse(&path, &contents);
                    discover_editorconfig = !parsed.root;
                    editorconfigs.push(parsed);
                    sources.push(path);
                }
            }

            if boundary.as_deref() == Some(ancestor) {
                break;
            }
        }
        // outer directories first so nearer files win when layered
        editorconfigs.reverse();

        if let Some(path) = &overrides.config_path {
            let path = canonical_path(path).await;
            config = Some((path.clone(), self.load_config(&path).await?));
            sources.push(path);
        } else if config.is_none() && !overrides.no_config {
            if let Some(path) = &overrides.default_config {
                if fs::metadata(path).await.is_ok() {
                    let path = canonical_path(path).await;
                    config = Some((path.clone(), self.load_config(&path).await?));
                    sources.push(path);
                } else {
                    warn!(path = %path.display(), "default config does not exist");
                }
            }
        }

        for path in &overrides.ignore_paths {
            let path = canonical_path(path).await;
            match self.load_ignore(&path).await? {
                Some(rules) => {
                    ignores.push(rules);
                    sources.push(path);
                }
                None => debug!(path = %path.display(), "ignore path does not exist"),
            }
        }

        let (config_file, file) = match config {
            Some((path, file)) => (Some(path), file),
            None => (None, ConfigFile::default()),
        };

        let mut file_overrides = Vec::with_capacity(file.overrides.len());
        if let Some(path) = &config_file {
            let config_dir = path.parent().unwrap_or(path);
            for section in &file.overrides {
                let rules = RuleSet::from_patterns(config_dir, &section.files)
                    .map_err(|e| ResolutionError::malformed(path, e))?;
                file_overrides.push(FileOverride {
                    rules,
                    options: section.options.clone(),
                });
            }
        }

        let formatter = self
            .registry
            .select(file.require_version.as_ref())
            .ok_or_else(|| ResolutionError::FormatterUnavailable {
                requirement: file
                    .require_version
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "*".to_string()),
            })?;

        debug!(
            root = %root.display(),
            engine = formatter.name(),
            version = %formatter.version(),
            sources = sources.len(),
            "resolved config"
        );

        Ok(ResolvedConfig {
            root,
            formatter,
            base: file.options(),
            config_file,
            overrides: file_overrides,
            editorconfigs,
            ignores,
            explicit: overrides.options.clone(),
            sources,
        })
    }
}

/// Rules are anchored at their file's directory and matched against the
/// canonical target, so explicit paths must live in the same namespace.
async fn canonical_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path).await {
        return resolved;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => match fs::canonicalize(parent).await {
            Ok(parent) => parent.join(name),
            Err(_) => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

async fn read_optional(path: &Path) -> Result<Option<String>, ResolutionError> {
    match fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ResolutionError::malformed(path, e)),
    }
}

fn parse_config_file(path: &Path, contents: &str) -> Result<ConfigFile, ResolutionError> {
    let is_json = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => true,
        Some("toml") => false,
        _ => contents.trim_start().starts_with('{'),
    };

    if is_json {
        serde_json::from_str(contents).map_err(|e| ResolutionError::malformed(path, e))
    } else {
        toml::from_str(contents).map_err(|e| ResolutionError::malformed(path, e))
    }
}

/// `Ok(None)` when the manifest carries no `"fmtd"` key or is not ours to judge
fn parse_manifest(path: &Path, contents: &str) -> Result<Option<ConfigFile>, ResolutionError> {
    match serde_json::from_str::<PackageManifest>(contents) {
        Ok(manifest) => Ok(manifest.fmtd),
        Err(e) => {
            let has_key = serde_json::from_str::<serde_json::Value>(contents)
                .ok()
                .is_some_and(|v| v.get("fmtd").is_some());
            if has_key {
                Err(ResolutionError::malformed(path, e))
            } else {
                debug!(path = %path.display(), error = %e, "skipping unreadable manifest");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn resolver() -> ConfigResolver {
        ConfigResolver::new(FormatterRegistry::builtin())
    }

    fn canonical(temp: &TempDir) -> PathBuf {
        temp.path().canonicalize().unwrap()
    }

    async fn resolve(dir: &Path) -> Result<ResolvedConfig, ResolutionError> {
        resolver().resolve(dir, &OverrideOptions::default()).await
    }

    #[tokio::test]
    async fn defaults_without_config() {
        let temp = TempDir::new().unwrap();
        let config = resolve(temp.path()).await.unwrap();

        assert_eq!(config.root(), canonical(&temp));
        assert!(config.config_file().is_none());
        assert_eq!(
            config.options_for(&canonical(&temp).join("a.js")),
            FormatOptions::default()
        );
    }

    #[tokio::test]
    async fn nearest_config_wins() {
        let temp = TempDir::new().unwrap();
        let sub = temp.path().join("pkg");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(temp.path().join(".formatrc.toml"), "tab_width = 8\nuse_tabs = true\n").unwrap();
        std::fs::write(sub.join(".formatrc"), r#"{"tabWidth": 4}"#).unwrap();

        let config = resolve(&sub).await.unwrap();
        let options = config.options_for(&canonical(&temp).join("pkg/a.js"));

        assert_eq!(options.tab_width, 4);
        assert!(!options.use_tabs, "outer config must not leak through");
        assert_eq!(
            config.config_file(),
            Some(canonical(&temp).join("pkg/.formatrc").as_path())
        );
    }

    #[tokio::test]
    async fn explicit_overrides_beat_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".formatrc"), "tab_width = 8\n").unwrap();

        let overrides = OverrideOptions {
            options: PartialOptions {
                tab_width: Some(3),
                ..Default::default()
            },
            ..Default::default()
        };
        let config = resolver().resolve(temp.path(), &overrides).await.unwrap();

        assert_eq!(config.options_for(&canonical(&temp).join("a.ts")).tab_width, 3);
    }

    #[tokio::test]
    async fn malformed_config_is_reported() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".formatrc"), "tab_width = \"wide\"\n").unwrap();

        match resolve(temp.path()).await {
            Err(ResolutionError::MalformedConfig { path, .. }) => {
                assert_eq!(path, canonical(&temp).join(".formatrc"));
            }
            other => panic!("expected MalformedConfig, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_directory_is_unreadable() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");

        assert!(matches!(
            resolve(&missing).await,
            Err(ResolutionError::UnreadableDirectory { .. })
        ));
    }

    #[tokio::test]
    async fn package_manifest_key_is_a_config() {
        let temp = TempDir::new().unwrap();
        let sub = temp.path().join("app");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(temp.path().join("package.json"), r#"{"name":"root","fmtd":{"singleQuote":true}}"#).unwrap();
        std::fs::write(sub.join("package.json"), r#"{"name":"app","version":"1.0.0"}"#).unwrap();

        let config = resolve(&sub).await.unwrap();

        assert_eq!(
            config.config_file(),
            Some(canonical(&temp).join("package.json").as_path())
        );
        assert!(config.options_for(&canonical(&temp).join("app/x.js")).single_quote);
    }

    #[tokio::test]
    async fn ignore_files_merge_along_the_path() {
        let temp = TempDir::new().unwrap();
        let sub = temp.path().join("web");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(temp.path().join(".formatignore"), "*.min.js\n").unwrap();
        std::fs::write(sub.join(".formatignore"), "generated/\n").unwrap();

        let config = resolver()
            .with_boundary(Some(temp.path().to_path_buf()))
            .resolve(&sub, &OverrideOptions::default())
            .await
            .unwrap();
        let root = canonical(&temp);

        assert!(config.is_ignored(&root.join("web/app.min.js")));
        assert!(config.is_ignored(&root.join("web/generated/api.ts")));
        assert!(!config.is_ignored(&root.join("web/app.js")));
        assert_eq!(config.sources().len(), 2);
    }

    #[tokio::test]
    async fn editorconfig_sits_below_config_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".editorconfig"),
            "root = true\n[*]\nindent_size = 4\nmax_line_length = 120\n",
        )
        .unwrap();
        std::fs::write(temp.path().join(".formatrc"), "tab_width = 2\n").unwrap();

        let config = resolve(temp.path()).await.unwrap();
        let options = config.options_for(&canonical(&temp).join("a.css"));

        assert_eq!(options.tab_width, 2);
        assert_eq!(options.print_width, 120);

        let overrides = OverrideOptions {
            editorconfig: false,
            ..Default::default()
        };
        let config = resolver().resolve(temp.path(), &overrides).await.unwrap();
        assert_eq!(config.options_for(&canonical(&temp).join("a.css")).print_width, 80);
    }

    #[tokio::test]
    async fn per_file_overrides_apply_by_glob() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".formatrc"),
            "tab_width = 2\n\n[[overrides]]\nfiles = [\"*.json\"]\n[overrides.options]\ntab_width = 4\n",
        )
        .unwrap();

        let config = resolve(temp.path()).await.unwrap();
        let root = canonical(&temp);

        assert_eq!(config.options_for(&root.join("data/x.json")).tab_width, 4);
        assert_eq!(config.options_for(&root.join("x.js")).tab_width, 2);
    }

    #[tokio::test]
    async fn boundary_stops_the_walk() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("project");
        std::fs::create_dir(&project).unwrap();
        std::fs::write(temp.path().join(".formatrc"), "tab_width = 8\n").unwrap();

        let bounded = resolver().with_boundary(Some(project.clone()));
        let config = bounded
            .resolve(&project, &OverrideOptions::default())
            .await
            .unwrap();
        assert!(config.config_file().is_none());

        let config = resolve(&project).await.unwrap();
        assert!(config.config_file().is_some());
    }

    #[tokio::test]
    async fn unsatisfied_version_requirement() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(".formatrc"), "require_version = \">=999\"\n").unwrap();

        assert!(matches!(
            resolve(temp.path()).await,
            Err(ResolutionError::FormatterUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn default_config_only_when_nothing_found() {
        let temp = TempDir::new().unwrap();
        let fallback = temp.path().join("fallback.toml");
        std::fs::write(&fallback, "tab_width = 6\n").unwrap();
        let project = temp.path().join("project");
        std::fs::create_dir(&project).unwrap();

        let overrides = OverrideOptions {
            default_config: Some(fallback.clone()),
            ..Default::default()
        };
        let config = resolver()
            .with_boundary(Some(project.clone()))
            .resolve(&project, &overrides)
            .await
            .unwrap();
        assert_eq!(config.options_for(&canonical(&temp).join("project/a.js")).tab_width, 6);

        std::fs::write(project.join(".formatrc.toml"), "tab_width = 3\n").unwrap();
        let config = resolver().resolve(&project, &overrides).await.unwrap();
        assert_eq!(config.options_for(&canonical(&temp).join("project/a.js")).tab_width, 3);
    }
}
