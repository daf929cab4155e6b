//! Daemon settings schema
//!
//! Stored at `~/.config/fmtd/config.toml`. These settings shape the daemon
//! process; per-project formatting options live in `.formatrc` files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Resolution cache settings
    pub cache: CacheConfig,

    /// Config discovery settings
    pub resolver: ResolverConfig,
}

impl Config {
    /// Check values serde cannot
    pub fn validate(&self) -> Result<(), String> {
        match self.general.log_format.as_str() {
            "text" | "json" => {}
            other => {
                return Err(format!(
                    "general.log_format must be \"text\" or \"json\", got \"{other}\""
                ))
            }
        }

        if let Some(boundary) = &self.resolver.boundary {
            if !boundary.is_absolute() {
                return Err(format!(
                    "resolver.boundary must be an absolute path, got {}",
                    boundary.display()
                ));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Re-check consulted config files on every hit (default: false, flush only)
    pub revalidate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Never look for project config above this directory
    pub boundary: Option<PathBuf>,

    /// Read `.editorconfig` files (default: true)
    pub editorconfig: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            boundary: None,
            editorconfig: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[cache]"));
        assert!(toml.contains("[resolver]"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.resolver.editorconfig);
        assert!(!config.cache.revalidate);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [resolver]
            boundary = "/home/dev"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.resolver.boundary, Some(PathBuf::from("/home/dev")));
        assert!(config.resolver.editorconfig); // default preserved
        assert_eq!(config.general.log_format, "text");
    }

    #[test]
    fn validate_rejects_unknown_log_format() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.general.log_format = "yaml".to_string();
        assert!(config.validate().unwrap_err().contains("log_format"));
    }

    #[test]
    fn validate_rejects_relative_boundary() {
        let mut config = Config::default();
        config.resolver.boundary = Some(PathBuf::from("projects"));
        assert!(config.validate().is_err());
    }
}
