//! Core runtime configuration.
//!
//! # Responsibility
//! - Hold the settings shared by FFI and CLI entry points.
//! - Load an optional JSON config file named by `QUADMARK_CONFIG`.
//! - Resolve overrides from `QUADMARK_*` environment variables.
//!
//! # Invariants
//! - Precedence is defaults, then the config file, then environment values.
//! - Every field has a usable default; an unreadable config file is logged
//!   and skipped.
//! - Blank override values are ignored rather than applied.

use crate::logging::default_log_level;
use crate::model::auto_tag::DEFAULT_REQUIRED_PACKAGES;
use log::warn;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "QUADMARK_CONFIG";
pub const ENV_DB_PATH: &str = "QUADMARK_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "QUADMARK_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "QUADMARK_LOG_DIR";
pub const ENV_REQUIRED_PACKAGES: &str = "QUADMARK_REQUIRED_PACKAGES";

const DEFAULT_DB_FILE_NAME: &str = "quadmark.sqlite3";
const DEFAULT_LOG_DIR_NAME: &str = "quadmark-logs";

/// Settings consumed by process entry points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: PathBuf,
    /// Required packages applied when a user configured none.
    pub required_packages: Vec<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        let base_dir = std::env::temp_dir();
        Self {
            db_path: base_dir.join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: base_dir.join(DEFAULT_LOG_DIR_NAME),
            required_packages: DEFAULT_REQUIRED_PACKAGES
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
        }
    }
}

impl CoreConfig {
    /// Resolves settings from the process environment.
    pub fn from_env() -> Self {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Config file named by `QUADMARK_CONFIG` (or defaults), then overrides.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path = lookup(ENV_CONFIG_PATH)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let base = match path {
            Some(path) => Self::from_file(&path).unwrap_or_else(|err| {
                warn!("event=config_load module=config status=error path={path} error={err}");
                Self::default()
            }),
            None => Self::default(),
        };
        base.with_overrides(lookup)
    }

    /// Reads a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json(&text)
    }

    /// Parses a JSON document; missing fields fall back to defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(ConfigError::Parse)
    }

    /// Applies `QUADMARK_*` overrides read through `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = non_blank(ENV_DB_PATH) {
            self.db_path = PathBuf::from(value);
        }
        if let Some(value) = non_blank(ENV_LOG_LEVEL) {
            self.log_level = value;
        }
        if let Some(value) = non_blank(ENV_LOG_DIR) {
            self.log_dir = PathBuf::from(value);
        }
        if let Some(value) = non_blank(ENV_REQUIRED_PACKAGES) {
            let packages = parse_package_list(&value);
            if !packages.is_empty() {
                self.required_packages = packages;
            }
        }
        self
    }
}

fn parse_package_list(raw: &str) -> Vec<String> {
    let mut packages = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        if !packages.iter().any(|existing: &String| existing == name) {
            packages.push(name.to_string());
        }
    }
    packages
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "core config unreadable: {err}"),
            Self::Parse(err) => write!(f, "invalid core config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ConfigError, CoreConfig, ENV_CONFIG_PATH, ENV_DB_PATH, ENV_LOG_LEVEL,
        ENV_REQUIRED_PACKAGES,
    };
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn defaults_require_next() {
        let config = CoreConfig::default();
        assert_eq!(config.required_packages, vec!["next".to_string()]);
        assert!(config.db_path.ends_with("quadmark.sqlite3"));
    }

    #[test]
    fn overrides_replace_non_blank_values_only() {
        let config = CoreConfig::default().with_overrides(lookup_from(&[
            (ENV_DB_PATH, "/data/board.sqlite3"),
            (ENV_LOG_LEVEL, "   "),
            (ENV_REQUIRED_PACKAGES, "next, nuxt,,next"),
        ]));

        assert_eq!(config.db_path, PathBuf::from("/data/board.sqlite3"));
        assert_eq!(config.log_level, CoreConfig::default().log_level);
        assert_eq!(
            config.required_packages,
            vec!["next".to_string(), "nuxt".to_string()]
        );
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = CoreConfig::from_json(r#"{"log_level":"warn"}"#).unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.required_packages, vec!["next".to_string()]);

        assert!(CoreConfig::from_json("{not json").is_err());
    }

    #[test]
    fn config_file_sits_between_defaults_and_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quadmark.json");
        std::fs::write(
            &path,
            r#"{"log_level":"debug","required_packages":["nuxt"]}"#,
        )
        .unwrap();
        let path = path.to_string_lossy().into_owned();

        let config = CoreConfig::resolve(lookup_from(&[
            (ENV_CONFIG_PATH, path.as_str()),
            (ENV_LOG_LEVEL, "error"),
        ]));
        assert_eq!(config.log_level, "error");
        assert_eq!(config.required_packages, vec!["nuxt".to_string()]);
        assert_eq!(config.db_path, CoreConfig::default().db_path);
    }

    #[test]
    fn unreadable_config_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(matches!(
            CoreConfig::from_file(&missing),
            Err(ConfigError::Io(_))
        ));

        let missing = missing.to_string_lossy().into_owned();
        let config = CoreConfig::resolve(lookup_from(&[(ENV_CONFIG_PATH, missing.as_str())]));
        assert_eq!(config, CoreConfig::default());
    }
}
