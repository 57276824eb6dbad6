//! Configuration management for jbup
//!
//! Settings live in a TOML file (`~/.config/jbup/jbup.toml` by default,
//! overridable with `JBUP_CONFIG`). Every value is optional; command-line
//! flags take precedence over whatever is stored here.

pub mod paths;
pub mod products;

pub use products::{ProductSpec, ProductTable};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "JBUP_CONFIG";

pub const CONFIG_FILE_NAME: &str = "jbup.toml";

pub const DEFAULT_MARKETPLACE_URL: &str = "https://plugins.jetbrains.com";
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_PLUGIN_TIMEOUT_SECS: u64 = 600;

/// Keys accepted by [`Config::get`] and [`Config::set`]
pub const KNOWN_KEYS: &[&str] = &[
    "plugins-dir",
    "build",
    "downloads-host",
    "marketplace-url",
    "max-redirects",
    "connect-timeout",
    "read-timeout",
    "plugin-timeout",
    "extractor",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown config key: {0}. Supported keys: {keys}", keys = KNOWN_KEYS.join(", "))]
    UnknownKey(String),

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

/// How downloaded archives are unpacked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractorKind {
    /// In-process zip reader
    #[default]
    Builtin,
    /// External `unzip` found on `PATH`
    Unzip,
}

impl FromStr for ExtractorKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "builtin" => Ok(ExtractorKind::Builtin),
            "unzip" => Ok(ExtractorKind::Unzip),
            _ => Err(ConfigError::InvalidValue {
                key: "extractor".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloads_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marketplace_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_redirects: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extractor: Option<String>,
    /// Plugin id -> version to install instead of the build-compatible one
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pins: BTreeMap<String, String>,
    /// Plugin id -> artifact URL used verbatim
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub direct: BTreeMap<String, String>,
    /// Replaces the builtin product table when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<ProductSpec>>,
}

impl Config {
    /// Resolved config file location, honoring `JBUP_CONFIG`
    pub fn path() -> PathBuf {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let trimmed = env_path.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(trimmed);
            }
        }
        paths::config_dir().join(CONFIG_FILE_NAME)
    }

    /// Load from the default location, returning an empty config if the file doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(&Self::path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to_path(&Self::path())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "plugins-dir" => self.plugins_dir.clone(),
            "build" => self.build.clone(),
            "downloads-host" => self.downloads_host.clone(),
            "marketplace-url" => self.marketplace_url.clone(),
            "max-redirects" => self.max_redirects.map(|v| v.to_string()),
            "connect-timeout" => self.connect_timeout_secs.map(|v| v.to_string()),
            "read-timeout" => self.read_timeout_secs.map(|v| v.to_string()),
            "plugin-timeout" => self.plugin_timeout_secs.map(|v| v.to_string()),
            "extractor" => self.extractor.clone(),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: String) -> Result<(), ConfigError> {
        fn number<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
            value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            })
        }

        match key {
            "plugins-dir" => self.plugins_dir = Some(value),
            "build" => self.build = Some(value),
            "downloads-host" => self.downloads_host = Some(value),
            "marketplace-url" => self.marketplace_url = Some(value),
            "max-redirects" => self.max_redirects = Some(number(key, &value)?),
            "connect-timeout" => self.connect_timeout_secs = Some(number(key, &value)?),
            "read-timeout" => self.read_timeout_secs = Some(number(key, &value)?),
            "plugin-timeout" => self.plugin_timeout_secs = Some(number(key, &value)?),
            "extractor" => {
                value.parse::<ExtractorKind>()?;
                self.extractor = Some(value);
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.values_iter().is_empty()
            && self.pins.is_empty()
            && self.direct.is_empty()
            && self.products.is_none()
    }

    /// Scalar settings that are set, in [`KNOWN_KEYS`] order
    pub fn values_iter(&self) -> Vec<(&'static str, String)> {
        KNOWN_KEYS
            .iter()
            .filter_map(|key| self.get(key).map(|value| (*key, value)))
            .collect()
    }

    pub fn plugins_dir_path(&self) -> Option<PathBuf> {
        self.plugins_dir.as_deref().map(paths::expand_tilde)
    }

    pub fn marketplace_url(&self) -> &str {
        self.marketplace_url
            .as_deref()
            .unwrap_or(DEFAULT_MARKETPLACE_URL)
    }

    pub fn max_redirects(&self) -> u32 {
        self.max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.connect_timeout_secs
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs.unwrap_or(DEFAULT_READ_TIMEOUT_SECS))
    }

    pub fn plugin_timeout(&self) -> Duration {
        Duration::from_secs(
            self.plugin_timeout_secs
                .unwrap_or(DEFAULT_PLUGIN_TIMEOUT_SECS),
        )
    }

    pub fn extractor_kind(&self) -> Result<ExtractorKind, ConfigError> {
        self.extractor
            .as_deref()
            .map_or(Ok(ExtractorKind::default()), |value| value.parse())
    }

    pub fn product_table(&self) -> ProductTable {
        self.products
            .clone()
            .map_or_else(ProductTable::builtin, ProductTable::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_new() {
        let config = Config::default();
        assert!(config.is_empty());
        assert_eq!(config.marketplace_url(), DEFAULT_MARKETPLACE_URL);
        assert_eq!(config.max_redirects(), 5);
    }

    #[test]
    fn test_config_set_get() {
        let mut config = Config::default();
        assert!(config.set("build", "RM-252.23892.415".to_string()).is_ok());
        assert_eq!(config.get("build"), Some("RM-252.23892.415".to_string()));
        assert!(!config.is_empty());
    }

    #[test]
    fn test_config_set_numeric() {
        let mut config = Config::default();
        assert!(config.set("max-redirects", "3".to_string()).is_ok());
        assert_eq!(config.max_redirects(), 3);
        assert!(matches!(
            config.set("read-timeout", "soon".to_string()),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_config_unknown_key() {
        let mut config = Config::default();
        assert!(matches!(
            config.set("unknown-key", "value".to_string()),
            Err(ConfigError::UnknownKey(_))
        ));
        assert_eq!(config.get("unknown-key"), None);
    }

    #[test]
    fn test_extractor_kind() {
        let mut config = Config::default();
        assert!(config.extractor_kind().is_ok_and(|k| k == ExtractorKind::Builtin));
        assert!(config.set("extractor", "unzip".to_string()).is_ok());
        assert!(config.extractor_kind().is_ok_and(|k| k == ExtractorKind::Unzip));
        assert!(config.set("extractor", "7z".to_string()).is_err());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let Ok(temp) = TempDir::new() else {
            return;
        };
        let loaded = Config::load_from_path(&temp.path().join("absent.toml"));
        assert!(loaded.is_ok_and(|c| c == Config::default()));
    }

    #[test]
    fn test_save_and_load_with_tables() {
        let Ok(temp) = TempDir::new() else {
            return;
        };
        let path = temp.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = Config {
            plugins_dir: Some("~/plugins".to_string()),
            downloads_host: Some("downloads.marketplace.jetbrains.com".to_string()),
            products: Some(vec![ProductSpec {
                code: "XX".to_string(),
                name: "Test IDE".to_string(),
                binaries: vec!["xx".to_string()],
                app_names: Vec::new(),
            }]),
            ..Default::default()
        };
        config.pins.insert("com.example.foo".to_string(), "1.2.3".to_string());

        assert!(config.save_to_path(&path).is_ok());
        let loaded = Config::load_from_path(&path);
        assert!(loaded.is_ok_and(|c| c == config
            && c.product_table().by_code("XX").is_some()
            && c.product_table().by_code("RM").is_none()));
    }

    #[test]
    fn test_parse_rejects_bad_toml() {
        let Ok(temp) = TempDir::new() else {
            return;
        };
        let path = temp.path().join(CONFIG_FILE_NAME);
        if fs::write(&path, "max_redirects = \"many\"").is_err() {
            return;
        }
        assert!(matches!(
            Config::load_from_path(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_durations_default() {
        let config = Config::default();
        assert_eq!(config.connect_timeout(), Duration::from_secs(15));
        assert_eq!(config.read_timeout(), Duration::from_secs(120));
        assert_eq!(config.plugin_timeout(), Duration::from_secs(600));
    }
}
