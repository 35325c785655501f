//! Configuration file format, defaults and validation

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the arcconf utility
pub const DEFAULT_ARCCONF_PATH: &str = "/usr/local/bin/arcconf";

/// Default namespace for exported metric names
pub const DEFAULT_PREFIX: &str = "adaptec";

/// Exporter configuration, loaded from TOML
///
/// Every key is optional:
///
/// ```toml
/// [arcconf]
/// path = "/usr/local/bin/arcconf"
/// timeout_seconds = 30
///
/// [exposition]
/// prefix = "adaptec"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub arcconf: ArcconfConfig,
    pub exposition: ExpositionConfig,
}

/// How the arcconf utility is invoked
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArcconfConfig {
    pub path: PathBuf,
    pub timeout_seconds: u64,
}

impl Default for ArcconfConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_ARCCONF_PATH),
            timeout_seconds: 30,
        }
    }
}

impl ArcconfConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// How metrics are written
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExpositionConfig {
    /// Namespace joined to every metric name with `_`; empty disables it
    pub prefix: String,
}

impl Default for ExpositionConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read, a TOML
    /// error if it does not parse, or `ConfigError::ValidationError` if a
    /// value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.arcconf.path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "arcconf.path must not be empty".to_string(),
            ));
        }

        if self.arcconf.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "arcconf.timeout_seconds must be greater than zero".to_string(),
            ));
        }

        if !self.exposition.prefix.is_empty() && !is_valid_metric_prefix(&self.exposition.prefix) {
            return Err(ConfigError::ValidationError(format!(
                "exposition.prefix '{}' is not a valid metric name",
                self.exposition.prefix
            )));
        }

        Ok(())
    }
}

/// Metric names match `[a-zA-Z_:][a-zA-Z0-9_:]*`
fn is_valid_metric_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.arcconf.path, PathBuf::from("/usr/local/bin/arcconf"));
        assert_eq!(config.arcconf.timeout(), Duration::from_secs(30));
        assert_eq!(config.exposition.prefix, "adaptec");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml("[arcconf]\ntimeout_seconds = 5\n").unwrap();
        assert_eq!(config.arcconf.timeout_seconds, 5);
        assert_eq!(config.arcconf.path, PathBuf::from(DEFAULT_ARCCONF_PATH));
        assert_eq!(config.exposition.prefix, DEFAULT_PREFIX);
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[arcconf]\npath = \"/opt/arcconf\"\n\n[exposition]\nprefix = \"raid\""
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.arcconf.path, PathBuf::from("/opt/arcconf"));
        assert_eq!(config.exposition.prefix, "raid");
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let result = Config::from_file(Path::new("/nonexistent/exporter.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Config::from_toml("[arcconf\npath ="),
            Err(ConfigError::TomlError(_))
        ));
        assert!(matches!(
            Config::from_toml("[arcconf]\nunknown = 1\n"),
            Err(ConfigError::TomlError(_))
        ));
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            Config::from_toml("[arcconf]\ntimeout_seconds = 0\n"),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            Config::from_toml("[arcconf]\npath = \"\"\n"),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            Config::from_toml("[exposition]\nprefix = \"9lives\"\n"),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(Config::from_toml("[exposition]\nprefix = \"\"\n").is_ok());
    }

    #[test]
    fn test_metric_prefix_rules() {
        assert!(is_valid_metric_prefix("adaptec"));
        assert!(is_valid_metric_prefix("_raid:ctl_1"));
        assert!(!is_valid_metric_prefix("has space"));
        assert!(!is_valid_metric_prefix("dash-ed"));
        assert!(!is_valid_metric_prefix("1abc"));
    }
}
