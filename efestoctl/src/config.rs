//! CLI configuration management
//!
//! Holds the fixed endpoint and credential values the client uses for every
//! login, plus the session file location and request timeout.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default Efesto portal for Jolly Mec heaters
pub const DEFAULT_SERVER_URL: &str = "http://jollymec.efesto.web2app.it";

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CliConfig {
    /// Base URL of the Efesto portal
    pub server_url: String,

    /// Account username (login form email)
    pub username: String,

    /// Account password
    pub password: String,

    /// Identifier of the heater this client controls
    pub heater_id: String,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Where the session cookies are persisted between invocations
    pub session_file: PathBuf,

    /// Enable verbose logging by default
    pub verbose: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            username: String::new(),
            password: String::new(),
            heater_id: String::new(),
            timeout: 10,
            session_file: default_session_file(),
            verbose: false,
        }
    }
}

/// Default location of the persisted session blob
fn default_session_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("efesto")
        .join("session.json")
}

impl CliConfig {
    /// Load configuration from file, falling back to defaults if absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).context("Failed to read CLI config file")?;
            toml::from_str(&content).context("Failed to parse CLI config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot determine config directory"))?;
        Ok(config_dir.join("efesto").join("cli.toml"))
    }

    /// Create a new builder for constructing configuration
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for CLI configuration with validation and priority chain support
///
/// Priority chain (lowest to highest):
/// 1. Defaults
/// 2. Config file
/// 3. Environment variables
/// 4. CLI arguments
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    server_url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    heater_id: Option<String>,
    timeout: Option<u64>,
    session_file: Option<PathBuf>,
    verbose: Option<bool>,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set server URL (with validation)
    pub fn with_server_url(mut self, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        Self::validate_url(&url)?;
        self.server_url = Some(url);
        Ok(self)
    }

    /// Set account username
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set account password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set heater identifier
    pub fn with_heater_id(mut self, heater_id: impl Into<String>) -> Self {
        self.heater_id = Some(heater_id.into());
        self
    }

    /// Set timeout (with validation)
    pub fn with_timeout(mut self, timeout: u64) -> Result<Self> {
        Self::validate_timeout(timeout)?;
        self.timeout = Some(timeout);
        Ok(self)
    }

    /// Set session file path
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    /// Set verbose flag
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Load configuration from file
    pub fn with_config_file(self, load_file: bool) -> Result<Self> {
        if !load_file {
            return Ok(self);
        }

        match CliConfig::load() {
            Ok(config) => Ok(self.merge_file(config)),
            // If the file doesn't exist or can't be loaded, continue with
            // current builder
            Err(_) => Ok(self),
        }
    }

    /// Load configuration from an explicit file path
    pub fn with_config_file_at(self, path: &PathBuf) -> Result<Self> {
        let config = CliConfig::load_from(path)?;
        Ok(self.merge_file(config))
    }

    fn merge_file(self, config: CliConfig) -> Self {
        // Only use file values if they weren't already set (preserving priority)
        Self {
            server_url: self.server_url.or(Some(config.server_url)),
            username: self.username.or(Some(config.username)),
            password: self.password.or(Some(config.password)),
            heater_id: self.heater_id.or(Some(config.heater_id)),
            timeout: self.timeout.or(Some(config.timeout)),
            session_file: self.session_file.or(Some(config.session_file)),
            verbose: self.verbose.or(Some(config.verbose)),
        }
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(mut self) -> Self {
        // Only apply env vars if values weren't already set (preserving priority)
        if self.server_url.is_none() {
            if let Ok(server_url) = std::env::var("EFESTO_SERVER") {
                if Self::validate_url(&server_url).is_ok() {
                    self.server_url = Some(server_url);
                }
            }
        }

        if self.username.is_none() {
            if let Ok(username) = std::env::var("EFESTO_USERNAME") {
                self.username = Some(username);
            }
        }

        if self.password.is_none() {
            if let Ok(password) = std::env::var("EFESTO_PASSWORD") {
                self.password = Some(password);
            }
        }

        if self.heater_id.is_none() {
            if let Ok(heater_id) = std::env::var("EFESTO_HEATER_ID") {
                self.heater_id = Some(heater_id);
            }
        }

        if self.timeout.is_none() {
            if let Ok(timeout) = std::env::var("EFESTO_TIMEOUT") {
                if let Ok(timeout) = timeout.parse() {
                    if Self::validate_timeout(timeout).is_ok() {
                        self.timeout = Some(timeout);
                    }
                }
            }
        }

        if self.session_file.is_none() {
            if let Ok(path) = std::env::var("EFESTO_SESSION_FILE") {
                self.session_file = Some(PathBuf::from(path));
            }
        }

        if self.verbose.is_none() {
            if let Ok(verbose) = std::env::var("EFESTO_VERBOSE") {
                self.verbose = Some(verbose.to_lowercase() == "true" || verbose == "1");
            }
        }

        self
    }

    /// Build the final configuration with validation
    pub fn build(self) -> Result<CliConfig> {
        let defaults = CliConfig::default();

        let server_url = self.server_url.unwrap_or(defaults.server_url);
        let timeout = self.timeout.unwrap_or(defaults.timeout);

        // Validate final values
        Self::validate_url(&server_url)?;
        Self::validate_timeout(timeout)?;

        Ok(CliConfig {
            server_url: server_url.trim_end_matches('/').to_string(),
            username: self.username.unwrap_or(defaults.username),
            password: self.password.unwrap_or(defaults.password),
            heater_id: self.heater_id.unwrap_or(defaults.heater_id),
            timeout,
            session_file: self.session_file.unwrap_or(defaults.session_file),
            verbose: self.verbose.unwrap_or(defaults.verbose),
        })
    }

    /// Validate URL format
    fn validate_url(url: &str) -> Result<()> {
        if url.is_empty() {
            return Err(anyhow::anyhow!("Server URL cannot be empty"));
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "Server URL must start with http:// or https://"
            ));
        }

        Ok(())
    }

    /// Validate timeout value
    fn validate_timeout(timeout: u64) -> Result<()> {
        if timeout == 0 {
            return Err(anyhow::anyhow!("Timeout must be greater than 0"));
        }

        if timeout > 300 {
            return Err(anyhow::anyhow!(
                "Timeout must be less than or equal to 300 seconds"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert!(config.username.is_empty());
        assert_eq!(config.timeout, 10);
        assert!(!config.verbose);
        assert!(config.session_file.ends_with("efesto/session.json"));
    }

    #[test]
    fn test_config_serialization() {
        let config = CliConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: CliConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, parsed);
    }

    #[test]
    fn test_builder_with_defaults() {
        let config = ConfigBuilder::new().build().unwrap();
        let defaults = CliConfig::default();
        assert_eq!(config, defaults);
    }

    #[test]
    fn test_builder_with_custom_values() {
        let config = ConfigBuilder::new()
            .with_server_url("http://example.com:8080")
            .unwrap()
            .with_username("user@example.com")
            .with_password("secret")
            .with_heater_id("1234")
            .with_timeout(30)
            .unwrap()
            .with_session_file("/tmp/efesto-session.json")
            .with_verbose(true)
            .build()
            .unwrap();

        assert_eq!(config.server_url, "http://example.com:8080");
        assert_eq!(config.username, "user@example.com");
        assert_eq!(config.password, "secret");
        assert_eq!(config.heater_id, "1234");
        assert_eq!(config.timeout, 30);
        assert_eq!(config.session_file, PathBuf::from("/tmp/efesto-session.json"));
        assert!(config.verbose);
    }

    #[test]
    fn test_builder_url_validation() {
        assert!(ConfigBuilder::new().with_server_url("").is_err());
        assert!(ConfigBuilder::new()
            .with_server_url("ftp://example.com")
            .is_err());

        assert!(ConfigBuilder::new()
            .with_server_url("http://localhost:3000")
            .is_ok());
        assert!(ConfigBuilder::new()
            .with_server_url("https://example.com")
            .is_ok());
    }

    #[test]
    fn test_builder_normalizes_trailing_slash() {
        let config = ConfigBuilder::new()
            .with_server_url("http://example.com/")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.server_url, "http://example.com");
    }

    #[test]
    fn test_builder_timeout_validation() {
        assert!(ConfigBuilder::new().with_timeout(0).is_err());
        assert!(ConfigBuilder::new().with_timeout(301).is_err());

        assert!(ConfigBuilder::new().with_timeout(1).is_ok());
        assert!(ConfigBuilder::new().with_timeout(300).is_ok());
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli.toml");

        let mut config = CliConfig::default();
        config.username = "user@example.com".to_string();
        config.heater_id = "1234".to_string();
        std::fs::write(&path, toml::to_string(&config).unwrap()).unwrap();

        let builder_config = ConfigBuilder::new()
            .with_config_file_at(&path)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(builder_config.username, "user@example.com");
        assert_eq!(builder_config.heater_id, "1234");
    }

    #[test]
    #[serial]
    fn test_builder_with_env_overrides() {
        std::env::set_var("EFESTO_SERVER", "http://env.example.com:9000");
        std::env::set_var("EFESTO_USERNAME", "env-user");
        std::env::set_var("EFESTO_TIMEOUT", "25");
        std::env::set_var("EFESTO_VERBOSE", "true");

        let config = ConfigBuilder::new().with_env_overrides().build().unwrap();

        assert_eq!(config.server_url, "http://env.example.com:9000");
        assert_eq!(config.username, "env-user");
        assert_eq!(config.timeout, 25);
        assert!(config.verbose);

        // Clean up
        std::env::remove_var("EFESTO_SERVER");
        std::env::remove_var("EFESTO_USERNAME");
        std::env::remove_var("EFESTO_TIMEOUT");
        std::env::remove_var("EFESTO_VERBOSE");
    }

    #[test]
    #[serial]
    fn test_builder_env_does_not_override_cli_values() {
        std::env::set_var("EFESTO_SERVER", "http://env.example.com:9000");
        std::env::set_var("EFESTO_TIMEOUT", "25");

        // CLI-level value set before the env pass wins over the env var
        let config = ConfigBuilder::new()
            .with_server_url("http://cli.example.com:7000")
            .unwrap()
            .with_env_overrides()
            .build()
            .unwrap();

        assert_eq!(config.server_url, "http://cli.example.com:7000");
        // Env var still applies for timeout
        assert_eq!(config.timeout, 25);

        // Clean up
        std::env::remove_var("EFESTO_SERVER");
        std::env::remove_var("EFESTO_TIMEOUT");
    }

    #[test]
    #[serial]
    fn test_builder_invalid_env_values_ignored() {
        std::env::set_var("EFESTO_SERVER", "ftp://env.example.com");
        std::env::set_var("EFESTO_TIMEOUT", "invalid");

        let config = ConfigBuilder::new().with_env_overrides().build().unwrap();

        // Invalid values fall back to defaults
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.timeout, 10);

        // Clean up
        std::env::remove_var("EFESTO_SERVER");
        std::env::remove_var("EFESTO_TIMEOUT");
    }

    #[test]
    fn test_builder_priority_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli.toml");

        let mut file_config = CliConfig::default();
        file_config.username = "file-user".to_string();
        file_config.timeout = 20;
        std::fs::write(&path, toml::to_string(&file_config).unwrap()).unwrap();

        // CLI-level value set before the file wins over the file value
        let config = ConfigBuilder::new()
            .with_username("cli-user")
            .with_config_file_at(&path)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.username, "cli-user");
        assert_eq!(config.timeout, 20);
    }
}
