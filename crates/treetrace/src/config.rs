//! Configuration management for treetrace.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Duration;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "treetrace";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "treetrace.db";

/// Longest accepted session lifetime: 100 years.
const MAX_SESSION_TTL_HOURS: u32 = 100 * 366 * 24;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `TREETRACE_`, sections split by `__`)
/// 2. TOML config file at `~/.config/treetrace/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Tree traversal limits.
    pub tree: TreeConfig,
    /// Relative suggestion matching.
    pub suggestions: SuggestionConfig,
    /// User search limits.
    pub search: SearchConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the API listens on.
    pub bind_address: String,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/treetrace/treetrace.db`
    pub database_path: Option<PathBuf>,
}

/// Authentication-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// How long an issued session token stays valid.
    pub session_ttl_hours: u32,
    /// Minimum accepted password length at registration.
    pub min_password_length: usize,
}

/// Limits applied to ancestor/descendant traversals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Generations walked when the request does not ask for a depth.
    pub default_depth: usize,
    /// Hard cap on requested depth.
    pub max_depth: usize,
}

/// Relative suggestion configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    /// Minimum score for a candidate to be suggested.
    pub min_score: u32,
    /// Maximum number of suggestions returned.
    pub max_results: usize,
}

/// User search configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum number of users returned by a search.
    pub max_results: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: 168,
            min_password_length: 8,
        }
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            default_depth: 4,
            max_depth: 12,
        }
    }
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            min_score: 4,
            max_results: 20,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { max_results: 25 }
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("TREETRACE_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        self.bind_address()?;

        if !(1..=MAX_SESSION_TTL_HOURS).contains(&self.auth.session_ttl_hours) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "session_ttl_hours must be between 1 and {MAX_SESSION_TTL_HOURS}"
                ),
            });
        }

        if self.tree.max_depth == 0 {
            return Err(Error::ConfigValidation {
                message: "max_depth must be greater than 0".to_string(),
            });
        }

        if self.tree.default_depth > self.tree.max_depth {
            return Err(Error::ConfigValidation {
                message: format!(
                    "default_depth ({}) cannot be greater than max_depth ({})",
                    self.tree.default_depth, self.tree.max_depth
                ),
            });
        }

        if self.suggestions.max_results == 0 || self.search.max_results == 0 {
            return Err(Error::ConfigValidation {
                message: "max_results must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Parse the configured bind address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not a valid socket address.
    pub fn bind_address(&self) -> Result<SocketAddr> {
        self.server
            .bind_address
            .parse()
            .map_err(|e| Error::ConfigValidation {
                message: format!("invalid bind_address {}: {e}", self.server.bind_address),
            })
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the session lifetime as a Duration.
    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::hours(i64::from(self.auth.session_ttl_hours))
    }

    /// Clamp a requested traversal depth to the configured limits.
    #[must_use]
    pub fn resolve_depth(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.tree.default_depth)
            .min(self.tree.max_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert!(config.storage.database_path.is_none());
        assert_eq!(config.auth.session_ttl_hours, 168);
        assert_eq!(config.auth.min_password_length, 8);
        assert_eq!(config.tree.default_depth, 4);
        assert_eq!(config.tree.max_depth, 12);
        assert_eq!(config.suggestions.min_score, 4);
        assert_eq!(config.suggestions.max_results, 20);
        assert_eq!(config.search.max_results, 25);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_bad_bind_address() {
        let mut config = Config::default();
        config.server.bind_address = "not an address".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("bind_address"));
    }

    #[test]
    fn test_validate_zero_ttl() {
        let mut config = Config::default();
        config.auth.session_ttl_hours = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("session_ttl_hours"));
    }

    #[test]
    fn test_validate_ttl_upper_bound() {
        let mut config = Config::default();
        config.auth.session_ttl_hours = u32::MAX;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("session_ttl_hours"));

        config.auth.session_ttl_hours = MAX_SESSION_TTL_HOURS;
        assert!(config.validate().is_ok());
        assert!(Utc::now().checked_add_signed(config.session_ttl()).is_some());
    }

    #[test]
    fn test_validate_default_depth_above_max() {
        let mut config = Config::default();
        config.tree.default_depth = 20;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("default_depth"));
    }

    #[test]
    fn test_validate_zero_max_depth() {
        let mut config = Config::default();
        config.tree.max_depth = 0;
        config.tree.default_depth = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_depth"));
    }

    #[test]
    fn test_validate_zero_result_limits() {
        let mut config = Config::default();
        config.search.max_results = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.suggestions.max_results = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_path_default() {
        let path = Config::default().database_path();
        assert!(path.to_string_lossy().contains("treetrace.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_session_ttl() {
        assert_eq!(Config::default().session_ttl(), Duration::hours(168));
    }

    #[test]
    fn test_resolve_depth() {
        let config = Config::default();
        assert_eq!(config.resolve_depth(None), 4);
        assert_eq!(config.resolve_depth(Some(2)), 2);
        assert_eq!(config.resolve_depth(Some(100)), 12);
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("treetrace"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    // Loading reads TREETRACE_ variables, so these tests run inside a Jail to
    // keep their environment apart.

    #[test]
    fn test_load_nonexistent_config() {
        Jail::expect_with(|_| {
            let config =
                Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                "[server]\nbind_address = \"0.0.0.0:9000\"\n\n[tree]\nmax_depth = 6\n",
            )?;

            let config = Config::load_from(Some(jail.directory().join("config.toml"))).unwrap();
            assert_eq!(config.server.bind_address, "0.0.0.0:9000");
            assert_eq!(config.tree.max_depth, 6);
            assert_eq!(config.tree.default_depth, 4);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[tree]\nmax_depth = 6\n")?;
            jail.set_env("TREETRACE_TREE__MAX_DEPTH", "9");
            jail.set_env("TREETRACE_AUTH__SESSION_TTL_HOURS", "2");

            let config = Config::load_from(Some(jail.directory().join("config.toml"))).unwrap();
            assert_eq!(config.tree.max_depth, 9);
            assert_eq!(config.auth.session_ttl_hours, 2);
            assert_eq!(config.session_ttl(), Duration::hours(2));
            Ok(())
        });
    }

    #[test]
    fn test_env_values_are_validated() {
        Jail::expect_with(|jail| {
            jail.set_env("TREETRACE_TREE__MAX_DEPTH", "2");

            let err = Config::load_from(Some(jail.directory().join("missing.toml"))).unwrap_err();
            assert!(err.to_string().contains("default_depth"));
            Ok(())
        });
    }

    #[test]
    fn test_load_invalid_toml_values_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[tree]\ndefault_depth = 9\nmax_depth = 3\n")?;

            assert!(Config::load_from(Some(jail.directory().join("config.toml"))).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_auth_config_deserialize() {
        let json = r#"{"session_ttl_hours": 2}"#;
        let auth: AuthConfig = serde_json::from_str(json).unwrap();
        assert_eq!(auth.session_ttl_hours, 2);
        assert_eq!(auth.min_password_length, 8);
    }
}
