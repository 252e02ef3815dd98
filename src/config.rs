//! Configuration loading and management.
//!
//! Values come from, in increasing precedence: built-in defaults, an optional
//! YAML file, environment variables, and CLI flags (applied by `main`).
//!
//! ## Environment Variables
//! - `PORT` - Service listen port (default: 5002)
//! - `NODE_ENV` / `APP_ENV` - Deployment environment name (default: `development`)
//! - `DB_BACKEND` - `postgres` (default) or `sqlite`
//! - `DB_PATH` - SQLite database file (default: `tasks.db`)
//! - `DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_USER`, `DB_PASSWORD` - PostgreSQL
//!   connection settings; the `POSTGRES_*` names are accepted as fallbacks
//! - `DB_MAX_CONNECTIONS` - PostgreSQL pool size (default: 10)
//! - `DB_INIT_RETRY_INITIAL_MS`, `DB_INIT_RETRY_MAX_MS`,
//!   `DB_INIT_RETRY_MULTIPLIER`, `DB_INIT_RETRY_MAX_ATTEMPTS` - table
//!   creation backoff
//! - `TASKS_API_URL` - API base URL used by clients

use crate::db::InitPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Default service port.
pub const DEFAULT_PORT: u16 = 5002;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Full application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub client: ClientConfig,
}

/// HTTP service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Deployment environment name, reported by `/health`.
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    "development".to_string()
}

/// Which database engine backs the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Postgres,
    Sqlite,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(StoreBackend::Postgres),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

/// Store connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_db_host")]
    pub host: String,

    #[serde(default = "default_db_port")]
    pub port: u16,

    /// Database name.
    #[serde(default = "default_db_name")]
    pub name: String,

    #[serde(default = "default_db_user")]
    pub user: String,

    #[serde(default = "default_db_password")]
    pub password: String,

    /// Maximum pooled PostgreSQL connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Backoff for table creation at startup.
    #[serde(default)]
    pub retry: InitPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_db_path(),
            host: default_db_host(),
            port: default_db_port(),
            name: default_db_name(),
            user: default_db_user(),
            password: default_db_password(),
            max_connections: default_max_connections(),
            retry: InitPolicy::default(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("tasks.db")
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_db_name() -> String {
    "TaskDb".to_string()
}

fn default_db_user() -> String {
    "postgres".to_string()
}

fn default_db_password() -> String {
    "password".to_string()
}

fn default_max_connections() -> u32 {
    10
}

/// Client-side configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Explicit API base URL; when unset it is derived from the environment.
    #[serde(default)]
    pub api_url: Option<String>,
}

impl Config {
    /// Load configuration from a YAML file. Missing sections use defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the optional file, then overlay the process environment.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay values from an environment lookup function.
    pub fn apply_env<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |keys: &[&str]| -> Option<(String, String)> {
            keys.iter()
                .find_map(|key| var(key).map(|value| (key.to_string(), value)))
        };

        if let Some((key, value)) = lookup(&["PORT"]) {
            self.server.port = parse_value(&key, &value)?;
        }
        if let Some((_, value)) = lookup(&["NODE_ENV", "APP_ENV"]) {
            self.server.environment = value;
        }

        if let Some((key, value)) = lookup(&["DB_BACKEND"]) {
            self.store.backend = value.parse().map_err(|message| ConfigError::InvalidValue {
                key,
                message,
            })?;
        }
        if let Some((_, value)) = lookup(&["DB_PATH"]) {
            self.store.path = PathBuf::from(value);
        }
        if let Some((_, value)) = lookup(&["DB_HOST"]) {
            self.store.host = value;
        }
        if let Some((key, value)) = lookup(&["DB_PORT", "POSTGRES_PORT"]) {
            self.store.port = parse_value(&key, &value)?;
        }
        if let Some((_, value)) = lookup(&["DB_NAME", "POSTGRES_DB"]) {
            self.store.name = value;
        }
        if let Some((_, value)) = lookup(&["DB_USER", "POSTGRES_USER"]) {
            self.store.user = value;
        }
        if let Some((_, value)) = lookup(&["DB_PASSWORD", "POSTGRES_PASSWORD"]) {
            self.store.password = value;
        }
        if let Some((key, value)) = lookup(&["DB_MAX_CONNECTIONS"]) {
            self.store.max_connections = parse_value(&key, &value)?;
        }

        let retry = &mut self.store.retry;
        if let Some((key, value)) = lookup(&["DB_INIT_RETRY_INITIAL_MS"]) {
            retry.initial_ms = parse_value(&key, &value)?;
        }
        if let Some((key, value)) = lookup(&["DB_INIT_RETRY_MAX_MS"]) {
            retry.max_ms = parse_value(&key, &value)?;
        }
        if let Some((key, value)) = lookup(&["DB_INIT_RETRY_MULTIPLIER"]) {
            retry.multiplier = parse_value(&key, &value)?;
        }
        if let Some((key, value)) = lookup(&["DB_INIT_RETRY_MAX_ATTEMPTS"]) {
            retry.max_attempts = parse_value(&key, &value)?;
        }

        if let Some((_, value)) = lookup(&["TASKS_API_URL", "REACT_APP_API_URL"]) {
            self.client.api_url = Some(value);
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.environment.eq_ignore_ascii_case("production")
    }

    /// API base URL for the web client: the explicit override, else `/api`
    /// in production, else the loopback address of this service.
    pub fn api_base_url(&self) -> String {
        if let Some(url) = &self.client.api_url {
            return url.trim_end_matches('/').to_string();
        }
        if self.is_production() {
            "/api".to_string()
        } else {
            format!("http://localhost:{}/api", self.server.port)
        }
    }

    /// Like [`Config::api_base_url`] but always absolute, for clients that are
    /// not served from the same origin (the CLI).
    pub fn absolute_api_base_url(&self) -> String {
        let url = self.api_base_url();
        if url.starts_with('/') {
            format!("http://localhost:{}{}", self.server.port, url)
        } else {
            url
        }
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{}': {}", value, e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.server.port, 5002);
        assert_eq!(config.server.environment, "development");
        assert_eq!(config.store.backend, StoreBackend::Postgres);
        assert_eq!(config.store.host, "localhost");
        assert_eq!(config.store.port, 5432);
        assert_eq!(config.store.name, "TaskDb");
        assert_eq!(config.store.user, "postgres");
        assert_eq!(config.store.password, "password");
        assert!(config.client.api_url.is_none());
    }

    #[test]
    fn env_overrides_defaults() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("PORT", "8080"),
                ("NODE_ENV", "production"),
                ("DB_BACKEND", "sqlite"),
                ("DB_PATH", "/tmp/t.db"),
                ("DB_HOST", "db"),
                ("DB_INIT_RETRY_MAX_ATTEMPTS", "3"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 8080);
        assert!(config.is_production());
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.path, PathBuf::from("/tmp/t.db"));
        assert_eq!(config.store.host, "db");
        assert_eq!(config.store.retry.max_attempts, 3);
    }

    #[test]
    fn postgres_names_are_fallbacks() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("POSTGRES_DB", "fallback"),
                ("POSTGRES_PORT", "6543"),
                ("DB_PORT", "7654"),
            ]))
            .unwrap();

        assert_eq!(config.store.name, "fallback");
        // DB_PORT wins over POSTGRES_PORT
        assert_eq!(config.store.port, 7654);
    }

    #[test]
    fn invalid_number_is_reported_with_key() {
        let mut config = Config::default();
        let err = config.apply_env(env(&[("PORT", "not-a-port")])).unwrap_err();
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "PORT"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn api_base_url_depends_on_environment() {
        let mut config = Config::default();
        assert_eq!(config.api_base_url(), "http://localhost:5002/api");

        config.server.environment = "production".to_string();
        assert_eq!(config.api_base_url(), "/api");
        assert_eq!(config.absolute_api_base_url(), "http://localhost:5002/api");

        config.client.api_url = Some("https://tasks.example.com/api/".to_string());
        assert_eq!(config.api_base_url(), "https://tasks.example.com/api");
    }

    #[test]
    fn yaml_sections_are_optional() {
        let config: Config = serde_yaml::from_str(
            "server:\n  port: 9000\nstore:\n  backend: sqlite\n  retry:\n    max_attempts: 2\n",
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.retry.max_attempts, 2);
        assert_eq!(config.store.retry.initial_ms, 2000);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "server:\n  environment: staging\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.environment, "staging");

        assert!(matches!(
            Config::load(dir.path().join("missing.yaml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
