//! Service configuration.
//!
//! Loaded from an optional TOML file (`--config <path>` or `TIERSTORE_CONFIG`),
//! then overridden by `TIERSTORE_*` environment variables, then validated.
//! Every field has a default so an empty file (or no file) is a valid config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::Ttl;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "TIERSTORE_CONFIG";

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted request body, in bytes.
    pub max_request_body: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 2001,
            max_request_body: 1024,
        }
    }
}

/// Persistent record store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    pub path: PathBuf,
    /// Number of files read concurrently during startup reconciliation.
    pub scan_concurrency: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data"),
            scan_concurrency: 16,
        }
    }
}

/// In-memory cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Memory-tier expiry of writes without an explicit TTL. `0` keeps them
    /// in memory without expiry; such writes still never reach disk.
    pub data_ttl_secs: u64,
    /// Optional upper bound on the number of expiring cached records.
    /// Durable records are not counted and never evicted.
    pub max_capacity: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            data_ttl_secs: 86_400,
            max_capacity: None,
        }
    }
}

impl CacheConfig {
    /// The TTL applied to writes that do not specify one.
    pub fn default_ttl(&self) -> Ttl {
        Ttl::from_secs(self.data_ttl_secs)
    }
}

/// Identifier generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UidConfig {
    pub chars: String,
    pub format: String,
    pub validator_regexp: String,
}

impl Default for UidConfig {
    fn default() -> Self {
        Self {
            chars: "1234567890abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ".to_string(),
            format: "X".repeat(32),
            validator_regexp: "[0-9a-zA-Z]{32}".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `EnvFilter` directive. `RUST_LOG` wins when set.
    pub filter: Option<String>,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

/// Master service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub http: HttpConfig,
    pub data: DataConfig,
    pub cache: CacheConfig,
    pub uid: UidConfig,
    pub logs: LogConfig,
}

impl ServiceConfig {
    /// Load the process configuration: file (if any), then env, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let mut config = match path {
            Some(path) => Self::from_path(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    /// Apply `TIERSTORE_*` overrides.
    ///
    /// Environment variables:
    /// - `TIERSTORE_HTTP_HOST`: listener host
    /// - `TIERSTORE_HTTP_PORT`: listener port
    /// - `TIERSTORE_HTTP_MAX_REQUEST_BODY`: body limit in bytes
    /// - `TIERSTORE_DATA_PATH`: persistent store directory
    /// - `TIERSTORE_CACHE_DATA_TTL`: default TTL in seconds
    /// - `TIERSTORE_LOG_JSON`: "true" or "false"
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("TIERSTORE_HTTP_HOST") {
            self.http.host = host;
        }
        if let Some(port) = lookup("TIERSTORE_HTTP_PORT") {
            self.http.port = parse_env("TIERSTORE_HTTP_PORT", &port)?;
        }
        if let Some(limit) = lookup("TIERSTORE_HTTP_MAX_REQUEST_BODY") {
            self.http.max_request_body = parse_env("TIERSTORE_HTTP_MAX_REQUEST_BODY", &limit)?;
        }
        if let Some(path) = lookup("TIERSTORE_DATA_PATH") {
            self.data.path = PathBuf::from(path);
        }
        if let Some(ttl) = lookup("TIERSTORE_CACHE_DATA_TTL") {
            self.cache.data_ttl_secs = parse_env("TIERSTORE_CACHE_DATA_TTL", &ttl)?;
        }
        if let Some(json) = lookup("TIERSTORE_LOG_JSON") {
            self.logs.json = json.eq_ignore_ascii_case("true") || json == "1";
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.host.trim().is_empty() {
            return Err(invalid("http.host", "", "must not be empty"));
        }
        if self.http.max_request_body == 0 {
            return Err(invalid("http.max_request_body", "0", "must be greater than zero"));
        }
        if self.data.path.as_os_str().is_empty() {
            return Err(invalid("data.path", "", "must not be empty"));
        }
        if self.data.scan_concurrency == 0 {
            return Err(invalid("data.scan_concurrency", "0", "must be greater than zero"));
        }
        if self.cache.max_capacity == Some(0) {
            return Err(invalid("cache.max_capacity", "0", "must be greater than zero"));
        }
        crate::identity::PatternUidGenerator::from_config(&self.uid)?;
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, value, &e.to_string()))
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from)
}
