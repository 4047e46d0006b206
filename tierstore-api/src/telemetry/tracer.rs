//! Tracing Subscriber Initialization
//!
//! Filter precedence: `RUST_LOG`, then `logs.filter` from the config file,
//! then [`DEFAULT_FILTER`]. Output is JSON lines unless `logs.json = false`.

use tierstore_core::LogConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

/// Filter used when neither `RUST_LOG` nor the config names one.
pub const DEFAULT_FILTER: &str = "tierstore_api=debug,tower_http=info,info";

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Directive string used when `RUST_LOG` is unset
    pub filter: Option<String>,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    /// Service name for log records
    pub service_name: String,
    /// Service version
    pub service_version: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: None,
            json: true,
            service_name: "tierstore".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl TelemetryConfig {
    pub fn from_log_config(logs: &LogConfig) -> Self {
        Self {
            filter: logs.filter.clone(),
            json: logs.json,
            ..Default::default()
        }
    }

    fn env_filter(&self) -> ApiResult<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        let directives = self.filter.as_deref().unwrap_or(DEFAULT_FILTER);
        EnvFilter::try_new(directives).map_err(|e| {
            ApiError::internal_error(format!("Invalid log filter '{}': {}", directives, e))
        })
    }
}

/// Initialize the global tracing subscriber.
///
/// Call once at startup before any tracing occurs. A second call fails.
pub fn init_tracer(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter = config.env_filter()?;

    let result = if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = config.service_name,
        service_version = config.service_version,
        json = config.json,
        "Telemetry initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EnvVarGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let original = std::env::var(key).ok();
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
            Self { key, original }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.original.as_deref() {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "tierstore");
        assert!(config.json);
        assert!(config.filter.is_none());
    }

    #[test]
    fn test_telemetry_config_from_log_config() {
        let logs = LogConfig {
            filter: Some("warn".to_string()),
            json: false,
        };
        let config = TelemetryConfig::from_log_config(&logs);
        assert_eq!(config.filter.as_deref(), Some("warn"));
        assert!(!config.json);
    }

    #[test]
    fn test_env_filter_precedence() {
        let _guard = EnvVarGuard::set("RUST_LOG", None);

        let config = TelemetryConfig::default();
        assert!(config.env_filter().is_ok());

        let config = TelemetryConfig {
            filter: Some("tierstore_api=loud".to_string()),
            ..Default::default()
        };
        assert!(config.env_filter().is_err());

        let _guard = EnvVarGuard::set("RUST_LOG", Some("debug"));
        assert!(config.env_filter().is_ok());
    }
}
