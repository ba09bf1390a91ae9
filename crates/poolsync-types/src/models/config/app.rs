//! Top-level application configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::endpoints::{GatewayConfig, RegistryConfig};
use super::watcher::{ReportConfig, WatcherConfig};

/// Full service configuration, as stored in `poolsync.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct AppConfig {
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,
    #[serde(default)]
    #[validate(nested)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    #[validate(nested)]
    pub registry: RegistryConfig,
    #[serde(default)]
    #[validate(nested)]
    pub watcher: WatcherConfig,
    #[serde(default)]
    #[validate(nested)]
    pub report: ReportConfig,
}

/// HTTP listener of the host daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    #[validate(length(min = 1_u64))]
    pub host: String,
    #[serde(default = "default_port")]
    #[validate(range(min = 1_u16))]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

pub const fn default_port() -> u16 {
    8105
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.socket_addr(), "127.0.0.1:8105");
        assert_eq!(config.watcher.poll_interval_secs, 5);
        assert_eq!(config.gateway.request_timeout_ms, 1000);
        assert_eq!(config.registry.page_size, 10);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{"registry": {"base_url": "http://nacos:8848"}, "watcher": {"poll_interval_secs": 30}}"#,
        )
        .unwrap();

        assert_eq!(config.registry.base_url, "http://nacos:8848");
        assert_eq!(config.registry.namespace, "public");
        assert_eq!(config.watcher.poll_interval_secs, 30);
        assert!(!config.watcher.resolve_members);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.registry.page_size = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.gateway.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }
}
