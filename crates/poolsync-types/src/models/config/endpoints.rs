//! Pool-management and registry endpoint configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Pool-management API (local endpoint plus defaults for remote targets).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct GatewayConfig {
    /// Local management endpoint
    #[serde(default = "default_gateway_url")]
    #[validate(url)]
    pub base_url: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Administrative partition pools live in
    #[serde(default = "default_partition")]
    #[validate(length(min = 1_u64))]
    pub partition: String,
    /// Per round trip
    #[serde(default = "default_request_timeout_ms")]
    #[validate(range(min = 50_u64, max = 60_000_u64))]
    pub request_timeout_ms: u64,
    /// Used for remote targets that do not name a port
    #[serde(default = "default_remote_port")]
    #[validate(range(min = 1_u16))]
    pub remote_port: u16,
    /// Management endpoints usually present self-signed certificates
    #[serde(default = "default_true")]
    pub accept_invalid_certs: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            username: default_username(),
            password: String::new(),
            partition: default_partition(),
            request_timeout_ms: default_request_timeout_ms(),
            remote_port: default_remote_port(),
            accept_invalid_certs: true,
        }
    }
}

/// Service registry (Nacos naming API).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_url")]
    #[validate(url)]
    pub base_url: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1_u32, max = 1000_u32))]
    pub page_size: u32,
    /// Upper bound on pages fetched per listing
    #[serde(default = "default_max_pages")]
    #[validate(range(min = 1_u32))]
    pub max_pages: u32,
    #[serde(default = "default_request_timeout_ms")]
    #[validate(range(min = 50_u64, max = 60_000_u64))]
    pub request_timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_registry_url(),
            namespace: default_namespace(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_gateway_url() -> String {
    "https://localhost:443".to_string()
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_partition() -> String {
    "Common".to_string()
}

fn default_registry_url() -> String {
    "http://127.0.0.1:8848".to_string()
}

fn default_namespace() -> String {
    "public".to_string()
}

pub const fn default_request_timeout_ms() -> u64 {
    1000
}

pub const fn default_remote_port() -> u16 {
    443
}

pub const fn default_page_size() -> u32 {
    10
}

pub const fn default_max_pages() -> u32 {
    1000
}

const fn default_true() -> bool {
    true
}
