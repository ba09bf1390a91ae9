//! Service configuration models.

mod app;
mod endpoints;
mod watcher;

pub use app::{AppConfig, ServerConfig};
pub use endpoints::{GatewayConfig, RegistryConfig};
pub use watcher::{ReportConfig, WatcherConfig};
