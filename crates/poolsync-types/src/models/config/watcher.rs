//! Registry watcher and report delivery configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct WatcherConfig {
    /// Seconds between registry polls
    #[serde(default = "default_poll_interval_secs")]
    #[validate(range(min = 1_u64, max = 86_400_u64))]
    pub poll_interval_secs: u64,
    /// Rebuild members from registry instances instead of the template's list
    #[serde(default)]
    pub resolve_members: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self { poll_interval_secs: default_poll_interval_secs(), resolve_members: false }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct ReportConfig {
    /// Orchestrator endpoint that block state is PATCHed to; log-only when absent
    #[serde(default)]
    #[validate(url)]
    pub block_base_url: Option<String>,
}

pub const fn default_poll_interval_secs() -> u64 {
    5
}
