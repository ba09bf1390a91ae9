//! Core domain models for pool reconciliation.

mod attempt;
mod config;
mod pool;
mod task;

pub use attempt::{Credentials, Origin, SyncAttempt, SyncReport, SyncState, TerminalState};
pub use config::{
    AppConfig, GatewayConfig, RegistryConfig, ReportConfig, ServerConfig, WatcherConfig,
};
pub use pool::{DesiredPoolState, MemberSpec, PoolType, RemoteTarget};
pub use task::{
    BlockState, ConfigTaskState, InputProperty, SYNC_PROPERTIES, TEARDOWN_PROPERTIES,
};
