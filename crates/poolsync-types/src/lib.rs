//! # Poolsync Types
//!
//! Core types, models, and error definitions for the pool reconciliation service.
//!
//! - **`error`** - Typed error hierarchy for validation, gateway, registry and sync failures
//! - **`models`** - Desired pool state, sync attempts, orchestrator requests and configuration
//!
//! ## Architecture Role
//!
//! `poolsync-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!          poolsync-types (this crate)
//!                  │
//!                  ▼
//!            poolsync-core
//!                  │
//!                  ▼
//!           poolsync-server
//! ```
//!
//! Nothing here performs I/O. Everything is serializable so it can travel in
//! reports and API responses unchanged.

pub mod error;
pub mod models;

pub use error::{
    AttemptError, ErrorKind, GatewayError, GatewayOperation, RegistryError, SyncError, SyncStage,
    ValidationError,
};

pub use models::{
    AppConfig, BlockState, ConfigTaskState, Credentials, DesiredPoolState, InputProperty,
    MemberSpec, Origin, PoolType, RemoteTarget, SyncAttempt, SyncReport, SyncState,
    TerminalState, SYNC_PROPERTIES, TEARDOWN_PROPERTIES,
};
