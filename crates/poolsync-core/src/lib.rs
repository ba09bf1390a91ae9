//! # Poolsync Core
//!
//! Keeps a load-balancer pool's member set in step with a service registry.
//!
//! ## Architecture
//!
//! ```text
//! poolsync-core/src/
//! ├── sync/
//! │   ├── gateway/    # PoolGateway trait + iControl REST implementation
//! │   ├── registry/   # RegistryClient trait + Nacos naming API implementation
//! │   ├── report.rs   # ReportSink trait + tracing / block-PATCH sinks
//! │   ├── engine/     # PoolSyncEngine: create-or-replace and teardown pipelines
//! │   └── watcher/    # RegistryWatcher polling diff loop + WatcherManager
//! ├── modules/        # Config loading, logging setup
//! └── error.rs        # AppError
//! ```
//!
//! Control flow: the watcher polls the registry, diffs service names against
//! its last snapshot and, on growth, asks the engine to synchronize. The engine
//! drives the gateway through a strictly sequential pipeline and reports the
//! terminal state to a sink.

#![allow(
    clippy::significant_drop_tightening,
    reason = "Mutex guards in async code require careful lifetime management"
)]
#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

pub mod error;
pub mod modules;
pub mod sync;

pub use error::{AppError, AppResult};
pub use sync::engine::{PoolSyncEngine, SyncRequest};
pub use sync::gateway::{GatewayFactory, IcrGateway, IcrGatewayFactory, PoolGateway};
pub use sync::registry::{NacosRegistryClient, RegistryClient};
pub use sync::report::{BlockReportSink, ReportSink, TracingReportSink};
pub use sync::watcher::{RegistryWatcher, TickOutcome, WatcherHandle, WatcherManager};
