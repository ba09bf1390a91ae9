//! Reconciliation: gateway, registry, reporting, engine and watcher.

pub mod engine;
pub mod gateway;
pub mod registry;
pub mod report;
pub mod watcher;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;
