//! Registry watching.
//!
//! A [`RegistryWatcher`] polls the registry on a fixed period, diffs the
//! service names against its last snapshot and triggers one reconciliation
//! per growth cycle. [`WatcherManager`] keeps at most one watcher per pool
//! target.

mod guard;
mod manager;
mod registry_watcher;

#[cfg(test)]
mod tests;

use serde::Serialize;

pub use manager::{WatcherHandle, WatcherManager, WatcherStatus};
pub use registry_watcher::RegistryWatcher;

/// What one poll cycle did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    /// Listing failed; snapshot untouched
    RegistryUnavailable,
    /// Listing came back empty; snapshot untouched
    EmptyRegistry,
    /// No new names; snapshot replaced
    Unchanged,
    /// New names; one reconciliation started, snapshot replaced
    Triggered { added: Vec<String> },
    /// New names while a reconciliation is running; snapshot untouched so
    /// a later cycle sees them again
    Deferred { added: Vec<String> },
}

impl TickOutcome {
    pub fn triggered(&self) -> bool {
        matches!(self, Self::Triggered { .. })
    }
}
