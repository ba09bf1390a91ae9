//! At most one running watcher per pool target.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use poolsync_types::models::WatcherConfig;
use poolsync_types::DesiredPoolState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::registry_watcher::RegistryWatcher;
use crate::sync::engine::PoolSyncEngine;
use crate::sync::registry::RegistryClient;

/// Names a running watcher; equal to the target key of its template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatcherHandle {
    key: String,
}

impl WatcherHandle {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatcherStatus {
    pub key: String,
    pub pool_name: String,
    pub remote_host: Option<String>,
    pub poll_interval_secs: u64,
    /// Size of the current snapshot
    pub known_services: usize,
    pub reconciling: bool,
    pub polls: u64,
    pub failed_polls: u64,
    pub triggers: u64,
    pub last_poll_at: Option<DateTime<Utc>>,
}

struct WatcherEntry {
    watcher: Arc<RegistryWatcher>,
    task: JoinHandle<()>,
}

pub struct WatcherManager {
    registry: Arc<dyn RegistryClient>,
    engine: Arc<PoolSyncEngine>,
    config: WatcherConfig,
    watchers: DashMap<String, WatcherEntry>,
}

impl WatcherManager {
    pub fn new(
        registry: Arc<dyn RegistryClient>,
        engine: Arc<PoolSyncEngine>,
        config: WatcherConfig,
    ) -> Self {
        Self { registry, engine, config, watchers: DashMap::new() }
    }

    /// Start watching for `template`'s target, or refresh the template of
    /// the watcher already running for it.
    ///
    /// `poll_interval` falls back to the configured period.
    pub fn start(
        &self,
        template: DesiredPoolState,
        poll_interval: Option<Duration>,
    ) -> WatcherHandle {
        let key = self.engine.target_key(&template);

        match self.watchers.entry(key.clone()) {
            Entry::Occupied(entry) => {
                entry.get().watcher.set_template(template);
                tracing::info!(watcher = %key, "Watcher already running, template refreshed");
            },
            Entry::Vacant(entry) => {
                let interval = poll_interval
                    .unwrap_or_else(|| Duration::from_secs(self.config.poll_interval_secs));
                let watcher = RegistryWatcher::new(
                    Arc::clone(&self.registry),
                    Arc::clone(&self.engine),
                    template,
                    interval,
                    self.config.resolve_members,
                );
                let task = watcher.start();
                entry.insert(WatcherEntry { watcher, task });
            },
        }

        WatcherHandle { key }
    }

    pub async fn stop(&self, handle: &WatcherHandle) -> bool {
        self.stop_key(&handle.key).await
    }

    /// `false` if nothing was running under `key`.
    pub async fn stop_key(&self, key: &str) -> bool {
        let Some((_, entry)) = self.watchers.remove(key) else {
            return false;
        };

        entry.watcher.stop();
        if let Err(e) = entry.task.await {
            tracing::warn!(watcher = %key, "Watcher task ended abnormally: {}", e);
        }
        true
    }

    pub fn get(&self, key: &str) -> Option<Arc<RegistryWatcher>> {
        self.watchers.get(key).map(|entry| Arc::clone(&entry.watcher))
    }

    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }

    pub async fn list(&self) -> Vec<WatcherStatus> {
        let watchers: Vec<Arc<RegistryWatcher>> =
            self.watchers.iter().map(|entry| Arc::clone(&entry.watcher)).collect();

        let mut statuses = Vec::with_capacity(watchers.len());
        for watcher in watchers {
            statuses.push(watcher.status().await);
        }
        statuses.sort_by(|a, b| a.key.cmp(&b.key));
        statuses
    }

    pub async fn shutdown_all(&self) {
        let keys: Vec<String> = self.watchers.iter().map(|entry| entry.key().clone()).collect();
        for key in &keys {
            self.stop_key(key).await;
        }
        if !keys.is_empty() {
            tracing::info!(count = keys.len(), "All registry watchers stopped");
        }
    }
}
