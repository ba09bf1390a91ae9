//! Application State
//!
//! Holds the sync engine and the watcher registry shared by all handlers.

use std::sync::Arc;
use std::time::Duration;

use poolsync_core::sync::report::sink_from_config;
use poolsync_core::{
    AppResult, IcrGatewayFactory, NacosRegistryClient, PoolSyncEngine, WatcherManager,
};
use poolsync_types::AppConfig;

use crate::api::PROCESSOR_PATH;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub engine: Arc<PoolSyncEngine>,
    pub watchers: Arc<WatcherManager>,
    /// Origin URI stamped on reports of direct requests
    pub processor_uri: String,
}

impl AppState {
    pub fn new_with_components(
        engine: Arc<PoolSyncEngine>,
        watchers: Arc<WatcherManager>,
        processor_uri: String,
    ) -> Self {
        Self { inner: Arc::new(AppStateInner { engine, watchers, processor_uri }) }
    }

    /// Wire the gateway, registry and report sink described by `config`.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let gateways = IcrGatewayFactory::new(config.gateway.clone())?;
        let sink = sink_from_config(
            &config.report,
            Duration::from_millis(config.gateway.request_timeout_ms),
        )?;
        let engine = Arc::new(PoolSyncEngine::new(Arc::new(gateways), sink));

        let registry = Arc::new(NacosRegistryClient::new(&config.registry)?);
        let watchers =
            Arc::new(WatcherManager::new(registry, Arc::clone(&engine), config.watcher.clone()));

        let processor_uri = format!("http://{}{}", config.server.socket_addr(), PROCESSOR_PATH);
        Ok(Self::new_with_components(engine, watchers, processor_uri))
    }

    pub fn engine(&self) -> Arc<PoolSyncEngine> {
        Arc::clone(&self.inner.engine)
    }

    pub fn watchers(&self) -> &WatcherManager {
        &self.inner.watchers
    }

    pub fn processor_uri(&self) -> &str {
        &self.inner.processor_uri
    }
}
