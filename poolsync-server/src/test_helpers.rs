//! Test helpers for poolsync-server unit tests.

use std::sync::Arc;

use poolsync_core::sync::testing::{
    InMemoryGateway, RecordingSink, ScriptedRegistry, StaticGatewayFactory,
};
use poolsync_core::{PoolSyncEngine, WatcherManager};
use poolsync_types::models::WatcherConfig;

use crate::api::PROCESSOR_PATH;
use crate::state::AppState;

/// `AppState` wired to in-memory fakes, plus handles on the fakes.
pub struct TestContext {
    pub state: AppState,
    pub gateway: Arc<InMemoryGateway>,
    pub sink: Arc<RecordingSink>,
    pub registry: Arc<ScriptedRegistry>,
}

pub fn test_app_state() -> TestContext {
    let gateway = InMemoryGateway::new();
    let sink = RecordingSink::new();
    let registry = ScriptedRegistry::new();

    let engine = Arc::new(PoolSyncEngine::new(
        StaticGatewayFactory::new(Arc::clone(&gateway)),
        sink.clone(),
    ));
    let watchers = Arc::new(WatcherManager::new(
        registry.clone(),
        Arc::clone(&engine),
        WatcherConfig::default(),
    ));
    let processor_uri = format!("http://127.0.0.1:8105{}", PROCESSOR_PATH);
    let state = AppState::new_with_components(engine, watchers, processor_uri);

    TestContext { state, gateway, sink, registry }
}

/// A block task body with the given `(id, value)` input properties.
pub fn task_body(id: &str, properties: &[(&str, serde_json::Value)]) -> serde_json::Value {
    let input_properties: Vec<serde_json::Value> = properties
        .iter()
        .map(|(name, value)| serde_json::json!({ "id": name, "value": value }))
        .collect();
    serde_json::json!({
        "id": id,
        "block": { "id": id, "state": "BINDING", "inputProperties": input_properties }
    })
}

/// Every property a sync request needs, targeting the local device.
pub fn local_sync_properties(pool: &str) -> Vec<(&'static str, serde_json::Value)> {
    vec![
        ("poolName", serde_json::json!(pool)),
        ("poolType", serde_json::json!("round-robin")),
        ("poolMembers", serde_json::json!(["10.0.0.1:80", "10.0.0.2:80"])),
        ("hostname", serde_json::json!("")),
        ("deviceGroupName", serde_json::json!("")),
    ]
}
