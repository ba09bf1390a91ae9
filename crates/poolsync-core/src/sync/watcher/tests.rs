use super::*;
use crate::sync::engine::PoolSyncEngine;
use crate::sync::testing::{InMemoryGateway, RecordingSink, ScriptedRegistry, StaticGatewayFactory};
use poolsync_types::models::WatcherConfig;
use poolsync_types::{DesiredPoolState, GatewayOperation, MemberSpec, PoolType, RemoteTarget};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    registry: Arc<ScriptedRegistry>,
    gateway: Arc<InMemoryGateway>,
    sink: Arc<RecordingSink>,
    engine: Arc<PoolSyncEngine>,
}

fn harness() -> Harness {
    let registry = ScriptedRegistry::new();
    let gateway = InMemoryGateway::new();
    let sink = RecordingSink::new();
    let factory = StaticGatewayFactory::new(Arc::clone(&gateway));
    let engine = Arc::new(PoolSyncEngine::new(factory, sink.clone()));
    Harness { registry, gateway, sink, engine }
}

fn template(pool: &str, members: &[&str]) -> DesiredPoolState {
    let members = members.iter().map(|m| m.parse::<MemberSpec>().unwrap()).collect();
    DesiredPoolState::new(pool, PoolType::new("round-robin").unwrap(), members).unwrap()
}

impl Harness {
    fn watcher(&self, resolve_members: bool) -> Arc<RegistryWatcher> {
        RegistryWatcher::new(
            self.registry.clone(),
            Arc::clone(&self.engine),
            template("web", &["10.0.0.1:80"]),
            Duration::from_secs(5),
            resolve_members,
        )
    }

    fn manager(&self) -> WatcherManager {
        WatcherManager::new(self.registry.clone(), Arc::clone(&self.engine), WatcherConfig::default())
    }
}

fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|n| (*n).to_string()).collect()
}

#[tokio::test]
async fn test_first_poll_triggers_reconciliation() {
    let h = harness();
    let watcher = h.watcher(false);
    h.registry.push_names(&["orders", "billing"]);

    let outcome = watcher.tick().await;
    watcher.join_pending().await;

    assert_eq!(
        outcome,
        TickOutcome::Triggered { added: vec!["billing".to_string(), "orders".to_string()] }
    );
    assert_eq!(watcher.snapshot().await, names(&["billing", "orders"]));
    assert_eq!(h.gateway.members("web"), vec!["10.0.0.1:80"]);
    assert!(!watcher.is_reconciling());
}

#[tokio::test]
async fn test_growth_cycle_triggers_exactly_once() {
    let h = harness();
    let watcher = h.watcher(false);
    h.registry.push_names(&["a"]);
    watcher.tick().await;
    watcher.join_pending().await;
    h.gateway.clear_calls();

    h.registry.push_names(&["a", "b", "c"]);
    let outcome = watcher.tick().await;
    watcher.join_pending().await;

    assert_eq!(outcome, TickOutcome::Triggered { added: vec!["b".to_string(), "c".to_string()] });
    let probes =
        h.gateway.operations().iter().filter(|op| **op == GatewayOperation::ProbePool).count();
    assert_eq!(probes, 1);
    assert_eq!(h.sink.reports().len(), 2);
}

#[tokio::test]
async fn test_failed_poll_keeps_snapshot() {
    let h = harness();
    let watcher = h.watcher(false);
    h.registry.push_names(&["a", "b"]);
    watcher.tick().await;
    watcher.join_pending().await;

    h.registry.push_failure();
    let before = watcher.snapshot().await;
    let outcome = watcher.tick().await;

    assert_eq!(outcome, TickOutcome::RegistryUnavailable);
    assert_eq!(watcher.snapshot().await, before);
    assert_eq!(h.sink.reports().len(), 1);
}

#[tokio::test]
async fn test_empty_listing_is_skipped() {
    let h = harness();
    let watcher = h.watcher(false);
    h.registry.push_names(&["a"]);
    watcher.tick().await;
    watcher.join_pending().await;

    h.registry.push_names(&[]);
    let outcome = watcher.tick().await;

    assert_eq!(outcome, TickOutcome::EmptyRegistry);
    assert_eq!(watcher.snapshot().await, names(&["a"]));
    assert_eq!(h.sink.reports().len(), 1);
}

#[tokio::test]
async fn test_unchanged_names_do_not_trigger() {
    let h = harness();
    let watcher = h.watcher(false);
    h.registry.push_names(&["a", "b"]);
    watcher.tick().await;
    watcher.join_pending().await;

    let outcome = watcher.tick().await;

    assert_eq!(outcome, TickOutcome::Unchanged);
    assert_eq!(h.sink.reports().len(), 1);
}

#[tokio::test]
async fn test_disappeared_service_triggers_again_on_return() {
    let h = harness();
    let watcher = h.watcher(false);
    h.registry.push_names(&["a", "b"]);
    watcher.tick().await;
    watcher.join_pending().await;

    h.registry.push_names(&["a"]);
    assert_eq!(watcher.tick().await, TickOutcome::Unchanged);
    assert_eq!(watcher.snapshot().await, names(&["a"]));

    h.registry.push_names(&["a", "b"]);
    assert_eq!(watcher.tick().await, TickOutcome::Triggered { added: vec!["b".to_string()] });
    watcher.join_pending().await;
}

#[tokio::test]
async fn test_growth_during_reconciliation_is_deferred() {
    let h = harness();
    let watcher = h.watcher(false);
    let gate = h.gateway.gate(GatewayOperation::AddMembers);

    h.registry.push_names(&["a"]);
    assert!(watcher.tick().await.triggered());
    h.gateway.wait_for_calls(5).await;
    assert!(watcher.is_reconciling());

    h.registry.push_names(&["a", "b"]);
    let outcome = watcher.tick().await;
    assert_eq!(outcome, TickOutcome::Deferred { added: vec!["b".to_string()] });
    assert_eq!(watcher.snapshot().await, names(&["a"]));
    assert_eq!(h.gateway.calls().len(), 5, "no second pipeline while the first runs");

    gate.add_permits(2);
    watcher.join_pending().await;
    assert!(!watcher.is_reconciling());

    let outcome = watcher.tick().await;
    assert_eq!(outcome, TickOutcome::Triggered { added: vec!["b".to_string()] });
    watcher.join_pending().await;

    assert_eq!(h.sink.wait_for(2).await.len(), 2);
    let ops = h.gateway.operations();
    assert_eq!(ops.len(), 10);
    assert_eq!(ops[5], GatewayOperation::ProbePool);
}

#[tokio::test]
async fn test_triggered_attempt_identifies_watcher() {
    let h = harness();
    let watcher = h.watcher(false);
    h.registry.push_names(&["a"]);

    watcher.tick().await;
    watcher.join_pending().await;

    let report = &h.sink.reports()[0];
    assert_eq!(report.origin.uri, "watcher://local/web");
    assert!(uuid::Uuid::parse_str(&report.attempt_id).is_ok());
}

#[tokio::test]
async fn test_template_change_applies_to_next_trigger() {
    let h = harness();
    let watcher = h.watcher(false);
    h.registry.push_names(&["a"]);
    watcher.tick().await;
    watcher.join_pending().await;

    watcher.set_template(template("web", &["10.0.0.7:8080"]));
    h.registry.push_names(&["a", "b"]);
    watcher.tick().await;
    watcher.join_pending().await;

    assert_eq!(h.gateway.members("web"), vec!["10.0.0.7:8080"]);
}

#[tokio::test]
async fn test_resolved_members_replace_template() {
    let h = harness();
    let watcher = h.watcher(true);
    h.registry.set_instances("orders", vec![MemberSpec::new("10.0.2.2", 80), MemberSpec::new("10.0.2.1", 80)]);
    h.registry.set_instances("billing", vec![MemberSpec::new("10.0.2.1", 80)]);
    h.registry.fail_instances("search");
    h.registry.push_names(&["orders", "billing", "search"]);

    watcher.tick().await;
    watcher.join_pending().await;

    assert_eq!(h.gateway.members("web"), vec!["10.0.2.1:80", "10.0.2.2:80"]);
}

#[tokio::test]
async fn test_unresolvable_members_fall_back_to_template() {
    let h = harness();
    let watcher = h.watcher(true);
    h.registry.push_names(&["orders"]);

    watcher.tick().await;
    watcher.join_pending().await;

    assert_eq!(h.gateway.members("web"), vec!["10.0.0.1:80"]);
}

#[tokio::test(start_paused = true)]
async fn test_loop_polls_until_stopped() {
    let h = harness();
    let manager = h.manager();
    h.registry.push_names(&["a"]);

    let handle = manager.start(template("web", &["10.0.0.1:80"]), Some(Duration::from_secs(5)));
    assert_eq!(h.sink.wait_for(1).await.len(), 1);

    tokio::time::sleep(Duration::from_secs(11)).await;
    let polls = h.registry.polls();
    assert!(polls >= 3, "expected at least 3 polls, got {}", polls);
    assert_eq!(h.sink.reports().len(), 1, "steady registry must not re-trigger");

    assert!(manager.stop(&handle).await);
    let stopped_at = h.registry.polls();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.registry.polls(), stopped_at);
    assert!(manager.is_empty());
    assert!(!manager.stop(&handle).await);
}

#[tokio::test(start_paused = true)]
async fn test_start_is_idempotent_per_target() {
    let h = harness();
    let manager = h.manager();
    h.registry.push_names(&["a"]);

    let first = manager.start(template("web", &["10.0.0.1:80"]), None);
    let second = manager.start(template("web", &["10.0.0.9:80"]), None);

    assert_eq!(first, second);
    assert_eq!(manager.len(), 1);
    let watcher = manager.get(first.key()).unwrap();
    assert_eq!(watcher.template().members, vec![MemberSpec::new("10.0.0.9", 80)]);
    assert_eq!(watcher.poll_interval(), Duration::from_secs(5));

    manager.shutdown_all().await;
}

#[tokio::test(start_paused = true)]
async fn test_targets_get_independent_watchers() {
    let h = harness();
    let manager = h.manager();
    h.registry.push_names(&["a"]);

    let local = manager.start(template("web", &[]), None);
    let remote = manager.start(
        template("web", &[]).with_remote_target(RemoteTarget::new("10.1.1.5", "dg")),
        None,
    );

    assert_ne!(local, remote);
    let statuses = manager.list().await;
    assert_eq!(statuses.len(), 2);
    assert_eq!(statuses[0].key, "10.1.1.5/web");
    assert_eq!(statuses[0].remote_host.as_deref(), Some("10.1.1.5"));
    assert_eq!(statuses[1].key, "local/web");

    manager.shutdown_all().await;
    assert!(manager.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_equivalent_remote_targets_share_watcher() {
    let registry = ScriptedRegistry::new();
    let gateway = InMemoryGateway::new();
    let factory = StaticGatewayFactory::with_remote_port(Arc::clone(&gateway), 443);
    let engine = Arc::new(PoolSyncEngine::new(factory, RecordingSink::new()));
    let manager = WatcherManager::new(registry, engine, WatcherConfig::default());

    let implicit = manager.start(
        template("web", &[]).with_remote_target(RemoteTarget::new("bigip-2", "dg")),
        None,
    );
    let explicit = manager.start(
        template("web", &[]).with_remote_target(RemoteTarget::new("BigIP-2", "dg").with_port(443)),
        None,
    );

    assert_eq!(implicit, explicit);
    assert_eq!(implicit.key(), "bigip-2:443/web");
    assert_eq!(manager.len(), 1);

    manager.shutdown_all().await;
}
