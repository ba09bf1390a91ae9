//! One watcher per pool target.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use poolsync_types::{DesiredPoolState, Origin, TerminalState};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::guard::ReconcileGuard;
use super::manager::WatcherStatus;
use super::TickOutcome;
use crate::sync::engine::{PoolSyncEngine, SyncRequest};
use crate::sync::registry::RegistryClient;

#[derive(Debug, Default)]
struct WatcherCounters {
    polls: AtomicU64,
    failed_polls: AtomicU64,
    triggers: AtomicU64,
}

pub struct RegistryWatcher {
    key: String,
    registry: Arc<dyn RegistryClient>,
    engine: Arc<PoolSyncEngine>,
    template: RwLock<DesiredPoolState>,
    /// Held for a whole tick, which makes ticks non-reentrant
    snapshot: tokio::sync::Mutex<BTreeSet<String>>,
    in_flight: Arc<AtomicBool>,
    resolve_members: bool,
    poll_interval: Duration,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    counters: WatcherCounters,
    last_poll_at: RwLock<Option<DateTime<Utc>>>,
    last_trigger: Mutex<Option<JoinHandle<()>>>,
}

impl RegistryWatcher {
    pub fn new(
        registry: Arc<dyn RegistryClient>,
        engine: Arc<PoolSyncEngine>,
        template: DesiredPoolState,
        poll_interval: Duration,
        resolve_members: bool,
    ) -> Arc<Self> {
        let (shutdown_tx, _) = tokio::sync::watch::channel(false);

        Arc::new(Self {
            key: engine.target_key(&template),
            registry,
            engine,
            template: RwLock::new(template),
            snapshot: tokio::sync::Mutex::new(BTreeSet::new()),
            in_flight: Arc::new(AtomicBool::new(false)),
            resolve_members,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
            shutdown_tx,
            counters: WatcherCounters::default(),
            last_poll_at: RwLock::new(None),
            last_trigger: Mutex::new(None),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn template(&self) -> DesiredPoolState {
        self.template.read().clone()
    }

    /// Used by triggers started after this call.
    pub fn set_template(&self, template: DesiredPoolState) {
        *self.template.write() = template;
    }

    pub async fn snapshot(&self) -> BTreeSet<String> {
        self.snapshot.lock().await.clone()
    }

    pub fn is_reconciling(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Takes effect at the next tick boundary; a running tick completes.
    pub fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Spawn the polling loop. The first poll happens immediately.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let watcher = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(watcher.poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(
                watcher = %watcher.key,
                interval_secs = watcher.poll_interval.as_secs_f64(),
                "Registry watcher started"
            );

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                        let outcome = watcher.tick().await;
                        tracing::trace!(watcher = %watcher.key, ?outcome, "Poll cycle done");
                    }
                    _ = shutdown_rx.changed() => {
                        break;
                    }
                }
            }

            tracing::info!(watcher = %watcher.key, "Registry watcher stopped");
        })
    }

    /// Run one poll cycle.
    pub async fn tick(self: &Arc<Self>) -> TickOutcome {
        let mut snapshot = self.snapshot.lock().await;
        self.counters.polls.fetch_add(1, Ordering::Relaxed);
        *self.last_poll_at.write() = Some(Utc::now());

        let names = match self.registry.list_service_names().await {
            Ok(names) => names,
            Err(e) => {
                self.counters.failed_polls.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(watcher = %self.key, "Registry poll failed, skipping cycle: {}", e);
                return TickOutcome::RegistryUnavailable;
            },
        };

        if names.is_empty() {
            tracing::debug!(watcher = %self.key, "Registry listed no services, skipping cycle");
            return TickOutcome::EmptyRegistry;
        }

        let current: BTreeSet<String> = names.into_iter().collect();
        let added: Vec<String> = current.difference(&snapshot).cloned().collect();

        if added.is_empty() {
            *snapshot = current;
            return TickOutcome::Unchanged;
        }

        let Some(guard) = ReconcileGuard::try_acquire(&self.in_flight) else {
            tracing::info!(
                watcher = %self.key,
                added = ?added,
                "Reconciliation still running, deferring new services"
            );
            return TickOutcome::Deferred { added };
        };

        snapshot.clone_from(&current);
        drop(snapshot);

        self.spawn_trigger(guard, current, added.clone());
        TickOutcome::Triggered { added }
    }

    /// Wait for the most recently started reconciliation, if any.
    pub async fn join_pending(&self) {
        let pending = self.last_trigger.lock().take();
        if let Some(handle) = pending {
            if let Err(e) = handle.await {
                tracing::warn!(watcher = %self.key, "Reconciliation task failed: {}", e);
            }
        }
    }

    pub async fn status(&self) -> WatcherStatus {
        let known_services = self.snapshot.lock().await.len();
        let template = self.template();
        WatcherStatus {
            key: self.key.clone(),
            pool_name: template.pool_name,
            remote_host: template.remote_target.map(|r| r.hostname),
            poll_interval_secs: self.poll_interval.as_secs(),
            known_services,
            reconciling: self.is_reconciling(),
            polls: self.counters.polls.load(Ordering::Relaxed),
            failed_polls: self.counters.failed_polls.load(Ordering::Relaxed),
            triggers: self.counters.triggers.load(Ordering::Relaxed),
            last_poll_at: *self.last_poll_at.read(),
        }
    }

    fn spawn_trigger(
        self: &Arc<Self>,
        guard: ReconcileGuard,
        names: BTreeSet<String>,
        added: Vec<String>,
    ) {
        self.counters.triggers.fetch_add(1, Ordering::Relaxed);
        let watcher = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let _guard = guard;
            let desired = watcher.desired_state(&names).await;
            let request =
                SyncRequest::generated(Origin::new(format!("watcher://{}", watcher.key)), desired);

            tracing::info!(
                watcher = %watcher.key,
                attempt_id = %request.id(),
                added = ?added,
                "🔄 New services detected, reconciling pool"
            );

            let state = watcher.engine.synchronize(request).await;
            if state != TerminalState::Bound {
                tracing::warn!(watcher = %watcher.key, "Reconciliation ended in {}", state);
            }
        });

        *self.last_trigger.lock() = Some(handle);
    }

    /// The template, with members rebuilt from the registry when enabled.
    async fn desired_state(&self, names: &BTreeSet<String>) -> DesiredPoolState {
        let template = self.template();
        if !self.resolve_members {
            return template;
        }

        let mut members = BTreeSet::new();
        for name in names {
            match self.registry.list_service_instances(name).await {
                Ok(instances) => members.extend(instances),
                Err(e) => tracing::warn!(
                    watcher = %self.key,
                    service = %name,
                    "Instance lookup failed, service contributes no members: {}",
                    e
                ),
            }
        }

        if members.is_empty() {
            tracing::debug!(watcher = %self.key, "No instances resolved, using template members");
            return template;
        }

        DesiredPoolState { members: members.into_iter().collect(), ..template }
    }
}
