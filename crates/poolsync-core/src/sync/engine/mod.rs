//! Pool synchronization engine.
//!
//! Runs one attempt at a time per pool: requests for the same target key
//! queue on a per-pool lock, different pools proceed independently. Every
//! attempt ends in exactly one report, panics included.

mod pipeline;


use dashmap::DashMap;
use futures::FutureExt;
use poolsync_types::{
    DesiredPoolState, Origin, SyncAttempt, SyncError, SyncReport, SyncStage, TerminalState,
};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::Instrument;

use crate::sync::gateway::GatewayFactory;
use crate::sync::report::ReportSink;

/// One requested attempt, with the desired state it was created for.
///
/// The desired state is owned by the request, so the caller cannot change
/// it while the attempt runs.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    attempt: SyncAttempt,
    origin: Origin,
    desired: DesiredPoolState,
}

impl SyncRequest {
    /// `id` is the correlation handle of the originating request.
    pub fn new(id: impl Into<String>, origin: Origin, desired: DesiredPoolState) -> Self {
        Self { attempt: SyncAttempt::new(id), origin, desired }
    }

    pub fn generated(origin: Origin, desired: DesiredPoolState) -> Self {
        Self { attempt: SyncAttempt::generated(), origin, desired }
    }

    pub fn id(&self) -> &str {
        self.attempt.id()
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn desired(&self) -> &DesiredPoolState {
        &self.desired
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pipeline {
    Synchronize,
    Desynchronize,
}

pub struct PoolSyncEngine {
    gateways: Arc<dyn GatewayFactory>,
    sink: Arc<dyn ReportSink>,
    pool_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PoolSyncEngine {
    pub fn new(gateways: Arc<dyn GatewayFactory>, sink: Arc<dyn ReportSink>) -> Self {
        Self { gateways, sink, pool_locks: DashMap::new() }
    }

    /// Drive the pool to the desired state; reports `Bound` or `Error`.
    pub async fn synchronize(&self, request: SyncRequest) -> TerminalState {
        self.run(request, Pipeline::Synchronize).await
    }

    /// Remove the pool; reports `Unbound`, or `Error` if deletion fails.
    pub async fn desynchronize(&self, request: SyncRequest) -> TerminalState {
        self.run(request, Pipeline::Desynchronize).await
    }

    /// Key that attempts on the same remote pool share, with the remote
    /// port resolved the way the gateway factory resolves it.
    pub fn target_key(&self, desired: &DesiredPoolState) -> String {
        desired.resolved_target_key(self.gateways.default_remote_port())
    }

    /// Pools with an attempt running or queued.
    pub fn busy_pools(&self) -> Vec<String> {
        self.pool_locks.iter().map(|entry| entry.key().clone()).collect()
    }

    async fn run(&self, request: SyncRequest, pipeline: Pipeline) -> TerminalState {
        let SyncRequest { mut attempt, origin, desired } = request;
        let key = self.target_key(&desired);
        let span = match pipeline {
            Pipeline::Synchronize => {
                tracing::info_span!("synchronize", attempt_id = %attempt.id(), pool = %key)
            },
            Pipeline::Desynchronize => {
                tracing::info_span!("desynchronize", attempt_id = %attempt.id(), pool = %key)
            },
        };

        async move {
            if let Err(e) = attempt.accept() {
                tracing::error!("Refusing attempt: {}", e);
                return TerminalState::Error;
            }

            let outcome = self.execute_serialized(&key, pipeline, &desired).await;
            let (terminal, cause) = match outcome {
                Ok(terminal) => (terminal, None),
                Err(cause) => (TerminalState::Error, Some(cause)),
            };

            if let Err(e) = attempt.finish(terminal, cause) {
                tracing::error!("Attempt finished twice: {}", e);
            }
            if let Some(report) = SyncReport::from_attempt(&attempt, origin) {
                self.sink.report(report).await;
            }
            terminal
        }
        .instrument(span)
        .await
    }

    /// Holds the pool lock for the pipeline only; reporting happens after release.
    async fn execute_serialized(
        &self,
        key: &str,
        pipeline: Pipeline,
        desired: &DesiredPoolState,
    ) -> Result<TerminalState, SyncError> {
        let lock = self.pool_lock(key);
        let outcome = {
            let _guard = lock.lock().await;
            AssertUnwindSafe(self.execute(pipeline, desired)).catch_unwind().await
        };
        drop(lock);
        self.release_pool_lock(key);

        outcome.unwrap_or_else(|panic| {
            let message = panic_message(panic.as_ref());
            tracing::error!("Pipeline panicked: {}", message);
            Err(SyncError::Internal { message })
        })
    }

    async fn execute(
        &self,
        pipeline: Pipeline,
        desired: &DesiredPoolState,
    ) -> Result<TerminalState, SyncError> {
        let gateway = self
            .gateways
            .gateway_for(desired.remote_target.as_ref())
            .map_err(SyncError::at(SyncStage::Connect))?;

        match pipeline {
            Pipeline::Synchronize => pipeline::synchronize_pool(gateway.as_ref(), desired).await,
            Pipeline::Desynchronize => pipeline::teardown_pool(gateway.as_ref(), desired).await,
        }
    }

    fn pool_lock(&self, key: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            self.pool_locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Drops the map entry once nobody else holds or waits on it.
    fn release_pool_lock(&self, key: &str) {
        self.pool_locks.remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "pipeline panicked".to_string()
    }
}
