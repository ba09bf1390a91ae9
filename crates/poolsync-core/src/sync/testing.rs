//! In-memory gateway, registry and sink for tests.
//!
//! Enabled for this crate's unit tests and, through the `test-util`
//! feature, for downstream crates.
#![allow(clippy::panic, reason = "fakes inject panics on request")]

use async_trait::async_trait;
use parking_lot::Mutex;
use poolsync_types::{
    GatewayError, GatewayOperation, MemberSpec, PoolType, RegistryError, RemoteTarget, SyncReport,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use super::gateway::{GatewayFactory, MemberDescriptor, PoolDescriptor, PoolGateway};
use super::registry::{RegistryClient, ServicePage};
use super::report::ReportSink;

const WAIT_LIMIT: Duration = Duration::from_secs(5);
const WAIT_STEP: Duration = Duration::from_millis(5);

/// One gateway round trip as observed by [`InMemoryGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Probe(String),
    SetType(String, String),
    Create(String, String),
    ListMembers(String),
    DeleteMembers(String, Vec<String>),
    AddMembers(String, Vec<String>),
    DeletePool(String),
}

impl GatewayCall {
    pub fn operation(&self) -> GatewayOperation {
        match self {
            Self::Probe(_) => GatewayOperation::ProbePool,
            Self::SetType(..) => GatewayOperation::SetPoolType,
            Self::Create(..) => GatewayOperation::CreatePool,
            Self::ListMembers(_) => GatewayOperation::ListMembers,
            Self::DeleteMembers(..) => GatewayOperation::DeleteMembers,
            Self::AddMembers(..) => GatewayOperation::AddMembers,
            Self::DeletePool(_) => GatewayOperation::DeletePool,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakePool {
    pub pool_type: String,
    pub members: Vec<String>,
}

/// Pool gateway backed by a map, with failure injection and gates.
///
/// A gate holds every call of one operation until the test adds permits.
#[derive(Default)]
pub struct InMemoryGateway {
    pools: Mutex<BTreeMap<String, FakePool>>,
    calls: Mutex<Vec<GatewayCall>>,
    failures: Mutex<HashMap<GatewayOperation, GatewayError>>,
    gates: Mutex<HashMap<GatewayOperation, Arc<Semaphore>>>,
    panic_on: Mutex<Option<GatewayOperation>>,
}

impl InMemoryGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert_pool(&self, name: &str, pool_type: &str, members: &[&str]) {
        self.pools.lock().insert(
            name.to_string(),
            FakePool {
                pool_type: pool_type.to_string(),
                members: members.iter().map(|m| (*m).to_string()).collect(),
            },
        );
    }

    pub fn pool(&self, name: &str) -> Option<FakePool> {
        self.pools.lock().get(name).cloned()
    }

    pub fn members(&self, name: &str) -> Vec<String> {
        self.pool(name).map(|p| p.members).unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }

    pub fn operations(&self) -> Vec<GatewayOperation> {
        self.calls.lock().iter().map(GatewayCall::operation).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn fail(&self, operation: GatewayOperation, error: GatewayError) {
        self.failures.lock().insert(operation, error);
    }

    /// Fails `operation` with a 500 rejection.
    pub fn reject(&self, operation: GatewayOperation) {
        self.fail(
            operation,
            GatewayError::Rejected { operation, status: 500, message: "injected".to_string() },
        );
    }

    pub fn clear_failure(&self, operation: GatewayOperation) {
        self.failures.lock().remove(&operation);
    }

    /// Closes a gate on `operation`; each call then consumes one permit.
    pub fn gate(&self, operation: GatewayOperation) -> Arc<Semaphore> {
        Arc::clone(self.gates.lock().entry(operation).or_insert_with(|| Arc::new(Semaphore::new(0))))
    }

    pub fn panic_on(&self, operation: GatewayOperation) {
        *self.panic_on.lock() = Some(operation);
    }

    /// Waits until at least `count` calls have been recorded.
    pub async fn wait_for_calls(&self, count: usize) -> Vec<GatewayCall> {
        let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
        loop {
            let calls = self.calls();
            if calls.len() >= count || tokio::time::Instant::now() >= deadline {
                return calls;
            }
            tokio::time::sleep(WAIT_STEP).await;
        }
    }

    async fn enter(&self, call: GatewayCall) -> Result<(), GatewayError> {
        let operation = call.operation();
        self.calls.lock().push(call);

        let gate = self.gates.lock().get(&operation).cloned();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        if *self.panic_on.lock() == Some(operation) {
            panic!("injected panic in {}", operation);
        }
        match self.failures.lock().get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn missing(operation: GatewayOperation, pool: &str) -> GatewayError {
        GatewayError::Rejected {
            operation,
            status: 404,
            message: format!("pool {} does not exist", pool),
        }
    }
}

#[async_trait]
impl PoolGateway for InMemoryGateway {
    async fn probe_pool(&self, pool: &str) -> Result<PoolDescriptor, GatewayError> {
        self.enter(GatewayCall::Probe(pool.to_string())).await?;
        let pools = self.pools.lock();
        let found = pools.get(pool).ok_or_else(|| GatewayError::NotFound { pool: pool.to_string() })?;
        Ok(PoolDescriptor {
            name: pool.to_string(),
            partition: None,
            pool_type: Some(found.pool_type.clone()),
        })
    }

    async fn set_pool_type(&self, pool: &str, pool_type: &PoolType) -> Result<(), GatewayError> {
        self.enter(GatewayCall::SetType(pool.to_string(), pool_type.as_str().to_string())).await?;
        let mut pools = self.pools.lock();
        let found =
            pools.get_mut(pool).ok_or_else(|| Self::missing(GatewayOperation::SetPoolType, pool))?;
        found.pool_type = pool_type.as_str().to_string();
        Ok(())
    }

    async fn create_pool(&self, pool: &str, pool_type: &PoolType) -> Result<(), GatewayError> {
        self.enter(GatewayCall::Create(pool.to_string(), pool_type.as_str().to_string())).await?;
        let mut pools = self.pools.lock();
        if pools.contains_key(pool) {
            return Err(GatewayError::Rejected {
                operation: GatewayOperation::CreatePool,
                status: 409,
                message: format!("pool {} already exists", pool),
            });
        }
        pools.insert(
            pool.to_string(),
            FakePool { pool_type: pool_type.as_str().to_string(), members: Vec::new() },
        );
        Ok(())
    }

    async fn list_members(&self, pool: &str) -> Result<Vec<MemberDescriptor>, GatewayError> {
        self.enter(GatewayCall::ListMembers(pool.to_string())).await?;
        let pools = self.pools.lock();
        let found = pools.get(pool).ok_or_else(|| Self::missing(GatewayOperation::ListMembers, pool))?;
        Ok(found.members.iter().map(MemberDescriptor::new).collect())
    }

    async fn delete_members(
        &self,
        pool: &str,
        members: &[MemberDescriptor],
    ) -> Result<(), GatewayError> {
        let names: Vec<String> = members.iter().map(|m| m.name.clone()).collect();
        self.enter(GatewayCall::DeleteMembers(pool.to_string(), names.clone())).await?;
        let mut pools = self.pools.lock();
        let found =
            pools.get_mut(pool).ok_or_else(|| Self::missing(GatewayOperation::DeleteMembers, pool))?;
        for name in names {
            if let Some(index) = found.members.iter().position(|m| *m == name) {
                found.members.remove(index);
            }
        }
        Ok(())
    }

    async fn add_members(&self, pool: &str, members: &[MemberSpec]) -> Result<(), GatewayError> {
        let names: Vec<String> = members.iter().map(ToString::to_string).collect();
        self.enter(GatewayCall::AddMembers(pool.to_string(), names.clone())).await?;
        let mut pools = self.pools.lock();
        let found =
            pools.get_mut(pool).ok_or_else(|| Self::missing(GatewayOperation::AddMembers, pool))?;
        found.members.extend(names);
        Ok(())
    }

    async fn delete_pool(&self, pool: &str) -> Result<(), GatewayError> {
        self.enter(GatewayCall::DeletePool(pool.to_string())).await?;
        self.pools
            .lock()
            .remove(pool)
            .map(|_| ())
            .ok_or_else(|| Self::missing(GatewayOperation::DeletePool, pool))
    }
}

/// Hands out the same in-memory gateway for every target and records targets.
pub struct StaticGatewayFactory {
    gateway: Arc<InMemoryGateway>,
    requested: Mutex<Vec<Option<RemoteTarget>>>,
    reject_remote: Mutex<bool>,
    remote_port: Option<u16>,
}

impl StaticGatewayFactory {
    pub fn new(gateway: Arc<InMemoryGateway>) -> Arc<Self> {
        Self::build(gateway, None)
    }

    /// Resolves port-less remote targets to `port`, like a configured factory.
    pub fn with_remote_port(gateway: Arc<InMemoryGateway>, port: u16) -> Arc<Self> {
        Self::build(gateway, Some(port))
    }

    fn build(gateway: Arc<InMemoryGateway>, remote_port: Option<u16>) -> Arc<Self> {
        Arc::new(Self {
            gateway,
            requested: Mutex::new(Vec::new()),
            reject_remote: Mutex::new(false),
            remote_port,
        })
    }

    pub fn requested(&self) -> Vec<Option<RemoteTarget>> {
        self.requested.lock().clone()
    }

    /// Remote targets fail with an endpoint error from now on.
    pub fn reject_remote_targets(&self) {
        *self.reject_remote.lock() = true;
    }
}

impl GatewayFactory for StaticGatewayFactory {
    fn gateway_for(
        &self,
        remote: Option<&RemoteTarget>,
    ) -> Result<Arc<dyn PoolGateway>, GatewayError> {
        self.requested.lock().push(remote.cloned());
        if let Some(remote) = remote {
            if *self.reject_remote.lock() {
                return Err(GatewayError::Endpoint {
                    endpoint: remote.hostname.clone(),
                    message: "unreachable".to_string(),
                });
            }
        }
        let gateway: Arc<dyn PoolGateway> = self.gateway.clone();
        Ok(gateway)
    }

    fn default_remote_port(&self) -> Option<u16> {
        self.remote_port
    }
}

/// Keeps every report it receives.
#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<SyncReport>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reports(&self) -> Vec<SyncReport> {
        self.reports.lock().clone()
    }

    /// Waits until at least `count` reports have arrived.
    pub async fn wait_for(&self, count: usize) -> Vec<SyncReport> {
        let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
        loop {
            let reports = self.reports();
            if reports.len() >= count || tokio::time::Instant::now() >= deadline {
                return reports;
            }
            tokio::time::sleep(WAIT_STEP).await;
        }
    }
}

#[async_trait]
impl ReportSink for RecordingSink {
    async fn report(&self, report: SyncReport) {
        self.reports.lock().push(report);
    }
}

/// Registry that answers name listings from a script.
///
/// Once the script runs dry the last successful listing repeats.
#[derive(Default)]
pub struct ScriptedRegistry {
    script: Mutex<VecDeque<Result<Vec<String>, RegistryError>>>,
    steady: Mutex<Vec<String>>,
    instances: Mutex<HashMap<String, Result<Vec<MemberSpec>, RegistryError>>>,
    polls: AtomicUsize,
}

impl ScriptedRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_names(&self, names: &[&str]) {
        self.script.lock().push_back(Ok(names.iter().map(|n| (*n).to_string()).collect()));
    }

    pub fn push_failure(&self) {
        self.script
            .lock()
            .push_back(Err(RegistryError::Transport { message: "connection refused".to_string() }));
    }

    pub fn set_instances(&self, service: &str, members: Vec<MemberSpec>) {
        self.instances.lock().insert(service.to_string(), Ok(members));
    }

    pub fn fail_instances(&self, service: &str) {
        self.instances.lock().insert(
            service.to_string(),
            Err(RegistryError::Status { status: 500, message: "injected".to_string() }),
        );
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryClient for ScriptedRegistry {
    async fn list_service_page(&self, _page_no: u32) -> Result<ServicePage, RegistryError> {
        let names = self.list_service_names().await?;
        Ok(ServicePage { count: names.len() as u64, names })
    }

    fn page_size(&self) -> u32 {
        u32::MAX
    }

    async fn list_service_names(&self) -> Result<Vec<String>, RegistryError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        match next {
            Some(Ok(names)) => {
                self.steady.lock().clone_from(&names);
                Ok(names)
            },
            Some(Err(e)) => Err(e),
            None => Ok(self.steady.lock().clone()),
        }
    }

    async fn list_service_instances(
        &self,
        service_name: &str,
    ) -> Result<Vec<MemberSpec>, RegistryError> {
        self.instances.lock().get(service_name).cloned().unwrap_or_else(|| Ok(Vec::new()))
    }
}
