//! Pool-management gateway.
//!
//! One trait method per remote operation; each is a single logical step of
//! the sync pipeline and reports failure as a distinct [`GatewayError`].

mod icr;


use async_trait::async_trait;
use poolsync_types::{GatewayError, MemberSpec, PoolType, RemoteTarget};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use icr::{IcrGateway, IcrGatewayFactory, DEVICE_GROUP_HEADER};

/// A pool as reported by the management API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolDescriptor {
    pub name: String,
    #[serde(default)]
    pub partition: Option<String>,
    #[serde(default, rename = "loadBalancingMode")]
    pub pool_type: Option<String>,
}

/// A member as listed by the management API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDescriptor {
    /// `host:port` as named by the management API
    pub name: String,
    #[serde(default)]
    pub partition: Option<String>,
}

impl MemberDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), partition: None }
    }
}

#[async_trait]
pub trait PoolGateway: Send + Sync {
    /// `GatewayError::NotFound` when the pool does not exist.
    async fn probe_pool(&self, pool: &str) -> Result<PoolDescriptor, GatewayError>;

    async fn set_pool_type(&self, pool: &str, pool_type: &PoolType) -> Result<(), GatewayError>;

    async fn create_pool(&self, pool: &str, pool_type: &PoolType) -> Result<(), GatewayError>;

    async fn list_members(&self, pool: &str) -> Result<Vec<MemberDescriptor>, GatewayError>;

    /// Stops at the first member that cannot be deleted.
    async fn delete_members(
        &self,
        pool: &str,
        members: &[MemberDescriptor],
    ) -> Result<(), GatewayError>;

    /// Adds members in the given order, duplicates included.
    async fn add_members(&self, pool: &str, members: &[MemberSpec]) -> Result<(), GatewayError>;

    /// Removes the pool and, with it, all of its members.
    async fn delete_pool(&self, pool: &str) -> Result<(), GatewayError>;
}

/// Chooses the management endpoint for a desired state.
pub trait GatewayFactory: Send + Sync {
    /// The local endpoint when `remote` is `None`.
    fn gateway_for(
        &self,
        remote: Option<&RemoteTarget>,
    ) -> Result<Arc<dyn PoolGateway>, GatewayError>;

    /// Port used for remote targets that name none.
    fn default_remote_port(&self) -> Option<u16> {
        None
    }
}
