//! The two gateway pipelines, as straight-line sequences of stages.
//!
//! Each stage waits for the previous round trip; the first failure ends
//! the pipeline with the failing stage attached.

use poolsync_types::{DesiredPoolState, SyncError, SyncStage, TerminalState};

use crate::sync::gateway::PoolGateway;

/// Create-or-update the pool, then replace its member set wholesale.
pub(crate) async fn synchronize_pool(
    gateway: &dyn PoolGateway,
    desired: &DesiredPoolState,
) -> Result<TerminalState, SyncError> {
    let pool = desired.pool_name.as_str();

    match gateway.probe_pool(pool).await {
        Ok(existing) => {
            tracing::debug!(
                current_type = existing.pool_type.as_deref().unwrap_or("unknown"),
                desired_type = desired.pool_type.as_str(),
                "Pool exists, settling type"
            );
            gateway
                .set_pool_type(pool, &desired.pool_type)
                .await
                .map_err(SyncError::at(SyncStage::SetType))?;
        },
        Err(e) => {
            if e.is_not_found() {
                tracing::debug!("Pool absent, creating");
            } else {
                tracing::warn!("Probe failed, falling back to create: {}", e);
            }
            gateway
                .create_pool(pool, &desired.pool_type)
                .await
                .map_err(SyncError::at(SyncStage::Create))?;
        },
    }

    let current =
        gateway.list_members(pool).await.map_err(SyncError::at(SyncStage::ListMembers))?;

    gateway
        .delete_members(pool, &current)
        .await
        .map_err(SyncError::at(SyncStage::PurgeMembers))?;

    gateway
        .add_members(pool, &desired.members)
        .await
        .map_err(SyncError::at(SyncStage::InstallMembers))?;

    tracing::debug!(purged = current.len(), installed = desired.members.len(), "Members replaced");
    Ok(TerminalState::Bound)
}

/// Delete the pool if it is there; absence counts as done.
pub(crate) async fn teardown_pool(
    gateway: &dyn PoolGateway,
    desired: &DesiredPoolState,
) -> Result<TerminalState, SyncError> {
    let pool = desired.pool_name.as_str();

    match gateway.probe_pool(pool).await {
        Ok(_) => {
            gateway.delete_pool(pool).await.map_err(SyncError::at(SyncStage::DeletePool))?;
            tracing::debug!("Pool deleted");
        },
        Err(e) if e.is_not_found() => {
            tracing::debug!("Pool already absent");
        },
        Err(e) => {
            tracing::warn!("Probe failed, treating pool as absent: {}", e);
        },
    }

    Ok(TerminalState::Unbound)
}
