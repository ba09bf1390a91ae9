//! Synchronization attempt errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::gateway::GatewayError;
use crate::models::SyncState;

/// A step of the create-or-replace or teardown pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    /// Resolving the management endpoint for the target
    Connect,
    SetType,
    Create,
    ListMembers,
    PurgeMembers,
    InstallMembers,
    DeletePool,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Connect => write!(f, "connect"),
            Self::SetType => write!(f, "set_type"),
            Self::Create => write!(f, "create"),
            Self::ListMembers => write!(f, "list_members"),
            Self::PurgeMembers => write!(f, "purge_members"),
            Self::InstallMembers => write!(f, "install_members"),
            Self::DeletePool => write!(f, "delete_pool"),
        }
    }
}

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Transport,
    RemoteRejection,
    Internal,
}

/// Cause carried by a terminal `Error` report.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum SyncError {
    /// A pipeline stage failed; later stages never ran
    #[error("Stage {stage} failed: {cause}")]
    Stage { stage: SyncStage, cause: GatewayError },

    /// The pipeline itself broke (panic or lost task)
    #[error("Internal sync failure: {message}")]
    Internal { message: String },
}

impl SyncError {
    pub fn at(stage: SyncStage) -> impl FnOnce(GatewayError) -> Self {
        move |cause| Self::Stage { stage, cause }
    }

    pub fn stage(&self) -> Option<SyncStage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            Self::Internal { .. } => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Stage { cause, .. } => match cause {
                GatewayError::Transport { .. } => ErrorKind::Transport,
                GatewayError::Endpoint { .. } => ErrorKind::Validation,
                GatewayError::NotFound { .. }
                | GatewayError::Rejected { .. }
                | GatewayError::Decode { .. } => ErrorKind::RemoteRejection,
            },
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }
}

/// Illegal lifecycle transition on a sync attempt.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum AttemptError {
    #[error("Attempt {id} already reached terminal state {state:?}")]
    AlreadyTerminal { id: String, state: SyncState },
}
