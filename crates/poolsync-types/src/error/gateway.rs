//! Pool-management API errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The pool-management operations a gateway exposes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GatewayOperation {
    ProbePool,
    SetPoolType,
    CreatePool,
    ListMembers,
    DeleteMembers,
    AddMembers,
    DeletePool,
}

impl fmt::Display for GatewayOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ProbePool => write!(f, "probe pool"),
            Self::SetPoolType => write!(f, "set pool type"),
            Self::CreatePool => write!(f, "create pool"),
            Self::ListMembers => write!(f, "list members"),
            Self::DeleteMembers => write!(f, "delete members"),
            Self::AddMembers => write!(f, "add members"),
            Self::DeletePool => write!(f, "delete pool"),
        }
    }
}

/// One failed round trip against the pool-management API.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum GatewayError {
    /// The named pool does not exist
    #[error("Pool {pool} not found")]
    NotFound { pool: String },

    /// Connection failure or timeout; the endpoint never answered
    #[error("{operation} failed in transport: {message}")]
    Transport { operation: GatewayOperation, message: String },

    /// The endpoint answered and refused the operation
    #[error("{operation} rejected with status {status}: {message}")]
    Rejected { operation: GatewayOperation, status: u16, message: String },

    /// The endpoint answered with a body we could not decode
    #[error("{operation} returned an undecodable response: {message}")]
    Decode { operation: GatewayOperation, message: String },

    /// The management endpoint address itself is unusable
    #[error("Invalid management endpoint {endpoint}: {message}")]
    Endpoint { endpoint: String, message: String },
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// The operation that failed, when the failure came from a round trip.
    pub fn operation(&self) -> Option<GatewayOperation> {
        match self {
            Self::Transport { operation, .. }
            | Self::Rejected { operation, .. }
            | Self::Decode { operation, .. } => Some(*operation),
            Self::NotFound { .. } => Some(GatewayOperation::ProbePool),
            Self::Endpoint { .. } => None,
        }
    }
}
