//! Service registry errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One failed round trip against the service registry.
///
/// Registry clients surface these instead of folding them into empty results;
/// callers decide whether a failure means "skip this cycle" or "no members".
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum RegistryError {
    /// Connection failure or timeout
    #[error("Registry unreachable: {message}")]
    Transport { message: String },

    /// The registry answered with a non-success status
    #[error("Registry returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The registry answered with a body we could not decode
    #[error("Registry response undecodable: {message}")]
    Decode { message: String },
}
