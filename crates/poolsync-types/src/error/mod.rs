//! Typed error definitions for pool reconciliation.
//!
//! The hierarchy mirrors how failures are handled:
//!
//! - [`ValidationError`] rejects a request before anything is accepted
//! - [`GatewayError`] is one failed round trip against the pool-management API
//! - [`RegistryError`] is one failed round trip against the service registry
//! - [`SyncError`] is the cause carried by an `Error` report

mod gateway;
mod registry;
mod sync;
mod validation;

pub use gateway::{GatewayError, GatewayOperation};
pub use registry::RegistryError;
pub use sync::{AttemptError, ErrorKind, SyncError, SyncStage};
pub use validation::ValidationError;
