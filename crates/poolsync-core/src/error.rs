//! Unified error types for Poolsync Core.

use poolsync_types::{GatewayError, RegistryError};
use thiserror::Error;

/// Main error type for core operations outside the sync pipeline.
///
/// Pipeline failures never surface here: they end up as the cause of an
/// `Error` report instead.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    /// Network request failed (HTTP client).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Pool-management endpoint could not be set up.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Service registry client could not be set up.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for core operations.
pub type AppResult<T> = Result<T, AppError>;
