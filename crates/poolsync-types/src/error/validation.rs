//! Request validation errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Malformed or missing input, caught before any network call.
///
/// Never retried and never reported through the bound/error lifecycle: the
/// host rejects the request outright.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum ValidationError {
    /// A required input property is absent
    #[error("Missing required property: {name}")]
    MissingProperty { name: String },

    /// A property that must carry a value is empty
    #[error("Property {name} must not be empty")]
    EmptyProperty { name: String },

    /// A property is present but its value has the wrong shape
    #[error("Invalid value for {name}: {message}")]
    InvalidProperty { name: String, message: String },

    /// A pool member entry is not a usable host:port pair
    #[error("Invalid pool member '{value}': {message}")]
    InvalidMember { value: String, message: String },

    /// The request body is not a config task at all
    #[error("Malformed config task: {message}")]
    MalformedTask { message: String },
}

impl ValidationError {
    pub fn invalid(name: &str, message: impl Into<String>) -> Self {
        Self::InvalidProperty { name: name.to_string(), message: message.into() }
    }
}
