//! Desired pool state: the input to one synchronization attempt.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// One host:port entry of a pool.
///
/// Duplicates are allowed in a desired member list; each entry is installed
/// as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberSpec {
    pub host: String,
    pub port: u16,
}

impl MemberSpec {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

impl fmt::Display for MemberSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for MemberSpec {
    type Err = ValidationError;

    /// Parses `host:port`, or `[v6addr]:port` for IPv6 literals.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let invalid = |message: &str| ValidationError::InvalidMember {
            value: trimmed.to_string(),
            message: message.to_string(),
        };

        let (host, port) = if let Some(rest) = trimmed.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(|| invalid("unterminated '['"))?;
            let port = tail.strip_prefix(':').ok_or_else(|| invalid("missing port"))?;
            (host, port)
        } else {
            let (host, port) = trimmed.rsplit_once(':').ok_or_else(|| invalid("expected host:port"))?;
            if host.contains(':') {
                return Err(invalid("IPv6 addresses must be bracketed"));
            }
            (host, port)
        };

        if host.is_empty() {
            return Err(invalid("empty host"));
        }
        if host.chars().any(char::is_whitespace) {
            return Err(invalid("host contains whitespace"));
        }

        let port = parse_port(port).ok_or_else(|| invalid("port must be in 1-65535"))?;
        Ok(Self::new(host, port))
    }
}

pub(crate) fn parse_port(raw: &str) -> Option<u16> {
    raw.trim().parse::<u16>().ok().filter(|p| *p != 0)
}

/// Load-balancing algorithm of a pool.
///
/// Opaque to the engine: the value is handed to the management API as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolType(String);

impl PoolType {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyProperty { name: "poolType".to_string() });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A remote management endpoint that receives every gateway call instead of
/// the local one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteTarget {
    pub hostname: String,
    /// Falls back to the configured remote port when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default)]
    pub device_group_name: String,
}

impl RemoteTarget {
    pub fn new(hostname: impl Into<String>, device_group_name: impl Into<String>) -> Self {
        Self { hostname: hostname.into(), port: None, device_group_name: device_group_name.into() }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }
}

/// What a pool should look like after a successful synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredPoolState {
    pub pool_name: String,
    pub pool_type: PoolType,
    #[serde(default)]
    pub members: Vec<MemberSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_target: Option<RemoteTarget>,
}

impl DesiredPoolState {
    pub fn new(
        pool_name: &str,
        pool_type: PoolType,
        members: Vec<MemberSpec>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            pool_name: validate_pool_name(pool_name)?,
            pool_type,
            members,
            remote_target: None,
        })
    }

    pub fn with_remote_target(mut self, remote_target: RemoteTarget) -> Self {
        self.remote_target = Some(remote_target);
        self
    }

    /// Identifies the pool together with the endpoint that hosts it, as
    /// far as the state alone tells.
    pub fn target_key(&self) -> String {
        self.resolved_target_key(None)
    }

    /// Like [`Self::target_key`], with `default_port` standing in for a
    /// remote target that names no port.
    ///
    /// Two states with the same resolved key address the same remote
    /// resource. Host names compare case-insensitively.
    pub fn resolved_target_key(&self, default_port: Option<u16>) -> String {
        match &self.remote_target {
            Some(remote) => {
                let host = remote.hostname.trim().to_ascii_lowercase();
                match remote.port.or(default_port) {
                    Some(port) => format!("{}:{}/{}", host, port, self.pool_name),
                    None => format!("{}/{}", host, self.pool_name),
                }
            },
            None => format!("local/{}", self.pool_name),
        }
    }
}

/// Pool names end up as URL path segments on the management API.
pub(crate) fn validate_pool_name(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyProperty { name: "poolName".to_string() });
    }
    if trimmed.chars().any(|c| c.is_whitespace() || matches!(c, '/' | '~' | '?' | '#' | '%')) {
        return Err(ValidationError::invalid(
            "poolName",
            format!("'{}' contains characters not allowed in a pool name", trimmed),
        ));
    }
    Ok(trimmed.to_string())
}
