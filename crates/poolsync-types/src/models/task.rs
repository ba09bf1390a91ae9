//! Orchestrator config-task requests and input property extraction.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::pool::{parse_port, validate_pool_name, DesiredPoolState, MemberSpec, PoolType, RemoteTarget};
use crate::error::ValidationError;

/// Properties a create-or-replace request must carry.
pub const SYNC_PROPERTIES: &[&str] =
    &["poolName", "poolType", "poolMembers", "hostname", "deviceGroupName"];

/// Properties a teardown request must carry.
pub const TEARDOWN_PROPERTIES: &[&str] = &["poolName", "poolType", "poolMembers"];

/// One `{id, value}` entry of a block's input properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputProperty {
    pub id: String,
    #[serde(default)]
    pub value: Value,
}

impl InputProperty {
    pub fn new(id: &str, value: Value) -> Self {
        Self { id: id.to_string(), value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockState {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub input_properties: Vec<InputProperty>,
}

/// Body of a POST/DELETE from the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigTaskState {
    pub id: String,
    pub block: BlockState,
}

impl ConfigTaskState {
    /// Extract and validate the desired pool state from the block's properties.
    pub fn desired_state(&self, required: &[&str]) -> Result<DesiredPoolState, ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::MalformedTask { message: "task id is empty".to_string() });
        }
        DesiredPoolState::from_properties(&self.block.input_properties, required)
    }
}

impl DesiredPoolState {
    /// Build a desired state from `inputProperties`.
    ///
    /// Every name in `required` must be present. A non-empty `hostname`
    /// selects a remote target; `deviceGroupName` and `port` refine it.
    pub fn from_properties(
        properties: &[InputProperty],
        required: &[&str],
    ) -> Result<Self, ValidationError> {
        let map: HashMap<&str, &Value> =
            properties.iter().map(|p| (p.id.as_str(), &p.value)).collect();

        if let Some(missing) = required.iter().find(|name| !map.contains_key(**name)) {
            return Err(ValidationError::MissingProperty { name: (*missing).to_string() });
        }

        let pool_name = match map.get("poolName") {
            Some(value) => validate_pool_name(string_value("poolName", value)?)?,
            None => return Err(ValidationError::MissingProperty { name: "poolName".to_string() }),
        };

        let pool_type = match map.get("poolType") {
            Some(value) => PoolType::new(string_value("poolType", value)?)?,
            None => return Err(ValidationError::MissingProperty { name: "poolType".to_string() }),
        };

        let members = match map.get("poolMembers") {
            Some(value) => parse_members(value)?,
            None => Vec::new(),
        };

        let hostname = match map.get("hostname") {
            Some(value) => string_value("hostname", value)?.trim(),
            None => "",
        };

        let remote_target = if hostname.is_empty() {
            None
        } else {
            if hostname.contains("://") || hostname.chars().any(char::is_whitespace) {
                return Err(ValidationError::invalid("hostname", "expected a bare host name"));
            }
            let device_group_name = match map.get("deviceGroupName") {
                Some(value) => string_value("deviceGroupName", value)?.trim().to_string(),
                None => String::new(),
            };
            let mut target = RemoteTarget::new(hostname, device_group_name);
            if let Some(value) = map.get("port") {
                target.port = port_value("port", value)?;
            }
            Some(target)
        };

        Ok(Self { pool_name, pool_type, members, remote_target })
    }
}

fn string_value<'a>(name: &str, value: &'a Value) -> Result<&'a str, ValidationError> {
    value.as_str().ok_or_else(|| ValidationError::invalid(name, "expected a string"))
}

fn port_value(name: &str, value: &Value) -> Result<Option<u16>, ValidationError> {
    let raw = match value {
        Value::Null => return Ok(None),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return Err(ValidationError::invalid(name, "expected a port number")),
    };
    parse_port(&raw)
        .map(Some)
        .ok_or_else(|| ValidationError::invalid(name, format!("'{}' is not a port in 1-65535", raw)))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MemberEntry {
    Address(String),
    Parts {
        #[serde(alias = "ip", alias = "address")]
        host: String,
        port: PortEntry,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortEntry {
    Number(u64),
    Text(String),
}

/// Accepts an array of `"host:port"` strings or `{host|ip, port}` objects, or
/// a single comma/whitespace separated string.
fn parse_members(value: &Value) -> Result<Vec<MemberSpec>, ValidationError> {
    match value {
        Value::Array(items) => items.iter().map(parse_member_entry).collect(),
        Value::String(raw) => raw
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(str::parse::<MemberSpec>)
            .collect(),
        _ => Err(ValidationError::invalid("poolMembers", "expected a list of host:port members")),
    }
}

fn parse_member_entry(item: &Value) -> Result<MemberSpec, ValidationError> {
    let invalid = |message: &str| ValidationError::InvalidMember {
        value: item.to_string(),
        message: message.to_string(),
    };

    let entry: MemberEntry = serde_json::from_value(item.clone())
        .map_err(|_| invalid("expected \"host:port\" or {host, port}"))?;

    match entry {
        MemberEntry::Address(raw) => raw.parse(),
        MemberEntry::Parts { host, port } => {
            let host = host.trim();
            if host.is_empty() {
                return Err(invalid("empty host"));
            }
            let port = match port {
                PortEntry::Number(n) => u16::try_from(n).ok().filter(|p| *p != 0),
                PortEntry::Text(s) => parse_port(&s),
            }
            .ok_or_else(|| invalid("port must be in 1-65535"))?;
            Ok(MemberSpec::new(host, port))
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(entries: Value) -> Vec<InputProperty> {
        serde_json::from_value(entries).unwrap()
    }

    #[test]
    fn test_local_state_from_properties() {
        let properties = props(json!([
            {"id": "poolName", "value": "web"},
            {"id": "poolType", "value": "round-robin"},
            {"id": "poolMembers", "value": ["10.0.0.1:80", {"ip": "10.0.0.2", "port": "80"}]},
            {"id": "hostname", "value": ""},
            {"id": "deviceGroupName", "value": ""}
        ]));

        let state = DesiredPoolState::from_properties(&properties, SYNC_PROPERTIES).unwrap();
        assert_eq!(state.pool_name, "web");
        assert_eq!(state.pool_type.as_str(), "round-robin");
        assert_eq!(
            state.members,
            vec![MemberSpec::new("10.0.0.1", 80), MemberSpec::new("10.0.0.2", 80)]
        );
        assert!(state.remote_target.is_none());
    }

    #[test]
    fn test_remote_state_from_properties() {
        let properties = props(json!([
            {"id": "poolName", "value": "web"},
            {"id": "poolType", "value": "least-connections-member"},
            {"id": "poolMembers", "value": "10.0.0.1:80, 10.0.0.1:80"},
            {"id": "hostname", "value": "bigip-2.example.com"},
            {"id": "deviceGroupName", "value": "dg-east"},
            {"id": "port", "value": 8443}
        ]));

        let state = DesiredPoolState::from_properties(&properties, SYNC_PROPERTIES).unwrap();
        assert_eq!(state.members.len(), 2, "duplicates are kept");
        let remote = state.remote_target.unwrap();
        assert_eq!(remote.hostname, "bigip-2.example.com");
        assert_eq!(remote.device_group_name, "dg-east");
        assert_eq!(remote.port, Some(8443));
    }

    #[test]
    fn test_missing_required_property() {
        let properties = props(json!([
            {"id": "poolName", "value": "web"},
            {"id": "poolType", "value": "round-robin"},
            {"id": "poolMembers", "value": []}
        ]));

        let err = DesiredPoolState::from_properties(&properties, SYNC_PROPERTIES).unwrap_err();
        assert_eq!(err, ValidationError::MissingProperty { name: "hostname".to_string() });

        assert!(DesiredPoolState::from_properties(&properties, TEARDOWN_PROPERTIES).is_ok());
    }

    #[test]
    fn test_malformed_members_rejected() {
        let properties = props(json!([
            {"id": "poolName", "value": "web"},
            {"id": "poolType", "value": "round-robin"},
            {"id": "poolMembers", "value": [{"host": "10.0.0.1", "port": 0}]}
        ]));
        let err = DesiredPoolState::from_properties(&properties, TEARDOWN_PROPERTIES).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidMember { .. }));

        let properties = props(json!([
            {"id": "poolName", "value": "web"},
            {"id": "poolType", "value": "round-robin"},
            {"id": "poolMembers", "value": 42}
        ]));
        let err = DesiredPoolState::from_properties(&properties, TEARDOWN_PROPERTIES).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidProperty { .. }));
    }

    #[test]
    fn test_hostname_must_be_bare() {
        let properties = props(json!([
            {"id": "poolName", "value": "web"},
            {"id": "poolType", "value": "round-robin"},
            {"id": "poolMembers", "value": []},
            {"id": "hostname", "value": "https://bigip"},
            {"id": "deviceGroupName", "value": ""}
        ]));
        assert!(DesiredPoolState::from_properties(&properties, SYNC_PROPERTIES).is_err());
    }

    #[test]
    fn test_task_deserializes_camel_case() {
        let task: ConfigTaskState = serde_json::from_value(json!({
            "id": "task-7",
            "block": {
                "id": "block-1",
                "state": "BINDING",
                "inputProperties": [
                    {"id": "poolName", "value": "web"},
                    {"id": "poolType", "value": "round-robin"},
                    {"id": "poolMembers", "value": []}
                ]
            }
        }))
        .unwrap();

        let state = task.desired_state(TEARDOWN_PROPERTIES).unwrap();
        assert_eq!(state.pool_name, "web");
        assert!(state.members.is_empty());
    }
}
