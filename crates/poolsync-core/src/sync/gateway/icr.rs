//! iControl REST implementation of [`PoolGateway`].
//!
//! Pools live under `/mgmt/tm/ltm/pool/~{partition}~{name}`; members under
//! `.../members/~{partition}~{host:port}`.

use async_trait::async_trait;
use poolsync_types::models::GatewayConfig;
use poolsync_types::{GatewayError, GatewayOperation, MemberSpec, PoolType, RemoteTarget};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::{GatewayFactory, MemberDescriptor, PoolDescriptor, PoolGateway};

/// Carries the device group name on requests redirected to a remote device.
pub const DEVICE_GROUP_HEADER: &str = "X-F5-Device-Group";

const POOL_COLLECTION: &str = "/mgmt/tm/ltm/pool";

#[derive(Deserialize)]
struct ItemList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Deserialize)]
struct RejectionBody {
    message: Option<String>,
}

/// Gateway bound to one management endpoint.
#[derive(Clone)]
pub struct IcrGateway {
    client: Client,
    base_url: String,
    partition: String,
    username: String,
    password: String,
    device_group: Option<String>,
}

impl IcrGateway {
    pub fn new(client: Client, base_url: &str, config: &GatewayConfig) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            partition: config.partition.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            device_group: None,
        }
    }

    pub fn with_device_group(mut self, group: &str) -> Self {
        let group = group.trim();
        self.device_group = (!group.is_empty()).then(|| group.to_string());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn device_group(&self) -> Option<&str> {
        self.device_group.as_deref()
    }

    fn collection_url(&self) -> String {
        format!("{}{}", self.base_url, POOL_COLLECTION)
    }

    fn pool_url(&self, pool: &str) -> String {
        format!("{}/~{}~{}", self.collection_url(), self.partition, pool)
    }

    fn members_url(&self, pool: &str) -> String {
        format!("{}/members", self.pool_url(pool))
    }

    fn member_url(&self, pool: &str, member: &MemberDescriptor) -> String {
        let partition = member.partition.as_deref().unwrap_or(&self.partition);
        format!("{}/~{}~{}", self.members_url(pool), partition, member.name)
    }

    /// Non-2xx becomes `Rejected`; anything that never got a response is `Transport`.
    async fn send(
        &self,
        operation: GatewayOperation,
        request: RequestBuilder,
    ) -> Result<Response, GatewayError> {
        let mut request = request.basic_auth(&self.username, Some(&self.password));
        if let Some(group) = &self.device_group {
            request = request.header(DEVICE_GROUP_HEADER, group);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport { operation, message: transport_message(&e) })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::Rejected {
            operation,
            status: status.as_u16(),
            message: rejection_message(&body, status),
        })
    }

    async fn decode<T: DeserializeOwned>(
        operation: GatewayOperation,
        response: Response,
    ) -> Result<T, GatewayError> {
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode { operation, message: e.to_string() })
    }
}

#[async_trait]
impl PoolGateway for IcrGateway {
    async fn probe_pool(&self, pool: &str) -> Result<PoolDescriptor, GatewayError> {
        let operation = GatewayOperation::ProbePool;
        match self.send(operation, self.client.get(self.pool_url(pool))).await {
            Ok(response) => Self::decode(operation, response).await,
            Err(GatewayError::Rejected { status: 404, .. }) => {
                Err(GatewayError::NotFound { pool: pool.to_string() })
            },
            Err(e) => Err(e),
        }
    }

    async fn set_pool_type(&self, pool: &str, pool_type: &PoolType) -> Result<(), GatewayError> {
        let body = json!({ "loadBalancingMode": pool_type.as_str() });
        self.send(GatewayOperation::SetPoolType, self.client.patch(self.pool_url(pool)).json(&body))
            .await?;
        Ok(())
    }

    async fn create_pool(&self, pool: &str, pool_type: &PoolType) -> Result<(), GatewayError> {
        let body = json!({
            "name": pool,
            "partition": self.partition,
            "loadBalancingMode": pool_type.as_str(),
        });
        self.send(GatewayOperation::CreatePool, self.client.post(self.collection_url()).json(&body))
            .await?;
        Ok(())
    }

    async fn list_members(&self, pool: &str) -> Result<Vec<MemberDescriptor>, GatewayError> {
        let operation = GatewayOperation::ListMembers;
        let response = self.send(operation, self.client.get(self.members_url(pool))).await?;
        let list: ItemList<MemberDescriptor> = Self::decode(operation, response).await?;
        Ok(list.items)
    }

    async fn delete_members(
        &self,
        pool: &str,
        members: &[MemberDescriptor],
    ) -> Result<(), GatewayError> {
        for member in members {
            let url = self.member_url(pool, member);
            self.send(GatewayOperation::DeleteMembers, self.client.delete(url)).await?;
        }
        Ok(())
    }

    async fn add_members(&self, pool: &str, members: &[MemberSpec]) -> Result<(), GatewayError> {
        let url = self.members_url(pool);
        for member in members {
            let body = json!({ "name": member.to_string(), "partition": self.partition });
            self.send(GatewayOperation::AddMembers, self.client.post(&url).json(&body)).await?;
        }
        Ok(())
    }

    async fn delete_pool(&self, pool: &str) -> Result<(), GatewayError> {
        self.send(GatewayOperation::DeletePool, self.client.delete(self.pool_url(pool))).await?;
        Ok(())
    }
}

/// Builds gateways that share one HTTP client.
pub struct IcrGatewayFactory {
    client: Client,
    config: GatewayConfig,
    local: Arc<dyn PoolGateway>,
}

impl IcrGatewayFactory {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| GatewayError::Endpoint {
                endpoint: config.base_url.clone(),
                message: format!("failed to build HTTP client: {}", e),
            })?;

        let base_url = normalize_base_url(&config.base_url)?;
        let local: Arc<dyn PoolGateway> =
            Arc::new(IcrGateway::new(client.clone(), &base_url, &config));

        tracing::info!(
            base_url = %base_url,
            partition = %config.partition,
            timeout_ms = config.request_timeout_ms,
            "Pool gateway initialized"
        );

        Ok(Self { client, config, local })
    }

    pub fn remote_base_url(&self, remote: &RemoteTarget) -> Result<String, GatewayError> {
        let port = remote.port.unwrap_or(self.config.remote_port);
        let host = if remote.hostname.contains(':') && !remote.hostname.starts_with('[') {
            format!("[{}]", remote.hostname)
        } else {
            remote.hostname.clone()
        };
        normalize_base_url(&format!("https://{}:{}", host, port))
    }
}

impl GatewayFactory for IcrGatewayFactory {
    fn gateway_for(
        &self,
        remote: Option<&RemoteTarget>,
    ) -> Result<Arc<dyn PoolGateway>, GatewayError> {
        let Some(remote) = remote else {
            return Ok(Arc::clone(&self.local));
        };

        let base_url = self.remote_base_url(remote)?;
        tracing::debug!(
            base_url = %base_url,
            device_group = %remote.device_group_name,
            "Redirecting gateway calls to remote device"
        );
        let gateway = IcrGateway::new(self.client.clone(), &base_url, &self.config)
            .with_device_group(&remote.device_group_name);
        Ok(Arc::new(gateway))
    }

    fn default_remote_port(&self) -> Option<u16> {
        Some(self.config.remote_port)
    }
}

pub(crate) fn normalize_base_url(raw: &str) -> Result<String, GatewayError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let endpoint_error = |message: String| GatewayError::Endpoint {
        endpoint: trimmed.to_string(),
        message,
    };

    let url = url::Url::parse(trimmed).map_err(|e| endpoint_error(e.to_string()))?;
    if url.host_str().is_none() {
        return Err(endpoint_error("missing host".to_string()));
    }
    if !matches!(url.scheme(), "http" | "https") {
        return Err(endpoint_error(format!("unsupported scheme '{}'", url.scheme())));
    }
    Ok(trimmed.to_string())
}

fn transport_message(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timed out: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}

/// Prefer the API's own `message` field over the raw body.
pub(crate) fn rejection_message(body: &str, status: StatusCode) -> String {
    let parsed = serde_json::from_str::<RejectionBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty());

    match parsed {
        Some(message) => message,
        None if body.trim().is_empty() => {
            status.canonical_reason().unwrap_or("rejected").to_string()
        },
        None => truncate_string(body.trim(), 500),
    }
}

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let mut result: String = s.chars().take(max_len).collect();
        result.push('…');
        result
    }
}
