//! Nacos naming API (`/nacos/v1/ns`).

use async_trait::async_trait;
use poolsync_types::models::RegistryConfig;
use poolsync_types::{MemberSpec, RegistryError};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::{RegistryClient, ServicePage};

const SERVICE_LIST_PATH: &str = "/nacos/v1/ns/service/list";
const INSTANCE_LIST_PATH: &str = "/nacos/v1/ns/instance/list";

#[derive(Debug, Deserialize)]
struct ServiceListResponse {
    #[serde(default)]
    count: u64,
    #[serde(default)]
    doms: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct InstanceListResponse {
    #[serde(default)]
    hosts: Vec<NacosInstance>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NacosInstance {
    pub ip: String,
    pub port: u16,
    #[serde(default = "default_true")]
    pub healthy: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

const fn default_true() -> bool {
    true
}

pub struct NacosRegistryClient {
    client: Client,
    base_url: String,
    namespace: String,
    page_size: u32,
    max_pages: u32,
}

impl NacosRegistryClient {
    pub fn new(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| RegistryError::Transport {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            namespace: config.namespace.clone(),
            page_size: config.page_size,
            max_pages: config.max_pages,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RegistryError> {
        let response = request
            .send()
            .await
            .map_err(|e| RegistryError::Transport { message: e.to_string() })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Status {
                status: status.as_u16(),
                message: body.chars().take(300).collect(),
            });
        }

        response.json::<T>().await.map_err(|e| RegistryError::Decode { message: e.to_string() })
    }
}

#[async_trait]
impl RegistryClient for NacosRegistryClient {
    async fn list_service_page(&self, page_no: u32) -> Result<ServicePage, RegistryError> {
        let request = self.client.get(format!("{}{}", self.base_url, SERVICE_LIST_PATH)).query(&[
            ("pageNo", page_no.to_string()),
            ("pageSize", self.page_size.to_string()),
            ("namespaceId", self.namespace.clone()),
        ]);

        let page: ServiceListResponse = self.fetch(request).await?;
        Ok(ServicePage { count: page.count, names: page.doms })
    }

    fn page_size(&self) -> u32 {
        self.page_size
    }

    fn max_pages(&self) -> u32 {
        self.max_pages
    }

    async fn list_service_instances(
        &self,
        service_name: &str,
    ) -> Result<Vec<MemberSpec>, RegistryError> {
        let service_name = service_name.trim();
        if service_name.is_empty() {
            return Ok(Vec::new());
        }

        let request = self.client.get(format!("{}{}", self.base_url, INSTANCE_LIST_PATH)).query(&[
            ("serviceName", service_name),
            ("namespaceId", self.namespace.as_str()),
        ]);

        let instances: InstanceListResponse = self.fetch(request).await?;
        let members = usable_members(&instances.hosts);
        tracing::debug!(
            service = %service_name,
            listed = instances.hosts.len(),
            usable = members.len(),
            "Resolved service instances"
        );
        Ok(members)
    }
}

/// Healthy, enabled instances with a real port.
pub(crate) fn usable_members(hosts: &[NacosInstance]) -> Vec<MemberSpec> {
    hosts
        .iter()
        .filter(|h| h.healthy && h.enabled && h.port != 0 && !h.ip.trim().is_empty())
        .map(|h| MemberSpec::new(h.ip.trim(), h.port))
        .collect()
}
