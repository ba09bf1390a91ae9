//! Service registry client.
//!
//! Failure is an explicit [`RegistryError`]; deciding to treat it as "skip
//! this cycle" or "no members" is the caller's business.

mod nacos;


use async_trait::async_trait;
use poolsync_types::{MemberSpec, RegistryError};

pub use nacos::NacosRegistryClient;

/// One page of a service-name listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServicePage {
    /// Total number of services as reported by the registry, 0 if unknown
    pub count: u64,
    pub names: Vec<String>,
}

#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Fetches one page of service names; pages are numbered from 1.
    async fn list_service_page(&self, page_no: u32) -> Result<ServicePage, RegistryError>;

    fn page_size(&self) -> u32;

    fn max_pages(&self) -> u32 {
        u32::MAX
    }

    /// Every service name, paging until a short page or the reported total.
    ///
    /// Any failing page fails the whole listing; a partial name set would
    /// look like services disappearing.
    async fn list_service_names(&self) -> Result<Vec<String>, RegistryError> {
        let page_size = self.page_size().max(1) as usize;
        let max_pages = self.max_pages().max(1);
        let mut names = Vec::new();

        for page_no in 1..=max_pages {
            let page = self.list_service_page(page_no).await?;
            let fetched = page.names.len();
            names.extend(page.names);

            if fetched < page_size {
                break;
            }
            if page.count > 0 && names.len() as u64 >= page.count {
                break;
            }
            if page_no == max_pages {
                tracing::warn!(
                    max_pages,
                    fetched = names.len(),
                    "Service listing truncated at page limit"
                );
            }
        }

        Ok(names)
    }

    /// Usable instances of one service as pool members.
    async fn list_service_instances(
        &self,
        service_name: &str,
    ) -> Result<Vec<MemberSpec>, RegistryError>;
}
