//! HTTP client for the cloud info service

use super::CatalogProvider;
use crate::error::{RecommenderError, RecommenderResult};
use crate::models::{CatalogTarget, NetworkPerfCategory, Region, VirtualMachine};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

const USER_AGENT: &str = concat!("cluster-recommender/", env!("CARGO_PKG_VERSION"));

/// Cloud info REST client
#[derive(Debug, Clone)]
pub struct CloudInfoClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct ProvidersResponse {
    providers: Vec<ProviderEntry>,
}

#[derive(Debug, Deserialize)]
struct ProviderEntry {
    provider: String,
}

#[derive(Debug, Deserialize)]
struct ServicesResponse {
    services: Vec<ServiceEntry>,
}

#[derive(Debug, Deserialize)]
struct ServiceEntry {
    service: String,
}

#[derive(Debug, Deserialize)]
struct RegionEntry {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ContinentEntry {
    name: String,
    #[serde(default)]
    regions: Vec<RegionEntry>,
}

#[derive(Debug, Deserialize)]
struct RegionDetails {
    #[serde(default)]
    zones: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ProductsResponse {
    products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
struct ZonePrice {
    price: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Product {
    #[serde(rename = "type")]
    instance_type: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    series: String,
    on_demand_price: f64,
    #[serde(default)]
    spot_price: Vec<ZonePrice>,
    cpus_per_vm: f64,
    mem_per_vm: f64,
    #[serde(default)]
    gpus_per_vm: f64,
    #[serde(default)]
    allocatable_cpus: Option<f64>,
    #[serde(default)]
    allocatable_mem: Option<f64>,
    #[serde(default)]
    burst: bool,
    #[serde(default)]
    ntw_perf: String,
    ntw_perf_category: NetworkPerfCategory,
    #[serde(default)]
    current_gen: bool,
    #[serde(default)]
    zones: Vec<String>,
}

impl From<Product> for VirtualMachine {
    fn from(p: Product) -> Self {
        let allocatable_cpus = p.allocatable_cpus.unwrap_or(p.cpus_per_vm).min(p.cpus_per_vm);
        let allocatable_memory = p.allocatable_mem.unwrap_or(p.mem_per_vm).min(p.mem_per_vm);
        VirtualMachine {
            avg_price: avg_spot_price(&p.spot_price),
            instance_type: p.instance_type,
            series: p.series,
            category: p.category,
            cpus: p.cpus_per_vm,
            memory: p.mem_per_vm,
            allocatable_cpus,
            allocatable_memory,
            gpus: p.gpus_per_vm,
            on_demand_price: p.on_demand_price,
            burst: p.burst,
            current_gen: p.current_gen,
            zones: p.zones,
            network_perf: p.ntw_perf,
            network_perf_category: p.ntw_perf_category,
        }
    }
}

/// Mean spot price over every zone, zero without a spot market
fn avg_spot_price(prices: &[ZonePrice]) -> f64 {
    if prices.is_empty() {
        return 0.0;
    }
    prices.iter().map(|p| p.price).sum::<f64>() / prices.len() as f64
}

impl CloudInfoClient {
    pub fn new(base_url: &str, timeout: Duration) -> RecommenderResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RecommenderError::Validation(format!("invalid cloud info address: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RecommenderError::Validation(format!(
                "invalid cloud info address: {base_url}"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RecommenderError::Internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> RecommenderResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RecommenderError::Internal(format!("cannot extend {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        target: CatalogTarget,
        segments: &[&str],
    ) -> RecommenderResult<T> {
        let url = self.endpoint(segments)?;
        debug!(%url, "Querying cloud info");

        let response = self.client.get(url).send().await.map_err(|e| {
            error!(%target, error = %e, "Failed to reach cloud info");
            RecommenderError::CatalogUnavailable(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = format!("{status}: {}", body.trim());
            // 5xx is an outage, 4xx an unknown target
            if status.is_server_error() {
                error!(%target, %status, "Cloud info failed to answer");
                return Err(RecommenderError::CatalogUnavailable(reason));
            }
            error!(%target, %status, "Cloud info rejected the query");
            return Err(RecommenderError::CatalogNotFound { target, reason });
        }

        response.json().await.map_err(|e| {
            error!(%target, error = %e, "Failed to decode cloud info response");
            RecommenderError::Internal(format!("malformed cloud info response: {e}"))
        })
    }
}

#[async_trait]
impl CatalogProvider for CloudInfoClient {
    async fn product_details(&self, target: &CatalogTarget) -> RecommenderResult<Vec<VirtualMachine>> {
        info!(%target, "Retrieving product details");
        let response: ProductsResponse = self
            .get(
                target.clone(),
                &[
                    "providers",
                    &target.provider,
                    "services",
                    &target.service,
                    "regions",
                    &target.region,
                    "products",
                ],
            )
            .await?;

        let vms: Vec<VirtualMachine> = response.products.into_iter().map(Into::into).collect();
        info!(%target, products = vms.len(), "Retrieved product details");
        Ok(vms)
    }

    async fn providers(&self) -> RecommenderResult<Vec<String>> {
        let response: ProvidersResponse = self
            .get(CatalogTarget::new("", "", ""), &["providers"])
            .await?;
        Ok(response.providers.into_iter().map(|p| p.provider).collect())
    }

    async fn services(&self, provider: &str) -> RecommenderResult<Vec<String>> {
        let response: ServicesResponse = self
            .get(
                CatalogTarget::new(provider, "", ""),
                &["providers", provider, "services"],
            )
            .await?;
        Ok(response.services.into_iter().map(|s| s.service).collect())
    }

    async fn regions(&self, provider: &str, service: &str) -> RecommenderResult<Vec<Region>> {
        let target = CatalogTarget::new(provider, service, "");
        let regions: Vec<RegionEntry> = self
            .get(
                target.clone(),
                &["providers", provider, "services", service, "regions"],
            )
            .await?;
        let continents: Vec<ContinentEntry> = self
            .get(
                target,
                &["providers", provider, "services", service, "continents"],
            )
            .await?;

        let continent_of: HashMap<String, String> = continents
            .into_iter()
            .flat_map(|c| {
                let name = c.name;
                c.regions.into_iter().map(move |r| (r.id, name.clone()))
            })
            .collect();

        Ok(regions
            .into_iter()
            .map(|r| Region {
                continent: continent_of.get(&r.id).cloned(),
                id: r.id,
                name: r.name,
            })
            .collect())
    }

    async fn zones(&self, target: &CatalogTarget) -> RecommenderResult<Vec<String>> {
        let details: RegionDetails = self
            .get(
                target.clone(),
                &[
                    "providers",
                    &target.provider,
                    "services",
                    &target.service,
                    "regions",
                    &target.region,
                ],
            )
            .await?;
        Ok(details.zones)
    }
}
