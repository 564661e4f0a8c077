//! Product catalog access
//!
//! The engine only depends on [`CatalogProvider`]. [`CloudInfoClient`] talks
//! to a cloud info REST service and [`CachedCatalog`] keeps product details
//! around between requests.

mod cache;
mod client;

pub use cache::CachedCatalog;
pub use client::CloudInfoClient;

use crate::error::RecommenderResult;
use crate::models::{CatalogTarget, Region, VirtualMachine};
use async_trait::async_trait;

/// Source of product, region and zone information
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Virtual machine types offered for the target
    async fn product_details(&self, target: &CatalogTarget) -> RecommenderResult<Vec<VirtualMachine>>;

    /// Supported cloud providers
    async fn providers(&self) -> RecommenderResult<Vec<String>>;

    /// Services of a provider
    async fn services(&self, provider: &str) -> RecommenderResult<Vec<String>>;

    /// Regions of a service, with their continent when known
    async fn regions(&self, provider: &str, service: &str) -> RecommenderResult<Vec<Region>>;

    /// Availability zones of the target region
    async fn zones(&self, target: &CatalogTarget) -> RecommenderResult<Vec<String>>;
}
