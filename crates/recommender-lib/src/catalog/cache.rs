//! Product detail cache in front of a catalog provider

use super::CatalogProvider;
use crate::error::RecommenderResult;
use crate::models::{CatalogTarget, Region, VirtualMachine};
use crate::observability::RecommenderMetrics;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    vms: Vec<VirtualMachine>,
    fetched_at: Instant,
}

/// Caches product details per target for a fixed time to live
///
/// Provider, service, region and zone lookups pass straight through.
pub struct CachedCatalog {
    inner: Arc<dyn CatalogProvider>,
    ttl: Duration,
    entries: DashMap<CatalogTarget, CacheEntry>,
    metrics: RecommenderMetrics,
}

impl CachedCatalog {
    pub fn new(inner: Arc<dyn CatalogProvider>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: DashMap::new(),
            metrics: RecommenderMetrics::new(),
        }
    }

    /// Drop expired entries
    pub fn purge_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.fetched_at.elapsed() < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CatalogProvider for CachedCatalog {
    async fn product_details(&self, target: &CatalogTarget) -> RecommenderResult<Vec<VirtualMachine>> {
        let cached = self
            .entries
            .get(target)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.vms.clone());

        if let Some(vms) = cached {
            self.metrics.inc_cache_hit();
            debug!(%target, products = vms.len(), "Product details served from cache");
            return Ok(vms);
        }

        self.metrics.inc_cache_miss();
        let vms = self.inner.product_details(target).await?;
        self.entries.insert(
            target.clone(),
            CacheEntry {
                vms: vms.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(vms)
    }

    async fn providers(&self) -> RecommenderResult<Vec<String>> {
        self.inner.providers().await
    }

    async fn services(&self, provider: &str) -> RecommenderResult<Vec<String>> {
        self.inner.services(provider).await
    }

    async fn regions(&self, provider: &str, service: &str) -> RecommenderResult<Vec<Region>> {
        self.inner.regions(provider, service).await
    }

    async fn zones(&self, target: &CatalogTarget) -> RecommenderResult<Vec<String>> {
        self.inner.zones(target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecommenderError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingCatalog {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CatalogProvider for CountingCatalog {
        async fn product_details(&self, target: &CatalogTarget) -> RecommenderResult<Vec<VirtualMachine>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if target.region == "unknown" {
                return Err(RecommenderError::CatalogNotFound {
                    target: target.clone(),
                    reason: "404".into(),
                });
            }
            Ok(Vec::new())
        }

        async fn providers(&self) -> RecommenderResult<Vec<String>> {
            Ok(vec!["amazon".into()])
        }

        async fn services(&self, _provider: &str) -> RecommenderResult<Vec<String>> {
            Ok(vec!["compute".into()])
        }

        async fn regions(&self, _provider: &str, _service: &str) -> RecommenderResult<Vec<Region>> {
            Ok(Vec::new())
        }

        async fn zones(&self, _target: &CatalogTarget) -> RecommenderResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_second_lookup_is_cached() {
        let inner = Arc::new(CountingCatalog::default());
        let cache = CachedCatalog::new(inner.clone(), Duration::from_secs(60));
        let target = CatalogTarget::new("amazon", "compute", "eu-west-1");

        cache.product_details(&target).await.unwrap();
        cache.product_details(&target).await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_entries_are_refetched() {
        let inner = Arc::new(CountingCatalog::default());
        let cache = CachedCatalog::new(inner.clone(), Duration::ZERO);
        let target = CatalogTarget::new("amazon", "compute", "eu-west-1");

        cache.product_details(&target).await.unwrap();
        cache.product_details(&target).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);

        cache.purge_expired();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let inner = Arc::new(CountingCatalog::default());
        let cache = CachedCatalog::new(inner.clone(), Duration::from_secs(60));
        let target = CatalogTarget::new("amazon", "compute", "unknown");

        assert!(cache.product_details(&target).await.is_err());
        assert!(cache.product_details(&target).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }
}
