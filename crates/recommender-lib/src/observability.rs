//! Observability infrastructure for the recommender
//!
//! Provides:
//! - Prometheus metrics (request counts and latency, error kinds, catalog fetches, cache hits)
//! - Structured JSON logging with tracing

use crate::models::ClusterRecommendationResponse;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    Histogram, HistogramVec, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<RecommenderMetricsInner> = OnceLock::new();

struct RecommenderMetricsInner {
    requests_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
    errors_total: IntCounterVec,
    catalog_fetch_seconds: Histogram,
    catalog_cache_hits: IntCounter,
    catalog_cache_misses: IntCounter,
}

impl RecommenderMetricsInner {
    fn new() -> Self {
        Self {
            requests_total: register_int_counter_vec!(
                "cluster_recommender_requests_total",
                "Recommendation requests by operation and outcome",
                &["operation", "outcome"]
            )
            .expect("Failed to register requests_total"),

            request_duration_seconds: register_histogram_vec!(
                "cluster_recommender_request_duration_seconds",
                "Time spent serving a recommendation",
                &["operation"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register request_duration_seconds"),

            errors_total: register_int_counter_vec!(
                "cluster_recommender_errors_total",
                "Failed recommendations by error kind",
                &["kind"]
            )
            .expect("Failed to register errors_total"),

            catalog_fetch_seconds: register_histogram!(
                "cluster_recommender_catalog_fetch_seconds",
                "Time spent fetching product details from the catalog",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register catalog_fetch_seconds"),

            catalog_cache_hits: register_int_counter!(
                "cluster_recommender_catalog_cache_hits_total",
                "Product detail lookups served from the cache"
            )
            .expect("Failed to register catalog_cache_hits"),

            catalog_cache_misses: register_int_counter!(
                "cluster_recommender_catalog_cache_misses_total",
                "Product detail lookups forwarded to the catalog"
            )
            .expect("Failed to register catalog_cache_misses"),
        }
    }
}

/// Recommender metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct RecommenderMetrics {
    _private: (),
}

impl Default for RecommenderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommenderMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(RecommenderMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &RecommenderMetricsInner {
        GLOBAL_METRICS.get_or_init(RecommenderMetricsInner::new)
    }

    /// Record a finished request of the given operation
    pub fn observe_request(&self, operation: &str, success: bool, duration_secs: f64) {
        let outcome = if success { "success" } else { "failure" };
        let inner = self.inner();
        inner
            .requests_total
            .with_label_values(&[operation, outcome])
            .inc();
        inner
            .request_duration_seconds
            .with_label_values(&[operation])
            .observe(duration_secs);
    }

    pub fn inc_error(&self, kind: &str) {
        self.inner().errors_total.with_label_values(&[kind]).inc();
    }

    pub fn observe_catalog_fetch(&self, duration_secs: f64) {
        self.inner().catalog_fetch_seconds.observe(duration_secs);
    }

    pub fn inc_cache_hit(&self) {
        self.inner().catalog_cache_hits.inc();
    }

    pub fn inc_cache_miss(&self) {
        self.inner().catalog_cache_misses.inc();
    }
}

/// Structured logger for recommender events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log a successful recommendation
    pub fn log_recommendation(&self, operation: &str, response: &ClusterRecommendationResponse) {
        let acc = &response.accuracy;
        info!(
            event = "recommendation_generated",
            instance = %self.instance,
            operation = %operation,
            provider = %response.provider,
            service = %response.service,
            region = %response.region,
            node_pools = response.node_pools.len(),
            cpu = acc.rec_cpu,
            memory = acc.rec_mem,
            nodes = acc.rec_nodes,
            total_price = acc.total_price,
            "Generated cluster recommendation"
        );
    }

    /// Log a failed recommendation
    pub fn log_failure(&self, operation: &str, target: &str, kind: &str, reason: &str) {
        warn!(
            event = "recommendation_failed",
            instance = %self.instance,
            operation = %operation,
            target = %target,
            kind = %kind,
            reason = %reason,
            "Cluster recommendation failed"
        );
    }

    pub fn log_startup(&self, version: &str, listen_address: &str, cloud_info_address: &str) {
        info!(
            event = "startup",
            instance = %self.instance,
            version = %version,
            listen_address = %listen_address,
            cloud_info_address = %cloud_info_address,
            "Cluster recommender started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "shutdown",
            instance = %self.instance,
            reason = %reason,
            "Cluster recommender shutting down"
        );
    }
}
