//! Recommendation engine
//!
//! The pipeline per request:
//! 1. Fetch the catalog snapshot for the target
//! 2. For cpu and memory: select attribute values, filter and classify VMs,
//!    synthesize node pools
//! 3. Keep the cheapest plan and report what it provides
//!
//! Only the catalog fetch suspends. Everything after it is plain computation
//! over the snapshot and is exposed separately as [`plan_cluster`].

pub mod attributes;
pub mod filters;
pub mod nodepools;
pub mod plan;
pub mod scaleout;


use crate::catalog::CatalogProvider;
use crate::error::{tags, RecommenderError, RecommenderResult};
use crate::models::{
    Attribute, CatalogTarget, ClusterRecommendationRequest, ClusterRecommendationResponse,
    ClusterScaleOutRequest, NodePool, VirtualMachine,
};
use crate::observability::RecommenderMetrics;
use plan::AttributePlan;
use scaleout::LayoutTotals;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default bound on a single catalog fetch
pub const DEFAULT_CATALOG_TIMEOUT: Duration = Duration::from_secs(30);

/// Cooperative cancellation shared between a request and its caller
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn check(&self) -> RecommenderResult<()> {
        if self.is_cancelled() {
            return Err(RecommenderError::Cancelled);
        }
        Ok(())
    }
}

/// Plan node pools for a catalog snapshot
///
/// Without a layout the attribute values are narrowed to the request's
/// per-node interval first; with a layout the whole snapshot is considered.
pub fn plan_cluster(
    provider: &str,
    vms: &[VirtualMachine],
    req: &ClusterRecommendationRequest,
    layout: Option<&[NodePool]>,
) -> RecommenderResult<Vec<NodePool>> {
    let mut plans = Vec::with_capacity(Attribute::ALL.len());

    for attr in Attribute::ALL {
        let source = match layout {
            None => {
                let values = attributes::recommend_values(attr, vms, req)?;
                attributes::vms_with_values(attr, vms, &values)
            }
            Some(_) => vms.to_vec(),
        };

        if let Some(pools) = plan_attribute(attr, provider, &source, req, layout) {
            plans.push(AttributePlan::new(attr, pools));
        }
    }

    plan::select_cheapest_plan(plans).map(|plan| plan.node_pools)
}

/// Async front of the recommender, owning the catalog
#[derive(Clone)]
pub struct Engine {
    catalog: Arc<dyn CatalogProvider>,
    catalog_timeout: Duration,
    metrics: RecommenderMetrics,
}

impl Engine {
    pub fn new(catalog: Arc<dyn CatalogProvider>) -> Self {
        Self {
            catalog,
            catalog_timeout: DEFAULT_CATALOG_TIMEOUT,
            metrics: RecommenderMetrics::new(),
        }
    }

    pub fn with_catalog_timeout(mut self, timeout: Duration) -> Self {
        self.catalog_timeout = timeout;
        self
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogProvider> {
        &self.catalog
    }

    async fn fetch_catalog(
        &self,
        target: &CatalogTarget,
        cancel: &Cancellation,
    ) -> RecommenderResult<Vec<VirtualMachine>> {
        cancel.check()?;
        let start = Instant::now();
        let vms = tokio::time::timeout(self.catalog_timeout, self.catalog.product_details(target))
            .await
            .map_err(|_| {
                RecommenderError::CatalogUnavailable(format!(
                    "no product details for {target} within {:?}",
                    self.catalog_timeout
                ))
            })??;
        self.metrics.observe_catalog_fetch(start.elapsed().as_secs_f64());
        cancel.check()?;
        debug!(%target, products = vms.len(), "Fetched catalog snapshot");
        Ok(vms)
    }

    /// Recommend a fresh cluster layout
    pub async fn recommend_cluster(
        &self,
        target: &CatalogTarget,
        req: &ClusterRecommendationRequest,
        cancel: &Cancellation,
    ) -> RecommenderResult<ClusterRecommendationResponse> {
        info!(%target, sum_cpu = req.sum_cpu, sum_mem = req.sum_mem, on_demand_pct = req.on_demand_pct, "Recommending cluster");
        let vms = self.fetch_catalog(target, cancel).await?;
        let node_pools = plan_cluster(&target.provider, &vms, req, None)?;
        Ok(respond(target, req.zones(), node_pools))
    }

    /// Recommend how to extend an existing layout
    pub async fn recommend_cluster_scale_out(
        &self,
        target: &CatalogTarget,
        req: &ClusterScaleOutRequest,
        cancel: &Cancellation,
    ) -> RecommenderResult<ClusterRecommendationResponse> {
        info!(%target, desired_cpu = req.desired_cpu, desired_mem = req.desired_mem, on_demand_pct = req.on_demand_pct, "Recommending cluster scale-out");
        let vms = self.fetch_catalog(target, cancel).await?;
        let node_pools = plan_scale_out(&target.provider, &vms, req)?;
        let zones = req.zone.iter().cloned().collect();
        Ok(respond(target, zones, node_pools))
    }
}

/// Plan a scale-out for a catalog snapshot
pub fn plan_scale_out(
    provider: &str,
    vms: &[VirtualMachine],
    req: &ClusterScaleOutRequest,
) -> RecommenderResult<Vec<NodePool>> {
    let layout = scaleout::resolve_layout(&req.actual_layout, vms)?;
    let totals = LayoutTotals::from_pools(&layout);
    scaleout::ensure_scale_out_needed(req, &totals)?;

    let mut plans = Vec::new();
    let mut ratio_error = None;
    for attr in Attribute::ALL {
        let attr_req = match scaleout::scale_out_request(attr, req, &totals) {
            Ok(Some(attr_req)) => attr_req,
            Ok(None) => continue,
            Err(err @ RecommenderError::RatioInfeasible { .. }) => {
                debug!(attribute = %attr, error = %err, "Attribute cannot reach the on-demand ratio");
                ratio_error.get_or_insert(err);
                continue;
            }
            Err(err) => return Err(err),
        };

        if let Some(pools) = plan_attribute(attr, provider, vms, &attr_req, Some(&layout)) {
            plans.push(AttributePlan::new(attr, pools));
        }
    }

    if plans.is_empty() {
        return Err(ratio_error.unwrap_or(RecommenderError::NoFeasiblePlan));
    }
    plan::select_cheapest_plan(plans).map(|plan| plan.node_pools)
}

fn plan_attribute(
    attr: Attribute,
    provider: &str,
    vms: &[VirtualMachine],
    req: &ClusterRecommendationRequest,
    layout: Option<&[NodePool]>,
) -> Option<Vec<NodePool>> {
    let candidates = filters::recommend_vms(attr, provider, vms, req, layout);
    if candidates.insufficient(req.on_demand_pct) {
        debug!(
            attribute = %attr,
            on_demand = candidates.on_demand.len(),
            spot = candidates.spot.len(),
            "Skipping attribute, not enough candidates"
        );
        return None;
    }
    Some(nodepools::recommend_node_pools(
        attr,
        req,
        layout,
        &candidates.on_demand,
        &candidates.spot,
    ))
}

fn respond(
    target: &CatalogTarget,
    zones: Vec<String>,
    node_pools: Vec<NodePool>,
) -> ClusterRecommendationResponse {
    let accuracy = plan::accuracy(&node_pools, &zones);
    ClusterRecommendationResponse {
        provider: target.provider.clone(),
        service: target.service.clone(),
        region: target.region.clone(),
        zones,
        node_pools,
        accuracy,
    }
}

/// Whether the error was raised while planning rather than fetching
pub fn is_planning_error(err: &RecommenderError) -> bool {
    err.has_tag(tags::RECOMMENDER)
}
