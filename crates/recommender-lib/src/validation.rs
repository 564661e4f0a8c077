//! Request and path validation
//!
//! Structural checks run without the catalog; path checks ask the catalog
//! whether the provider, service, region and zone exist. Catalog failures
//! during path checks are returned as they are.

use crate::catalog::CatalogProvider;
use crate::error::{RecommenderError, RecommenderResult};
use crate::models::{
    CatalogTarget, ClusterRecommendationRequest, ClusterScaleOutRequest, MultiClusterRequest,
};
use tracing::debug;

fn invalid(message: impl Into<String>) -> RecommenderError {
    RecommenderError::Validation(message.into())
}

fn check_pct(on_demand_pct: u8) -> RecommenderResult<()> {
    if on_demand_pct > 100 {
        return Err(invalid(format!(
            "onDemandPct must be between 0 and 100, got {on_demand_pct}"
        )));
    }
    Ok(())
}

fn check_sum(name: &str, value: f64) -> RecommenderResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(format!("{name} must be a non-negative number, got {value}")));
    }
    Ok(())
}

pub fn validate_request(req: &ClusterRecommendationRequest) -> RecommenderResult<()> {
    check_sum("sumCpu", req.sum_cpu)?;
    check_sum("sumMem", req.sum_mem)?;
    if req.sum_cpu == 0.0 && req.sum_mem == 0.0 {
        return Err(invalid("at least one of sumCpu and sumMem must be positive"));
    }
    if req.min_nodes < 1 {
        return Err(invalid("minNodes must be at least 1"));
    }
    if req.min_nodes > req.max_nodes {
        return Err(invalid(format!(
            "minNodes ({}) must not exceed maxNodes ({})",
            req.min_nodes, req.max_nodes
        )));
    }
    check_pct(req.on_demand_pct)
}

pub fn validate_scale_out(req: &ClusterScaleOutRequest) -> RecommenderResult<()> {
    check_sum("desiredCpu", req.desired_cpu)?;
    check_sum("desiredMem", req.desired_mem)?;
    check_pct(req.on_demand_pct)?;
    if req.actual_layout.is_empty() {
        return Err(invalid("actualLayout must describe at least one node pool"));
    }
    if let Some(desc) = req.actual_layout.iter().find(|d| d.instance_type.is_empty()) {
        return Err(invalid(format!(
            "actualLayout entry with {} nodes has no instance type",
            desc.sum_nodes
        )));
    }
    Ok(())
}

pub fn validate_multi_cluster(req: &MultiClusterRequest) -> RecommenderResult<()> {
    if req.providers.is_empty() {
        return Err(invalid("providers must not be empty"));
    }
    if let Some(p) = req.providers.iter().find(|p| p.services.is_empty()) {
        return Err(invalid(format!("provider {} lists no services", p.provider)));
    }
    if req.resp_per_service == 0 {
        return Err(invalid("respPerService must be at least 1"));
    }
    validate_request(&req.request)
}

/// Check the target, and the zone when given, against the catalog
pub async fn validate_target(
    catalog: &dyn CatalogProvider,
    target: &CatalogTarget,
    zone: Option<&str>,
) -> RecommenderResult<()> {
    debug!(%target, ?zone, "Validating path data");

    let providers = catalog.providers().await?;
    if !providers.iter().any(|p| *p == target.provider) {
        return Err(invalid(format!("unsupported provider: {}", target.provider)));
    }

    let services = catalog.services(&target.provider).await?;
    if !services.iter().any(|s| *s == target.service) {
        return Err(invalid(format!(
            "unsupported service {} for provider {}",
            target.service, target.provider
        )));
    }

    let regions = catalog.regions(&target.provider, &target.service).await?;
    if !regions.iter().any(|r| r.id == target.region) {
        return Err(invalid(format!(
            "unsupported region {} for {}/{}",
            target.region, target.provider, target.service
        )));
    }

    if let Some(zone) = zone {
        let zones = catalog.zones(target).await?;
        if !zones.iter().any(|z| z == zone) {
            return Err(invalid(format!("zone {zone} is not part of region {}", target.region)));
        }
    }

    Ok(())
}
