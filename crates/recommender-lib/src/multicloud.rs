//! Multi-cluster fan-out
//!
//! Runs the single-cluster recommendation for every region of every listed
//! provider service and keeps the cheapest answers per service.

use crate::engine::{is_planning_error, Cancellation, Engine};
use crate::error::RecommenderResult;
use crate::models::{
    CatalogTarget, ClusterRecommendationResponse, MultiClusterRequest, MultiClusterResponse,
    Region,
};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

fn on_continents(region: &Region, continents: &[String]) -> bool {
    continents.is_empty()
        || region
            .continent
            .as_ref()
            .is_some_and(|c| continents.iter().any(|wanted| wanted == c))
}

/// Targets the request fans out to
pub async fn resolve_targets(
    engine: &Engine,
    req: &MultiClusterRequest,
) -> RecommenderResult<Vec<CatalogTarget>> {
    let mut targets = Vec::new();
    for entry in &req.providers {
        for service in &entry.services {
            let regions = engine.catalog().regions(&entry.provider, service).await?;
            targets.extend(
                regions
                    .iter()
                    .filter(|r| on_continents(r, &req.continents))
                    .map(|r| CatalogTarget::new(&entry.provider, service, &r.id)),
            );
        }
    }
    Ok(targets)
}

/// Group responses per service, cheapest first, at most `limit` each
pub fn rank_by_service(
    responses: Vec<ClusterRecommendationResponse>,
    limit: usize,
) -> MultiClusterResponse {
    let mut grouped = MultiClusterResponse::new();
    for response in responses {
        grouped
            .entry(response.service.clone())
            .or_default()
            .push(response);
    }
    for list in grouped.values_mut() {
        list.sort_by(|a, b| a.accuracy.total_price.total_cmp(&b.accuracy.total_price));
        list.truncate(limit);
    }
    grouped
}

/// Recommend clusters across providers, services and regions
pub async fn recommend_multi_cluster(
    engine: &Engine,
    req: &MultiClusterRequest,
    cancel: &Cancellation,
) -> RecommenderResult<MultiClusterResponse> {
    let targets = resolve_targets(engine, req).await?;
    info!(targets = targets.len(), continents = ?req.continents, "Fanning out multi-cluster recommendation");

    let mut tasks = JoinSet::new();
    for target in targets {
        let engine = engine.clone();
        let request = req.request.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let result = engine.recommend_cluster(&target, &request, &cancel).await;
            (target, result)
        });
    }

    let mut responses = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(response))) => responses.push(response),
            Ok((target, Err(err))) if is_planning_error(&err) => {
                debug!(%target, error = %err, "No recommendation for region")
            }
            Ok((target, Err(err))) => {
                warn!(%target, error = %err, "Skipping region after failed recommendation")
            }
            Err(err) => warn!(error = %err, "Recommendation task failed"),
        }
    }

    Ok(rank_by_service(responses, req.resp_per_service))
}
