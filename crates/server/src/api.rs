//! HTTP API for cluster recommendations, status and Prometheus metrics

use crate::problem::{body_rejection, Problem};
use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use recommender_lib::{
    health::{ComponentStatus, HealthRegistry},
    multicloud, validation, Cancellation, CatalogTarget, ClusterRecommendationRequest,
    ClusterRecommendationResponse, ClusterScaleOutRequest, Engine, MultiClusterRequest,
    MultiClusterResponse, RecommenderMetrics, RecommenderResult, StructuredLogger,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub const CLUSTER_ROUTE: &str = "/recommender/provider/:provider/service/:service/region/:region/cluster";
pub const MULTICLOUD_ROUTE: &str = "/recommender/multicloud";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub health_registry: HealthRegistry,
    pub metrics: RecommenderMetrics,
    pub logger: StructuredLogger,
    /// Token required on recommender routes, `None` disables the check
    pub api_token: Option<String>,
    /// Cancelled when the server shuts down
    pub shutdown: Cancellation,
}

impl AppState {
    pub fn new(
        engine: Engine,
        health_registry: HealthRegistry,
        metrics: RecommenderMetrics,
        logger: StructuredLogger,
        api_token: Option<String>,
    ) -> Self {
        Self {
            engine,
            health_registry,
            metrics,
            logger,
            api_token,
            shutdown: Cancellation::new(),
        }
    }

    /// Run one recommendation and record its outcome
    async fn observe<T, F>(&self, operation: &str, subject: &str, work: F) -> RecommenderResult<T>
    where
        F: Future<Output = RecommenderResult<T>>,
    {
        let start = Instant::now();
        let result = work.await;
        let elapsed = start.elapsed().as_secs_f64();

        self.metrics.observe_request(operation, result.is_ok(), elapsed);
        self.health_registry
            .record_catalog_outcome(result.as_ref().err())
            .await;
        if let Err(err) = &result {
            self.metrics.inc_error(err.kind());
            self.logger
                .log_failure(operation, subject, err.kind(), &err.to_string());
        }
        result
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub name: String,
    pub version: String,
    pub commit: String,
}

/// Recommend a cluster layout for a provider, service and region
async fn recommend_cluster(
    State(state): State<Arc<AppState>>,
    Path((provider, service, region)): Path<(String, String, String)>,
    payload: Result<Json<ClusterRecommendationRequest>, JsonRejection>,
) -> Result<Json<ClusterRecommendationResponse>, Problem> {
    let target = CatalogTarget::new(provider, service, region);
    let response = state
        .observe("recommend", &target.to_string(), async {
            let Json(req) = payload.map_err(body_rejection)?;
            validation::validate_request(&req)?;
            validation::validate_target(
                state.engine.catalog().as_ref(),
                &target,
                req.zone.as_deref(),
            )
            .await?;
            state
                .engine
                .recommend_cluster(&target, &req, &state.shutdown)
                .await
        })
        .await?;

    state.logger.log_recommendation("recommend", &response);
    Ok(Json(response))
}

/// Recommend how to scale out an existing layout
async fn recommend_scale_out(
    State(state): State<Arc<AppState>>,
    Path((provider, service, region)): Path<(String, String, String)>,
    payload: Result<Json<ClusterScaleOutRequest>, JsonRejection>,
) -> Result<Json<ClusterRecommendationResponse>, Problem> {
    let target = CatalogTarget::new(provider, service, region);
    let response = state
        .observe("scale_out", &target.to_string(), async {
            let Json(req) = payload.map_err(body_rejection)?;
            validation::validate_scale_out(&req)?;
            validation::validate_target(
                state.engine.catalog().as_ref(),
                &target,
                req.zone.as_deref(),
            )
            .await?;
            state
                .engine
                .recommend_cluster_scale_out(&target, &req, &state.shutdown)
                .await
        })
        .await?;

    state.logger.log_recommendation("scale_out", &response);
    Ok(Json(response))
}

/// Recommend clusters across providers and regions
async fn recommend_multi_cluster(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MultiClusterRequest>, JsonRejection>,
) -> Result<Json<MultiClusterResponse>, Problem> {
    let response = state
        .observe("multicloud", "multicloud", async {
            let Json(req) = payload.map_err(body_rejection)?;
            validation::validate_multi_cluster(&req)?;
            multicloud::recommend_multi_cluster(&state.engine, &req, &state.shutdown).await
        })
        .await?;

    info!(
        services = response.len(),
        responses = response.values().map(Vec::len).sum::<usize>(),
        "Generated multi-cluster recommendation"
    );
    Ok(Json(response))
}

/// Component health - 200 while operational, 503 otherwise
async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn version() -> impl IntoResponse {
    Json(VersionInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: recommender_lib::VERSION.to_string(),
        commit: option_env!("GIT_COMMIT").unwrap_or("unknown").to_string(),
    })
}

/// Reject recommender calls without the configured bearer token
async fn require_token(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, Problem> {
    let Some(expected) = state.api_token.as_deref() else {
        return Ok(next.run(req).await);
    };

    let provided = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == expected => Ok(next.run(req).await),
        _ => Err(Problem::unauthorized()),
    }
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            err.to_string().into_bytes(),
        );
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router, nested under `base_path` when one is set
pub fn create_router(state: Arc<AppState>, base_path: &str) -> Router {
    let recommender = Router::new()
        .route(CLUSTER_ROUTE, post(recommend_cluster).put(recommend_scale_out))
        .route(MULTICLOUD_ROUTE, post(recommend_multi_cluster))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    let api = Router::new()
        .merge(recommender)
        .route("/status", get(status))
        .route("/version", get(version))
        .with_state(state);

    if base_path.is_empty() {
        api
    } else {
        Router::new().nest(base_path, api)
    }
}

/// Router exposing `/metrics` on its own listener
pub fn create_metrics_router() -> Router {
    Router::new().route("/metrics", get(metrics))
}

/// Serve a router until the shutdown future resolves
pub async fn serve<F>(addr: &str, app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
