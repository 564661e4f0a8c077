//! Integration tests for the recommender API endpoints

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use cluster_recommender::{
    api::{create_metrics_router, create_router, AppState},
    problem::{Problem, PROBLEM_CONTENT_TYPE, RECOMMENDATION_PROBLEM, VALIDATION_PROBLEM},
};
use recommender_lib::{
    health::{components, ComponentStatus, HealthRegistry, HealthResponse},
    CatalogProvider, CatalogTarget, ClusterRecommendationResponse, Engine, MultiClusterResponse,
    NetworkPerfCategory, RecommenderError, RecommenderMetrics, RecommenderResult, Region,
    StructuredLogger, VirtualMachine, VmClass,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

const CLUSTER_URI: &str = "/recommender/provider/amazon/service/compute/region/eu-west-1/cluster";

fn vm(instance_type: &str, cpus: f64, memory: f64, od: f64, avg: f64) -> VirtualMachine {
    VirtualMachine {
        instance_type: instance_type.to_string(),
        series: instance_type.split('.').next().unwrap_or_default().to_string(),
        category: "General purpose".to_string(),
        cpus,
        memory,
        allocatable_cpus: cpus,
        allocatable_memory: memory,
        gpus: 0.0,
        on_demand_price: od,
        avg_price: avg,
        burst: false,
        current_gen: true,
        zones: Vec::new(),
        network_perf: String::new(),
        network_perf_category: NetworkPerfCategory::High,
    }
}

struct FakeCatalog {
    unavailable: bool,
}

#[async_trait]
impl CatalogProvider for FakeCatalog {
    async fn product_details(&self, target: &CatalogTarget) -> RecommenderResult<Vec<VirtualMachine>> {
        if self.unavailable {
            return Err(RecommenderError::CatalogUnavailable("connection refused".into()));
        }
        if target.region != "eu-west-1" {
            return Err(RecommenderError::CatalogNotFound {
                target: target.clone(),
                reason: "404 Not Found".into(),
            });
        }
        Ok(vec![
            vm("m5.large", 2.0, 8.0, 0.096, 0.035),
            vm("m5.xlarge", 4.0, 16.0, 0.192, 0.07),
            vm("m5.2xlarge", 8.0, 32.0, 0.384, 0.14),
            vm("c5.xlarge", 4.0, 8.0, 0.17, 0.065),
            vm("r5.large", 2.0, 16.0, 0.126, 0.04),
        ])
    }

    async fn providers(&self) -> RecommenderResult<Vec<String>> {
        if self.unavailable {
            return Err(RecommenderError::CatalogUnavailable("connection refused".into()));
        }
        Ok(vec!["amazon".into()])
    }

    async fn services(&self, _provider: &str) -> RecommenderResult<Vec<String>> {
        Ok(vec!["compute".into()])
    }

    async fn regions(&self, _provider: &str, _service: &str) -> RecommenderResult<Vec<Region>> {
        Ok(vec![
            Region {
                id: "eu-west-1".into(),
                name: "EU (Ireland)".into(),
                continent: Some("Europe".into()),
            },
            Region {
                id: "us-east-1".into(),
                name: "US East (N. Virginia)".into(),
                continent: Some("North America".into()),
            },
        ])
    }

    async fn zones(&self, _target: &CatalogTarget) -> RecommenderResult<Vec<String>> {
        Ok(vec!["eu-west-1a".into(), "eu-west-1b".into()])
    }
}

async fn setup_app(unavailable: bool, api_token: Option<&str>, base_path: &str) -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::CATALOG).await;
    health_registry.register(components::ENGINE).await;

    let engine = Engine::new(Arc::new(FakeCatalog { unavailable }));
    let state = Arc::new(AppState::new(
        engine,
        health_registry,
        RecommenderMetrics::new(),
        StructuredLogger::new("test"),
        api_token.map(str::to_string),
    ));
    (create_router(state.clone(), base_path), state)
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json<T: DeserializeOwned>(response: axum::response::Response) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn cluster_body() -> serde_json::Value {
    json!({
        "sumCpu": 16,
        "sumMem": 64,
        "minNodes": 2,
        "maxNodes": 8,
        "onDemandPct": 25,
        "zone": "eu-west-1a"
    })
}

#[tokio::test]
async fn test_recommend_cluster() {
    let (app, _) = setup_app(false, None, "").await;

    let response = app
        .oneshot(json_request("POST", CLUSTER_URI, cluster_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let rec: ClusterRecommendationResponse = read_json(response).await;
    assert_eq!(rec.provider, "amazon");
    assert_eq!(rec.zones, vec!["eu-west-1a".to_string()]);
    assert!(!rec.node_pools.is_empty());
    assert!(rec.accuracy.rec_cpu >= 16.0 || rec.accuracy.rec_mem >= 64.0);
}

#[tokio::test]
async fn test_malformed_body_is_validation_problem() {
    let (app, _) = setup_app(false, None, "").await;

    let request = Request::builder()
        .method("POST")
        .uri(CLUSTER_URI)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"sumCpu\": "))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()[header::CONTENT_TYPE], PROBLEM_CONTENT_TYPE);
    let problem: Problem = read_json(response).await;
    assert_eq!(problem.title, VALIDATION_PROBLEM);
    assert_eq!(problem.status, 400);
}

#[tokio::test]
async fn test_unknown_network_category_is_rejected() {
    let (app, _) = setup_app(false, None, "").await;

    let mut body = cluster_body();
    body["networkPerf"] = json!(["ultra"]);
    let response = app
        .oneshot(json_request("POST", CLUSTER_URI, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let problem: Problem = read_json(response).await;
    assert_eq!(problem.title, VALIDATION_PROBLEM);
}

#[tokio::test]
async fn test_unknown_zone_is_rejected() {
    let (app, _) = setup_app(false, None, "").await;

    let mut body = cluster_body();
    body["zone"] = json!("eu-west-1z");
    let response = app
        .oneshot(json_request("POST", CLUSTER_URI, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let problem: Problem = read_json(response).await;
    assert_eq!(problem.title, VALIDATION_PROBLEM);
    assert!(problem.detail.contains("eu-west-1z"));
}

#[tokio::test]
async fn test_catalog_outage_is_server_error() {
    let (app, state) = setup_app(true, None, "").await;

    let response = app
        .oneshot(json_request("POST", CLUSTER_URI, cluster_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let problem: Problem = read_json(response).await;
    assert_eq!(problem.title, RECOMMENDATION_PROBLEM);
    assert_eq!(problem.detail, "failed to connect to the cloud info service");

    let health = state.health_registry.health().await;
    assert_eq!(health.components[components::CATALOG].status, ComponentStatus::Degraded);
}

#[tokio::test]
async fn test_scale_out_already_satisfied() {
    let (app, _) = setup_app(false, None, "").await;

    let body = json!({
        "desiredCpu": 4,
        "desiredMem": 16,
        "onDemandPct": 0,
        "actualLayout": [
            {"instanceType": "m5.2xlarge", "vmClass": "spot", "sumNodes": 2}
        ]
    });
    let response = app
        .oneshot(json_request("PUT", CLUSTER_URI, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let problem: Problem = read_json(response).await;
    assert_eq!(problem.title, RECOMMENDATION_PROBLEM);
    assert!(problem.detail.contains("already enough resources"));
}

#[tokio::test]
async fn test_scale_out_extends_layout() {
    let (app, _) = setup_app(false, None, "").await;

    let body = json!({
        "desiredCpu": 24,
        "desiredMem": 96,
        "onDemandPct": 50,
        "actualLayout": [
            {"instanceType": "m5.xlarge", "vmClass": "ondemand", "sumNodes": 2},
            {"instanceType": "m5.large", "vmClass": "spot", "sumNodes": 2}
        ]
    });
    let response = app
        .oneshot(json_request("PUT", CLUSTER_URI, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let rec: ClusterRecommendationResponse = read_json(response).await;
    let regular = rec
        .node_pools
        .iter()
        .find(|p| p.vm_class == VmClass::Regular)
        .unwrap();
    assert_eq!(regular.vm_type.instance_type, "m5.xlarge");
    assert!(regular.sum_nodes >= 2);
}

#[tokio::test]
async fn test_token_required_when_configured() {
    let (app, _) = setup_app(false, Some("s3cret"), "").await;

    let response = app
        .clone()
        .oneshot(json_request("POST", CLUSTER_URI, cluster_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let mut request = json_request("POST", CLUSTER_URI, cluster_body());
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer s3cret".parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // status stays public
    let response = app
        .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_status_and_version() {
    let (app, state) = setup_app(false, None, "").await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let health: HealthResponse = read_json(response).await;
    assert!(health.components.contains_key(components::ENGINE));

    state
        .health_registry
        .set_unhealthy(components::ENGINE, "stopped")
        .await;
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app
        .oneshot(Request::builder().uri("/version").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let version: serde_json::Value = read_json(response).await;
    assert_eq!(version["version"], recommender_lib::VERSION);
}

#[tokio::test]
async fn test_base_path_prefix() {
    let (app, _) = setup_app(false, None, "/api/v1").await;

    let response = app
        .clone()
        .oneshot(json_request("POST", &format!("/api/v1{CLUSTER_URI}"), cluster_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(json_request("POST", CLUSTER_URI, cluster_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_multicloud() {
    let (app, _) = setup_app(false, None, "").await;

    let body = json!({
        "providers": [{"provider": "amazon", "services": ["compute"]}],
        "continents": [],
        "request": {"sumCpu": 16, "sumMem": 64, "minNodes": 2, "maxNodes": 8, "onDemandPct": 25},
        "respPerService": 3
    });
    let response = app
        .oneshot(json_request("POST", "/recommender/multicloud", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let recs: MultiClusterResponse = read_json(response).await;
    // us-east-1 has no product details and is skipped
    assert_eq!(recs["compute"].len(), 1);
    assert_eq!(recs["compute"][0].region, "eu-west-1");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup_app(false, None, "").await;
    app.oneshot(json_request("POST", CLUSTER_URI, cluster_body()))
        .await
        .unwrap();

    let response = create_metrics_router()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("cluster_recommender_requests_total"));
}
