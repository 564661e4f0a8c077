//! Cluster Recommender - cost-optimized node pool recommendations
//!
//! Serves the recommender API backed by a cloud info service, plus a
//! Prometheus endpoint on a separate listener.

use anyhow::{Context, Result};
use cluster_recommender::{api, config::AppConfig};
use recommender_lib::{
    health::{components, HealthRegistry},
    CachedCatalog, CloudInfoClient, Engine, RecommenderMetrics, StructuredLogger, VERSION,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.log_format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config);

    info!("Starting cluster-recommender");
    info!(
        listen_address = %config.listen_address,
        cloud_info_address = %config.cloud_info_address,
        dev_mode = config.dev_mode,
        base_path = %config.base_path,
        "Recommender configured"
    );

    let client = CloudInfoClient::new(&config.cloud_info_address, config.catalog_timeout())
        .context("Failed to create cloud info client")?;
    let catalog = Arc::new(CachedCatalog::new(Arc::new(client), config.catalog_cache_ttl()));
    let engine = Engine::new(catalog.clone()).with_catalog_timeout(config.catalog_timeout());

    let health_registry = HealthRegistry::new();
    health_registry.register(components::CATALOG).await;
    health_registry.register(components::ENGINE).await;

    let metrics = RecommenderMetrics::new();
    let logger = StructuredLogger::new(config.listen_address.clone());
    logger.log_startup(VERSION, &config.listen_address, &config.cloud_info_address);

    if config.required_token().is_none() && !config.dev_mode {
        warn!("No API token configured, recommender routes are unauthenticated");
    }

    let app_state = Arc::new(api::AppState::new(
        engine,
        health_registry,
        metrics,
        logger.clone(),
        config.required_token(),
    ));

    // Expired product details are dropped once per time to live
    let purge_catalog = catalog.clone();
    let ttl = config.catalog_cache_ttl().max(std::time::Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(ttl);
        loop {
            interval.tick().await;
            purge_catalog.purge_expired();
        }
    });

    if config.metrics_enabled {
        let metrics_address = config.metrics_address.clone();
        tokio::spawn(async move {
            let app = api::create_metrics_router();
            if let Err(err) = api::serve(&metrics_address, app, std::future::pending()).await {
                warn!(error = %err, "Metrics server stopped");
            }
        });
    }

    let shutdown = app_state.shutdown.clone();
    let health = app_state.health_registry.clone();
    let router = api::create_router(app_state, &config.base_path);
    api::serve(&config.listen_address, router, async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for shutdown signal");
        }
        logger.log_shutdown("SIGINT received");
        health
            .set_unhealthy(components::ENGINE, "shutting down")
            .await;
        shutdown.cancel();
    })
    .await?;

    info!("Shut down");
    Ok(())
}
