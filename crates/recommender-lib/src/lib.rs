//! Cluster layout recommender library
//!
//! This crate provides the core functionality for:
//! - Product catalog access with caching
//! - Cost-optimized node pool recommendation and scale-out
//! - Multi-cluster fan-out across providers and regions
//! - Request validation
//! - Health checks and observability

pub mod catalog;
pub mod engine;
pub mod error;
pub mod health;
pub mod models;
pub mod multicloud;
pub mod observability;
pub mod validation;

pub use catalog::{CachedCatalog, CatalogProvider, CloudInfoClient};
pub use engine::{Cancellation, Engine};
pub use error::{RecommenderError, RecommenderResult};
pub use health::{ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse};
pub use models::*;
pub use observability::{RecommenderMetrics, StructuredLogger};

/// Version of the recommender
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
