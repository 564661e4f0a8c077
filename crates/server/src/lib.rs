//! Cluster recommender HTTP service
//!
//! Exposes the recommendation engine over axum with problem documents for
//! errors, optional bearer authentication and a Prometheus endpoint.

pub mod api;
pub mod config;
pub mod problem;
