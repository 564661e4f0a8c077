//! Error kinds surfaced by the recommender
//!
//! The set is closed; the HTTP edge maps each kind to a problem document.

use crate::models::{Attribute, CatalogTarget};
use thiserror::Error;

/// Context tags attached to errors
pub mod tags {
    pub const VALIDATION: &str = "validation";
    pub const RECOMMENDER: &str = "recommender";
    pub const ATTRIBUTES: &str = "attributes";
    pub const SCALE_OUT: &str = "scale-out";
    pub const CLOUD_INFO: &str = "cloud-info";
    pub const CLOUD_INFO_CLIENT: &str = "cloud-info-client";
}

#[derive(Debug, Error)]
pub enum RecommenderError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("failed to connect to the cloud info service: {0}")]
    CatalogUnavailable(String),

    #[error("no cloud information available for {target}: {reason}")]
    CatalogNotFound { target: CatalogTarget, reason: String },

    #[error("no {0} values available in the catalog")]
    NoAttributeValues(Attribute),

    #[error("could not recommend cluster with the requested resources")]
    NoFeasiblePlan,

    #[error("there are already enough resources in the cluster (cpu: {cpu}, memory: {memory})")]
    AlreadySatisfied { cpu: f64, memory: f64 },

    #[error("couldn't scale out cluster to reach {on_demand_pct}% on-demand {attribute}")]
    RatioInfeasible {
        attribute: Attribute,
        on_demand_pct: u8,
    },

    #[error("request cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl RecommenderError {
    /// Context tags used to classify the error at the edge
    pub fn tags(&self) -> &'static [&'static str] {
        match self {
            RecommenderError::Validation(_) => &[tags::VALIDATION],
            RecommenderError::CatalogUnavailable(_) => &[tags::CLOUD_INFO_CLIENT],
            RecommenderError::CatalogNotFound { .. } => &[tags::CLOUD_INFO],
            RecommenderError::NoAttributeValues(_) => &[tags::RECOMMENDER, tags::ATTRIBUTES],
            RecommenderError::NoFeasiblePlan => &[tags::RECOMMENDER],
            RecommenderError::AlreadySatisfied { .. } | RecommenderError::RatioInfeasible { .. } => {
                &[tags::RECOMMENDER, tags::SCALE_OUT]
            }
            RecommenderError::Cancelled | RecommenderError::Internal(_) => &[],
        }
    }

    /// Whether the error carries the given context tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags().contains(&tag)
    }

    /// Stable label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            RecommenderError::Validation(_) => "validation",
            RecommenderError::CatalogUnavailable(_) => "catalog_unavailable",
            RecommenderError::CatalogNotFound { .. } => "catalog_not_found",
            RecommenderError::NoAttributeValues(_) => "no_attribute_values",
            RecommenderError::NoFeasiblePlan => "no_feasible_plan",
            RecommenderError::AlreadySatisfied { .. } => "already_satisfied",
            RecommenderError::RatioInfeasible { .. } => "ratio_infeasible",
            RecommenderError::Cancelled => "cancelled",
            RecommenderError::Internal(_) => "internal",
        }
    }
}

pub type RecommenderResult<T> = Result<T, RecommenderError>;
