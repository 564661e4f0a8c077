//! Plan selection and accuracy reporting

use crate::error::{RecommenderError, RecommenderResult};
use crate::models::{Attribute, ClusterRecommendationAccuracy, NodePool, VmClass};
use tracing::debug;

/// Node pools recommended for one attribute
#[derive(Debug, Clone, PartialEq)]
pub struct AttributePlan {
    pub attribute: Attribute,
    pub node_pools: Vec<NodePool>,
}

impl AttributePlan {
    pub fn new(attribute: Attribute, node_pools: Vec<NodePool>) -> Self {
        Self {
            attribute,
            node_pools,
        }
    }

    /// Hourly price of every pool in the plan
    pub fn price(&self) -> f64 {
        self.node_pools.iter().map(NodePool::price).sum()
    }
}

/// Pick the cheapest plan; an earlier plan wins on equal price
pub fn select_cheapest_plan(plans: Vec<AttributePlan>) -> RecommenderResult<AttributePlan> {
    let mut best: Option<(f64, AttributePlan)> = None;
    for plan in plans {
        let price = plan.price();
        debug!(attribute = %plan.attribute, price, pools = plan.node_pools.len(), "Evaluated plan");
        match &best {
            Some((best_price, _)) if price >= *best_price => {}
            _ => best = Some((price, plan)),
        }
    }
    best.map(|(_, plan)| plan)
        .ok_or(RecommenderError::NoFeasiblePlan)
}

/// Summarize what a set of node pools provides and costs
pub fn accuracy(node_pools: &[NodePool], zones: &[String]) -> ClusterRecommendationAccuracy {
    let mut acc = ClusterRecommendationAccuracy {
        zones: zones.to_vec(),
        ..Default::default()
    };

    for pool in node_pools {
        let nodes = f64::from(pool.sum_nodes);
        acc.rec_cpu += nodes * pool.vm_type.cpus;
        acc.rec_mem += nodes * pool.vm_type.memory;
        acc.rec_nodes += pool.sum_nodes;
        let price = pool.price();
        match pool.vm_class {
            VmClass::Regular => {
                acc.regular_price += price;
                acc.regular_nodes += pool.sum_nodes;
            }
            VmClass::Spot => {
                acc.spot_price += price;
                acc.spot_nodes += pool.sum_nodes;
            }
        }
        acc.total_price += price;
    }

    acc
}
