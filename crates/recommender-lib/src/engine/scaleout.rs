//! Scale-out over an existing cluster layout
//!
//! Turns a scale-out request into per-attribute recommendation requests that
//! only cover the missing capacity, with the on-demand share recomputed so
//! the whole cluster ends up at the requested ratio.

use crate::error::{RecommenderError, RecommenderResult};
use crate::models::{
    Attribute, ClusterRecommendationRequest, ClusterScaleOutRequest, NodePool,
    NodePoolDescription, VirtualMachine, VmClass,
};
use tracing::debug;

/// Resources already present in the layout
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutTotals {
    pub cpu: f64,
    pub memory: f64,
    pub on_demand_cpu: f64,
    pub on_demand_memory: f64,
}

impl LayoutTotals {
    pub fn from_pools(pools: &[NodePool]) -> Self {
        let mut totals = Self::default();
        for pool in pools {
            let cpu = pool.sum(Attribute::Cpu);
            let memory = pool.sum(Attribute::Memory);
            totals.cpu += cpu;
            totals.memory += memory;
            if pool.vm_class == VmClass::Regular {
                totals.on_demand_cpu += cpu;
                totals.on_demand_memory += memory;
            }
        }
        totals
    }

    pub fn current(&self, attr: Attribute) -> f64 {
        match attr {
            Attribute::Cpu => self.cpu,
            Attribute::Memory => self.memory,
        }
    }

    pub fn current_on_demand(&self, attr: Attribute) -> f64 {
        match attr {
            Attribute::Cpu => self.on_demand_cpu,
            Attribute::Memory => self.on_demand_memory,
        }
    }
}

fn desired(attr: Attribute, req: &ClusterScaleOutRequest) -> f64 {
    match attr {
        Attribute::Cpu => req.desired_cpu,
        Attribute::Memory => req.desired_mem,
    }
}

/// Resolve layout descriptions against the catalog
pub fn resolve_layout(
    layout: &[NodePoolDescription],
    vms: &[VirtualMachine],
) -> RecommenderResult<Vec<NodePool>> {
    layout
        .iter()
        .map(|desc| {
            vms.iter()
                .find(|vm| vm.instance_type == desc.instance_type)
                .map(|vm| NodePool::new(vm.clone(), desc.sum_nodes, desc.vm_class))
                .ok_or_else(|| {
                    RecommenderError::Validation(format!(
                        "instance type {} of the actual layout is not offered in the region",
                        desc.instance_type
                    ))
                })
        })
        .collect()
}

/// Fail when the layout already provides the desired resources
pub fn ensure_scale_out_needed(
    req: &ClusterScaleOutRequest,
    totals: &LayoutTotals,
) -> RecommenderResult<()> {
    let cpu = req.desired_cpu - totals.cpu;
    let memory = req.desired_mem - totals.memory;
    if cpu <= 0.0 && memory <= 0.0 {
        return Err(RecommenderError::AlreadySatisfied {
            cpu: totals.cpu,
            memory: totals.memory,
        });
    }
    Ok(())
}

/// On-demand percentage of the added capacity for one attribute
///
/// `Ok(None)` means the attribute needs no scale-out.
pub fn scale_out_on_demand_pct(
    attr: Attribute,
    req: &ClusterScaleOutRequest,
    totals: &LayoutTotals,
) -> RecommenderResult<Option<u8>> {
    let scale_out = desired(attr, req) - totals.current(attr);
    let desired_od = desired(attr, req) * f64::from(req.on_demand_pct) / 100.0;
    let missing_od = desired_od - totals.current_on_demand(attr);

    let infeasible = || RecommenderError::RatioInfeasible {
        attribute: attr,
        on_demand_pct: req.on_demand_pct,
    };

    if scale_out <= 0.0 {
        if missing_od > 0.0 {
            return Err(infeasible());
        }
        return Ok(None);
    }

    let pct = (missing_od / scale_out * 100.0).max(0.0);
    debug!(attribute = %attr, scale_out, missing_od, pct, "Computed scale-out on-demand share");
    if pct > 100.0 {
        return Err(infeasible());
    }
    Ok(Some(pct.ceil().min(100.0) as u8))
}

/// Recommendation request covering the missing capacity for one attribute
pub fn scale_out_request(
    attr: Attribute,
    req: &ClusterScaleOutRequest,
    totals: &LayoutTotals,
) -> RecommenderResult<Option<ClusterRecommendationRequest>> {
    let Some(on_demand_pct) = scale_out_on_demand_pct(attr, req, totals)? else {
        return Ok(None);
    };

    Ok(Some(ClusterRecommendationRequest {
        sum_cpu: (req.desired_cpu - totals.cpu).max(0.0),
        sum_mem: (req.desired_mem - totals.memory).max(0.0),
        sum_gpu: req.desired_gpu,
        min_nodes: 1,
        max_nodes: u32::MAX,
        on_demand_pct,
        allow_burst: Some(true),
        allow_older_gen: Some(true),
        zone: req.zone.clone(),
        includes: req
            .actual_layout
            .iter()
            .map(|desc| desc.instance_type.clone())
            .collect(),
        excludes: req.excludes.clone(),
        ..Default::default()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NetworkPerfCategory;

    fn vm(instance_type: &str, cpus: f64, memory: f64) -> VirtualMachine {
        VirtualMachine {
            instance_type: instance_type.to_string(),
            series: String::new(),
            category: String::new(),
            cpus,
            memory,
            allocatable_cpus: cpus,
            allocatable_memory: memory,
            gpus: 0.0,
            on_demand_price: 0.2,
            avg_price: 0.05,
            burst: false,
            current_gen: true,
            zones: Vec::new(),
            network_perf: String::new(),
            network_perf_category: NetworkPerfCategory::Medium,
        }
    }

    fn desc(instance_type: &str, vm_class: VmClass, sum_nodes: u32) -> NodePoolDescription {
        NodePoolDescription {
            instance_type: instance_type.to_string(),
            vm_class,
            sum_nodes,
        }
    }

    fn request(cpu: f64, mem: f64, pct: u8, layout: Vec<NodePoolDescription>) -> ClusterScaleOutRequest {
        ClusterScaleOutRequest {
            desired_cpu: cpu,
            desired_mem: mem,
            desired_gpu: 0,
            on_demand_pct: pct,
            zone: None,
            excludes: Vec::new(),
            actual_layout: layout,
        }
    }

    #[test]
    fn test_resolve_unknown_type() {
        let err = resolve_layout(&[desc("x1.huge", VmClass::Spot, 1)], &[vm("m5.large", 2.0, 8.0)])
            .unwrap_err();
        assert!(matches!(err, RecommenderError::Validation(_)));
    }

    #[test]
    fn test_totals_split_on_demand() {
        let vms = [vm("m5.large", 2.0, 8.0), vm("c5.xlarge", 4.0, 8.0)];
        let pools = resolve_layout(
            &[desc("m5.large", VmClass::Regular, 2), desc("c5.xlarge", VmClass::Spot, 3)],
            &vms,
        )
        .unwrap();
        let totals = LayoutTotals::from_pools(&pools);
        assert_eq!(totals.cpu, 16.0);
        assert_eq!(totals.memory, 40.0);
        assert_eq!(totals.on_demand_cpu, 4.0);
        assert_eq!(totals.on_demand_memory, 16.0);
    }

    #[test]
    fn test_already_satisfied() {
        let totals = LayoutTotals {
            cpu: 32.0,
            memory: 64.0,
            ..Default::default()
        };
        let err = ensure_scale_out_needed(&request(16.0, 16.0, 0, Vec::new()), &totals).unwrap_err();
        assert!(matches!(
            err,
            RecommenderError::AlreadySatisfied { cpu, memory } if cpu == 32.0 && memory == 64.0
        ));
    }

    #[test]
    fn test_ratio_infeasible_without_cpu_scale_out() {
        let totals = LayoutTotals {
            cpu: 16.0,
            memory: 32.0,
            ..Default::default()
        };
        let req = request(16.0, 64.0, 100, Vec::new());

        let err = scale_out_on_demand_pct(Attribute::Cpu, &req, &totals).unwrap_err();
        assert!(matches!(
            err,
            RecommenderError::RatioInfeasible { attribute: Attribute::Cpu, on_demand_pct: 100 }
        ));
        // 64 on-demand GiB wanted, only 32 added
        assert!(scale_out_on_demand_pct(Attribute::Memory, &req, &totals).is_err());
    }

    #[test]
    fn test_on_demand_share_of_added_capacity() {
        let totals = LayoutTotals {
            cpu: 10.0,
            memory: 40.0,
            on_demand_cpu: 5.0,
            on_demand_memory: 20.0,
        };
        let req = request(20.0, 80.0, 50, Vec::new());
        assert_eq!(scale_out_on_demand_pct(Attribute::Cpu, &req, &totals).unwrap(), Some(50));

        // more on-demand than needed already
        let totals = LayoutTotals {
            on_demand_cpu: 10.0,
            ..totals
        };
        assert_eq!(scale_out_on_demand_pct(Attribute::Cpu, &req, &totals).unwrap(), Some(0));
    }

    #[test]
    fn test_attribute_without_scale_out_is_skipped() {
        let totals = LayoutTotals {
            cpu: 32.0,
            memory: 32.0,
            ..Default::default()
        };
        let req = request(16.0, 64.0, 0, Vec::new());
        assert_eq!(scale_out_request(Attribute::Cpu, &req, &totals).unwrap(), None);
    }

    #[test]
    fn test_scale_out_request_shape() {
        let totals = LayoutTotals {
            cpu: 8.0,
            memory: 32.0,
            ..Default::default()
        };
        let mut req = request(
            16.0,
            48.0,
            0,
            vec![desc("m5.large", VmClass::Spot, 4)],
        );
        req.zone = Some("eu-west-1a".into());
        req.excludes = vec!["t2.micro".into()];

        let rec = scale_out_request(Attribute::Cpu, &req, &totals).unwrap().unwrap();
        assert_eq!(rec.sum_cpu, 8.0);
        assert_eq!(rec.sum_mem, 16.0);
        assert_eq!(rec.min_nodes, 1);
        assert_eq!(rec.max_nodes, u32::MAX);
        assert_eq!(rec.includes, vec!["m5.large".to_string()]);
        assert_eq!(rec.excludes, vec!["t2.micro".to_string()]);
        assert_eq!(rec.allow_burst, Some(true));
        assert_eq!(rec.allow_older_gen, Some(true));
        assert_eq!(rec.zone.as_deref(), Some("eu-west-1a"));
    }
}
