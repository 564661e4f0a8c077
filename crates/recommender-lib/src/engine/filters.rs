//! Virtual machine filter chain
//!
//! Builds the predicate list for a target attribute and provider, and splits
//! the surviving VMs into on-demand and spot candidates.

use crate::models::{Attribute, ClusterRecommendationRequest, NodePool, VirtualMachine, VmClass};
use tracing::debug;

/// Predicate over a VM in the context of a request
pub type FilterFn = fn(&VirtualMachine, &ClusterRecommendationRequest) -> bool;

/// Named predicate, the name is only used for logging
#[derive(Clone, Copy)]
pub struct VmFilter {
    pub name: &'static str,
    pub apply: FilterFn,
}

impl std::fmt::Debug for VmFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

const fn filter(name: &'static str, apply: FilterFn) -> VmFilter {
    VmFilter { name, apply }
}

/// Provider specific predicates
pub struct FilterPolicy {
    pub provider: &'static str,
    pub filters: &'static [VmFilter],
}

/// Strategy table keyed by provider name
pub const FILTER_POLICIES: &[FilterPolicy] = &[FilterPolicy {
    provider: "amazon",
    filters: &[
        filter("burst", burst_filter),
        filter("current_gen", current_gen_filter),
    ],
}];

const GENERIC_FILTERS: &[VmFilter] = &[
    filter("includes", includes_filter),
    filter("excludes", excludes_filter),
    filter("include_series", include_series_filter),
    filter("exclude_series", exclude_series_filter),
    filter("category", category_filter),
    filter("zone", zone_filter),
    filter("network_perf", network_perf_filter),
];

const CPU_FILTERS: &[VmFilter] = &[
    filter("positive_cpu", positive_cpu_filter),
    filter("min_mem_ratio", min_mem_ratio_filter),
];

const MEMORY_FILTERS: &[VmFilter] = &[
    filter("positive_memory", positive_memory_filter),
    filter("min_cpu_ratio", min_cpu_ratio_filter),
];

/// Predicates for the provider, or none when it has no policy
pub fn provider_filters(provider: &str) -> &'static [VmFilter] {
    FILTER_POLICIES
        .iter()
        .find(|policy| policy.provider == provider)
        .map(|policy| policy.filters)
        .unwrap_or(&[])
}

/// Full predicate list: generic, provider specific, then attribute specific
pub fn filters_for(attr: Attribute, provider: &str) -> Vec<VmFilter> {
    let attribute_filters = match attr {
        Attribute::Cpu => CPU_FILTERS,
        Attribute::Memory => MEMORY_FILTERS,
    };
    GENERIC_FILTERS
        .iter()
        .chain(provider_filters(provider))
        .chain(attribute_filters)
        .copied()
        .collect()
}

/// Whether the VM passes every predicate
pub fn passes(vm: &VirtualMachine, filters: &[VmFilter], req: &ClusterRecommendationRequest) -> bool {
    filters.iter().all(|f| {
        let ok = (f.apply)(vm, req);
        if !ok {
            debug!(vm_type = %vm.instance_type, filter = f.name, "VM filtered out");
        }
        ok
    })
}

/// VMs passing the chain for the attribute and provider
pub fn filter_vms(
    attr: Attribute,
    provider: &str,
    vms: &[VirtualMachine],
    req: &ClusterRecommendationRequest,
) -> Vec<VirtualMachine> {
    let filters = filters_for(attr, provider);
    vms.iter()
        .filter(|vm| passes(vm, &filters, req))
        .cloned()
        .collect()
}

/// On-demand and spot candidates for one attribute
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidates {
    pub on_demand: Vec<VirtualMachine>,
    pub spot: Vec<VirtualMachine>,
}

impl Candidates {
    /// Whether planning for the attribute has to be skipped
    pub fn insufficient(&self, on_demand_pct: u8) -> bool {
        (self.on_demand.is_empty() && on_demand_pct > 0)
            || (self.spot.is_empty() && on_demand_pct < 100)
    }
}

/// Filter the VMs and classify them as on-demand or spot candidates
///
/// With a layout only its types are candidates, in the class of their pool.
pub fn recommend_vms(
    attr: Attribute,
    provider: &str,
    vms: &[VirtualMachine],
    req: &ClusterRecommendationRequest,
    layout: Option<&[NodePool]>,
) -> Candidates {
    let filtered = filter_vms(attr, provider, vms, req);
    if filtered.is_empty() {
        debug!(attribute = %attr, "No virtual machines passed the filters");
        return Candidates::default();
    }

    let mut candidates = match layout {
        None => Candidates {
            on_demand: filtered.clone(),
            spot: filtered,
        },
        Some(pools) => {
            let mut candidates = Candidates::default();
            for pool in pools {
                if let Some(vm) = filtered
                    .iter()
                    .find(|vm| vm.instance_type == pool.vm_type.instance_type)
                {
                    match pool.vm_class {
                        VmClass::Regular => candidates.on_demand.push(vm.clone()),
                        VmClass::Spot => candidates.spot.push(vm.clone()),
                    }
                }
            }
            candidates
        }
    };

    if req.on_demand_pct < 100 {
        candidates.spot.retain(VirtualMachine::has_spot_market);
        if candidates.spot.is_empty() {
            debug!(attribute = %attr, "No virtual machines suitable for spot pools");
            return Candidates::default();
        }
    }

    candidates
}

fn contains(list: &[String], value: &str) -> bool {
    list.iter().any(|item| item == value)
}

fn includes_filter(vm: &VirtualMachine, req: &ClusterRecommendationRequest) -> bool {
    req.includes.is_empty() || contains(&req.includes, &vm.instance_type)
}

fn excludes_filter(vm: &VirtualMachine, req: &ClusterRecommendationRequest) -> bool {
    !contains(&req.excludes, &vm.instance_type)
}

fn include_series_filter(vm: &VirtualMachine, req: &ClusterRecommendationRequest) -> bool {
    req.include_series.is_empty() || contains(&req.include_series, &vm.series)
}

fn exclude_series_filter(vm: &VirtualMachine, req: &ClusterRecommendationRequest) -> bool {
    !contains(&req.exclude_series, &vm.series)
}

fn category_filter(vm: &VirtualMachine, req: &ClusterRecommendationRequest) -> bool {
    req.category.is_empty() || contains(&req.category, &vm.category)
}

fn zone_filter(vm: &VirtualMachine, req: &ClusterRecommendationRequest) -> bool {
    match &req.zone {
        Some(zone) if !vm.zones.is_empty() => contains(&vm.zones, zone),
        _ => true,
    }
}

fn network_perf_filter(vm: &VirtualMachine, req: &ClusterRecommendationRequest) -> bool {
    req.network_perf.is_empty() || req.network_perf.contains(&vm.network_perf_category)
}

fn burst_filter(vm: &VirtualMachine, req: &ClusterRecommendationRequest) -> bool {
    req.allow_burst.unwrap_or(true) || !vm.burst
}

fn current_gen_filter(vm: &VirtualMachine, req: &ClusterRecommendationRequest) -> bool {
    req.allow_older_gen.unwrap_or(false) || vm.current_gen
}

fn positive_cpu_filter(vm: &VirtualMachine, _req: &ClusterRecommendationRequest) -> bool {
    vm.cpus > 0.0
}

fn positive_memory_filter(vm: &VirtualMachine, _req: &ClusterRecommendationRequest) -> bool {
    vm.memory > 0.0
}

// NaN and infinite floors reject every VM
fn min_mem_ratio_filter(vm: &VirtualMachine, req: &ClusterRecommendationRequest) -> bool {
    let floor = req.sum_mem / req.sum_cpu;
    vm.allocatable_memory / vm.allocatable_cpus >= floor
}

fn min_cpu_ratio_filter(vm: &VirtualMachine, req: &ClusterRecommendationRequest) -> bool {
    let floor = req.sum_cpu / req.sum_mem;
    vm.allocatable_cpus / vm.allocatable_memory >= floor
}
