//! Core data models for the cluster recommender
//!
//! Wire names follow the camelCase JSON used by the HTTP API and by the
//! cloud info catalog.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Planning dimension of the recommender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    Cpu,
    Memory,
}

impl Attribute {
    /// Attributes in evaluation order
    pub const ALL: [Attribute; 2] = [Attribute::Cpu, Attribute::Memory];

    /// Nominal value of this attribute for a virtual machine
    pub fn value(&self, vm: &VirtualMachine) -> f64 {
        match self {
            Attribute::Cpu => vm.cpus,
            Attribute::Memory => vm.memory,
        }
    }

    /// Requested cluster-wide sum of this attribute
    pub fn requested(&self, req: &ClusterRecommendationRequest) -> f64 {
        match self {
            Attribute::Cpu => req.sum_cpu,
            Attribute::Memory => req.sum_mem,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::Cpu => "cpu",
            Attribute::Memory => "memory",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network performance category reported by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkPerfCategory {
    Low,
    Medium,
    High,
    Extra,
}

/// A catalog entry describing an instance type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachine {
    #[serde(rename = "type")]
    pub instance_type: String,
    #[serde(default)]
    pub series: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "cpusPerVm")]
    pub cpus: f64,
    #[serde(rename = "memPerVm")]
    pub memory: f64,
    pub allocatable_cpus: f64,
    pub allocatable_memory: f64,
    #[serde(rename = "gpusPerVm", default)]
    pub gpus: f64,
    pub on_demand_price: f64,
    /// Average spot price, zero when the type has no spot market
    pub avg_price: f64,
    #[serde(default)]
    pub burst: bool,
    #[serde(default)]
    pub current_gen: bool,
    /// Availability zones, empty when unrestricted
    #[serde(default)]
    pub zones: Vec<String>,
    #[serde(default)]
    pub network_perf: String,
    #[serde(rename = "networkPerfCategory")]
    pub network_perf_category: NetworkPerfCategory,
}

impl VirtualMachine {
    /// Whether the type can back a spot pool
    pub fn has_spot_market(&self) -> bool {
        self.avg_price != 0.0
    }
}

/// Pricing class of a node pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VmClass {
    #[serde(alias = "ondemand")]
    Regular,
    Spot,
}

impl VmClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            VmClass::Regular => "regular",
            VmClass::Spot => "spot",
        }
    }
}

/// Role of a node pool in the cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Master,
    #[default]
    Worker,
}

/// A recommended set of homogeneous nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePool {
    #[serde(rename = "vm")]
    pub vm_type: VirtualMachine,
    pub sum_nodes: u32,
    pub vm_class: VmClass,
    #[serde(default)]
    pub role: Role,
}

impl NodePool {
    pub fn new(vm_type: VirtualMachine, sum_nodes: u32, vm_class: VmClass) -> Self {
        Self {
            vm_type,
            sum_nodes,
            vm_class,
            role: Role::Worker,
        }
    }

    /// Total amount of the attribute provided by the pool
    pub fn sum(&self, attr: Attribute) -> f64 {
        f64::from(self.sum_nodes) * attr.value(&self.vm_type)
    }

    /// Amount of the attribute the pool would provide with one more node
    pub fn next_sum(&self, attr: Attribute) -> f64 {
        self.sum(attr) + attr.value(&self.vm_type)
    }

    /// Hourly price of the pool
    pub fn price(&self) -> f64 {
        let unit = match self.vm_class {
            VmClass::Regular => self.vm_type.on_demand_price,
            VmClass::Spot => self.vm_type.avg_price,
        };
        f64::from(self.sum_nodes) * unit
    }
}

/// Single cluster recommendation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRecommendationRequest {
    /// Total number of CPUs requested for the cluster
    pub sum_cpu: f64,
    /// Total memory requested for the cluster (GiB)
    pub sum_mem: f64,
    #[serde(default)]
    pub sum_gpu: u32,
    #[serde(default = "default_min_nodes")]
    pub min_nodes: u32,
    /// `u32::MAX` stands for an unbounded node count
    #[serde(default = "default_max_nodes")]
    pub max_nodes: u32,
    /// Percentage of regular (on-demand) resources
    #[serde(default)]
    pub on_demand_pct: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_burst: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_older_gen: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network_perf: Vec<NetworkPerfCategory>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    /// Whitelist of instance types
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,
    /// Blacklist of instance types
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_series: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_series: Vec<String>,
}

fn default_min_nodes() -> u32 {
    1
}

fn default_max_nodes() -> u32 {
    1
}

impl Default for ClusterRecommendationRequest {
    fn default() -> Self {
        Self {
            sum_cpu: 0.0,
            sum_mem: 0.0,
            sum_gpu: 0,
            min_nodes: default_min_nodes(),
            max_nodes: default_max_nodes(),
            on_demand_pct: 0,
            allow_burst: None,
            allow_older_gen: None,
            network_perf: Vec::new(),
            category: Vec::new(),
            zone: None,
            includes: Vec::new(),
            excludes: Vec::new(),
            include_series: Vec::new(),
            exclude_series: Vec::new(),
        }
    }
}

impl ClusterRecommendationRequest {
    /// Zones echoed back in the response
    pub fn zones(&self) -> Vec<String> {
        self.zone.iter().cloned().collect()
    }
}

/// Description of an existing node pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolDescription {
    pub instance_type: String,
    pub vm_class: VmClass,
    pub sum_nodes: u32,
}

/// Scale-out request over an existing layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterScaleOutRequest {
    /// Total desired number of CPUs after the scale out
    pub desired_cpu: f64,
    /// Total desired memory (GiB) after the scale out
    pub desired_mem: f64,
    #[serde(default)]
    pub desired_gpu: u32,
    #[serde(default)]
    pub on_demand_pct: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<String>,
    pub actual_layout: Vec<NodePoolDescription>,
}

/// Summary of a recommended layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRecommendationAccuracy {
    #[serde(rename = "cpu")]
    pub rec_cpu: f64,
    #[serde(rename = "memory")]
    pub rec_mem: f64,
    #[serde(rename = "nodes")]
    pub rec_nodes: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,
    pub regular_price: f64,
    pub regular_nodes: u32,
    pub spot_price: f64,
    pub spot_nodes: u32,
    pub total_price: f64,
}

/// Recommended layout for a single cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRecommendationResponse {
    pub provider: String,
    pub service: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,
    pub node_pools: Vec<NodePool>,
    pub accuracy: ClusterRecommendationAccuracy,
}

/// Provider/service/region triple a recommendation targets
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogTarget {
    pub provider: String,
    pub service: String,
    pub region: String,
}

impl CatalogTarget {
    pub fn new(
        provider: impl Into<String>,
        service: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            service: service.into(),
            region: region.into(),
        }
    }
}

impl fmt::Display for CatalogTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.provider, self.service, self.region)
    }
}

/// Region as reported by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continent: Option<String>,
}

/// Services of one provider taking part in a multi-cluster request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderServices {
    pub provider: String,
    pub services: Vec<String>,
}

/// Multi-cluster recommendation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiClusterRequest {
    pub providers: Vec<ProviderServices>,
    #[serde(default)]
    pub continents: Vec<String>,
    pub request: ClusterRecommendationRequest,
    /// Maximum number of responses per service
    pub resp_per_service: usize,
}

/// Recommendations grouped by service, cheapest first
pub type MultiClusterResponse = HashMap<String, Vec<ClusterRecommendationResponse>>;

#[cfg(test)]
mod tests {
    use super::*;

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
            on_demand_price: 1.0,
            avg_price: 0.5,
            burst: false,
            current_gen: true,
            zones: Vec::new(),
            network_perf: String::new(),
            network_perf_category: NetworkPerfCategory::Medium,
        }
    }

    #[test]
    fn test_pool_price_by_class() {
        let mut vm = vm("m5.large", 2.0, 8.0);
        vm.on_demand_price = 0.1;
        vm.avg_price = 0.04;

        let regular = NodePool::new(vm.clone(), 3, VmClass::Regular);
        let spot = NodePool::new(vm, 3, VmClass::Spot);

        assert!((regular.price() - 0.3).abs() < 1e-9);
        assert!((spot.price() - 0.12).abs() < 1e-9);
    }

    #[test]
    fn test_pool_sums() {
        let pool = NodePool::new(vm("c5.xlarge", 4.0, 8.0), 2, VmClass::Spot);
        assert_eq!(pool.sum(Attribute::Cpu), 8.0);
        assert_eq!(pool.sum(Attribute::Memory), 16.0);
        assert_eq!(pool.next_sum(Attribute::Cpu), 12.0);
    }

    #[test]
    fn test_vm_class_accepts_ondemand_alias() {
        let desc: NodePoolDescription = serde_json::from_str(
            r#"{"instanceType":"m5.large","vmClass":"ondemand","sumNodes":2}"#,
        )
        .unwrap();
        assert_eq!(desc.vm_class, VmClass::Regular);
    }

    #[test]
    fn test_request_defaults() {
        let req: ClusterRecommendationRequest =
            serde_json::from_str(r#"{"sumCpu":8,"sumMem":16}"#).unwrap();
        assert_eq!(req.min_nodes, 1);
        assert_eq!(req.max_nodes, 1);
        assert_eq!(req.on_demand_pct, 0);
        assert!(req.zones().is_empty());
    }

    #[test]
    fn test_unknown_network_category_is_rejected() {
        let result: Result<ClusterRecommendationRequest, _> =
            serde_json::from_str(r#"{"sumCpu":8,"sumMem":16,"networkPerf":["ultra"]}"#);
        assert!(result.is_err());
    }
}
