//! Node pool synthesis
//!
//! Builds one on-demand pool from the cheapest on-demand candidate and
//! diversifies the spot share across several spot pools, filled so that the
//! cheapest spot option always holds the largest share.

use crate::models::{Attribute, ClusterRecommendationRequest, NodePool, VirtualMachine, VmClass};
use std::cmp::Ordering;
use tracing::debug;

/// Number of spot types to diversify across for an average node count
pub fn diversification_number(avg_nodes: u32) -> usize {
    match avg_nodes {
        0..=4 => avg_nodes as usize,
        5..=8 => 4,
        9..=15 => 5,
        16..=24 => 6,
        25..=35 => 7,
        _ => 8,
    }
}

/// Number of spot pools to emit for `n` diversified types
pub fn pool_count(n: usize, spot_options: usize) -> usize {
    if n > 0 {
        (n * 3).div_ceil(2).min(spot_options)
    } else {
        3.min(spot_options)
    }
}

/// Average number of spot nodes the request leaves room for
pub fn avg_spot_node_count(min_nodes: u32, max_nodes: u32, od_nodes: u32) -> u32 {
    let count = i64::from(min_nodes) + i64::from(max_nodes) - 2 * i64::from(od_nodes);
    if count <= 0 {
        return 0;
    }
    // ceil(count / 2) without leaving integer arithmetic
    let avg = (count + 1) / 2;
    u32::try_from(avg).unwrap_or(u32::MAX)
}

/// Diversification number when an existing layout is extended
pub fn diversification_with_layout(non_zero_pools: usize, spot_options: usize) -> usize {
    if non_zero_pools == 0 {
        1
    } else {
        non_zero_pools.min(spot_options)
    }
}

fn price_per_unit(price: f64, attr: Attribute, vm: &VirtualMachine) -> f64 {
    price / attr.value(vm)
}

/// Cheapest on-demand VM per unit of the attribute, first seen wins ties
pub fn cheapest_on_demand(attr: Attribute, vms: &[VirtualMachine]) -> Option<&VirtualMachine> {
    let mut best: Option<&VirtualMachine> = None;
    for vm in vms {
        let cheaper = match best {
            None => true,
            Some(current) => {
                price_per_unit(vm.on_demand_price, attr, vm)
                    < price_per_unit(current.on_demand_price, attr, current)
            }
        };
        if cheaper {
            best = Some(vm);
        }
    }
    best
}

/// Stable sort of spot candidates by average price per unit of the attribute
pub fn sort_by_spot_price(attr: Attribute, vms: &mut [VirtualMachine]) {
    vms.sort_by(|a, b| {
        price_per_unit(a.avg_price, attr, a)
            .partial_cmp(&price_per_unit(b.avg_price, attr, b))
            .unwrap_or(Ordering::Equal)
    });
}

/// Fill the first `n` pools until they hold `sum_spot_value` more of the attribute
///
/// The pool with the smallest initial sum is the baseline: it receives a node
/// on every pass, other pools only grow while they stay at or below it.
pub fn fill_spot_pools(attr: Attribute, sum_spot_value: f64, n: usize, pools: &mut [NodePool]) {
    let n = n.min(pools.len());
    if n == 0 {
        return;
    }

    let mut sum_in_pools = 0.0;
    let mut min_index = 0;
    let mut min_value = f64::INFINITY;
    for (i, pool) in pools.iter().take(n).enumerate() {
        let v = pool.sum(attr);
        sum_in_pools += v;
        if v < min_value {
            min_value = v;
            min_index = i;
        }
    }

    let desired = sum_in_pools + sum_spot_value;
    let mut idx = min_index;
    while sum_in_pools < desired {
        let i = idx % n;
        if i == min_index {
            pools[i].sum_nodes += 1;
            sum_in_pools += attr.value(&pools[i].vm_type);
            debug!(pool = i, sum_in_pools, "Added node to the baseline spot pool");
            idx += 1;
        } else if pools[i].next_sum(attr) > pools[min_index].sum(attr) {
            idx += 1;
        } else {
            pools[i].sum_nodes += 1;
            sum_in_pools += attr.value(&pools[i].vm_type);
            debug!(pool = i, sum_in_pools, "Added node to spot pool");
        }
    }
}

/// Recommend node pools for one attribute
///
/// Without a layout a fresh set of pools is built. With a layout its regular
/// pools and spot pools are extended; spot pools whose type is no longer a
/// candidate are carried over untouched at the end.
pub fn recommend_node_pools(
    attr: Attribute,
    req: &ClusterRecommendationRequest,
    layout: Option<&[NodePool]>,
    od_vms: &[VirtualMachine],
    spot_vms: &[VirtualMachine],
) -> Vec<NodePool> {
    let requested = attr.requested(req);
    let sum_od_value = requested * f64::from(req.on_demand_pct) / 100.0;
    debug!(attribute = %attr, requested, sum_od_value, "Recommending node pools");

    let mut od_pools: Vec<NodePool> = layout
        .unwrap_or(&[])
        .iter()
        .filter(|pool| pool.vm_class == VmClass::Regular)
        .cloned()
        .collect();

    let mut actual_od = 0.0;
    let mut od_nodes = 0u32;
    if req.on_demand_pct != 0 {
        if let Some(best) = cheapest_on_demand(attr, od_vms) {
            let unit = attr.value(best);
            od_nodes = (sum_od_value / unit).ceil().max(0.0) as u32;
            match layout {
                None => od_pools.push(NodePool::new(best.clone(), od_nodes, VmClass::Regular)),
                Some(_) => {
                    for pool in od_pools
                        .iter_mut()
                        .filter(|pool| pool.vm_type.instance_type == best.instance_type)
                    {
                        pool.sum_nodes += od_nodes;
                    }
                }
            }
            actual_od = unit * f64::from(od_nodes);
        }
    }

    let mut spot_pools = Vec::new();
    if req.on_demand_pct != 100 {
        let sum_spot_value = (requested - actual_od).max(0.0);
        debug!(attribute = %attr, sum_spot_value, "Spot value to cover");

        let mut spot_vms = spot_vms.to_vec();
        sort_by_spot_price(attr, &mut spot_vms);

        let mut set_aside = Vec::new();
        let n = match layout {
            None => {
                let avg = avg_spot_node_count(req.min_nodes, req.max_nodes, od_nodes);
                let n = diversification_number(avg).min(spot_vms.len());
                let m = pool_count(n, spot_vms.len());
                debug!(n, m, "Spot diversification");
                spot_pools.extend(
                    spot_vms
                        .iter()
                        .take(m)
                        .map(|vm| NodePool::new(vm.clone(), 0, VmClass::Spot)),
                );
                n
            }
            Some(layout) => {
                let mut ordered = layout.to_vec();
                ordered.sort_by(|a, b| b.sum_nodes.cmp(&a.sum_nodes));
                let mut non_zero = 0;
                for pool in ordered.into_iter().filter(|p| p.vm_class == VmClass::Spot) {
                    if pool.sum_nodes > 0 {
                        non_zero += 1;
                    }
                    if spot_vms
                        .iter()
                        .any(|vm| vm.instance_type == pool.vm_type.instance_type)
                    {
                        spot_pools.push(pool);
                    } else {
                        set_aside.push(pool);
                    }
                }
                let n = diversification_with_layout(non_zero, spot_vms.len());
                debug!(n, "Spot diversification over existing layout");
                n
            }
        };

        // a single pool still has to carry the spot share when n rounds to zero
        let n = if sum_spot_value > 0.0 { n.max(1) } else { n };
        fill_spot_pools(attr, sum_spot_value, n, &mut spot_pools);
        spot_pools.extend(set_aside);
    }

    debug!(
        regular = od_pools.len(),
        spot = spot_pools.len(),
        "Created node pools"
    );
    od_pools.extend(spot_pools);
    od_pools
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NetworkPerfCategory;

    fn vm(instance_type: &str, cpus: f64, memory: f64, od: f64, avg: f64) -> VirtualMachine {
        VirtualMachine {
            instance_type: instance_type.to_string(),
            series: String::new(),
            category: String::new(),
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
            network_perf_category: NetworkPerfCategory::Medium,
        }
    }

    #[test]
    fn test_diversification_staircase() {
        let cases = [
            (0, 0),
            (3, 3),
            (4, 4),
            (5, 4),
            (8, 4),
            (9, 5),
            (15, 5),
            (16, 6),
            (24, 6),
            (25, 7),
            (35, 7),
            (36, 8),
            (500, 8),
        ];
        for (avg, n) in cases {
            assert_eq!(diversification_number(avg), n, "avg nodes {avg}");
        }
    }

    #[test]
    fn test_pool_count() {
        assert_eq!(pool_count(4, 10), 6);
        assert_eq!(pool_count(5, 10), 8);
        assert_eq!(pool_count(5, 6), 6);
        assert_eq!(pool_count(0, 10), 3);
        assert_eq!(pool_count(0, 2), 2);
    }

    #[test]
    fn test_avg_spot_node_count() {
        assert_eq!(avg_spot_node_count(1, 10, 0), 6);
        assert_eq!(avg_spot_node_count(2, 10, 3), 3);
        assert_eq!(avg_spot_node_count(1, 1, 5), 0);
    }

    #[test]
    fn test_diversification_with_layout() {
        assert_eq!(diversification_with_layout(0, 5), 1);
        assert_eq!(diversification_with_layout(2, 5), 2);
        assert_eq!(diversification_with_layout(7, 5), 5);
    }

    #[test]
    fn test_cheapest_on_demand_prefers_first_on_ties() {
        let vms = vec![
            vm("a", 2.0, 4.0, 0.2, 0.1),
            vm("b", 4.0, 8.0, 0.4, 0.1),
            vm("c", 4.0, 8.0, 0.5, 0.1),
        ];
        let best = cheapest_on_demand(Attribute::Cpu, &vms).unwrap();
        assert_eq!(best.instance_type, "a");
    }

    #[test]
    fn test_fill_keeps_baseline_largest() {
        let mut pools = vec![
            NodePool::new(vm("small", 2.0, 4.0, 1.0, 0.1), 0, VmClass::Spot),
            NodePool::new(vm("large", 8.0, 16.0, 1.0, 0.1), 0, VmClass::Spot),
            NodePool::new(vm("medium", 4.0, 8.0, 1.0, 0.1), 0, VmClass::Spot),
        ];
        fill_spot_pools(Attribute::Cpu, 40.0, 3, &mut pools);

        let total: f64 = pools.iter().map(|p| p.sum(Attribute::Cpu)).sum();
        assert!(total >= 40.0);
        let baseline = pools[0].sum(Attribute::Cpu);
        assert!(pools.iter().all(|p| p.sum(Attribute::Cpu) <= baseline));
        assert!(pools[2].sum_nodes > 0);
    }

    #[test]
    fn test_fill_respects_n() {
        let mut pools = vec![
            NodePool::new(vm("a", 2.0, 4.0, 1.0, 0.1), 0, VmClass::Spot),
            NodePool::new(vm("b", 2.0, 4.0, 1.0, 0.1), 0, VmClass::Spot),
            NodePool::new(vm("c", 2.0, 4.0, 1.0, 0.1), 0, VmClass::Spot),
        ];
        fill_spot_pools(Attribute::Cpu, 8.0, 2, &mut pools);
        assert_eq!(pools[0].sum_nodes, 2);
        assert_eq!(pools[1].sum_nodes, 2);
        assert_eq!(pools[2].sum_nodes, 0);
    }

    #[test]
    fn test_fill_starts_from_smallest_existing_pool() {
        let mut pools = vec![
            NodePool::new(vm("a", 2.0, 4.0, 1.0, 0.1), 3, VmClass::Spot),
            NodePool::new(vm("b", 2.0, 4.0, 1.0, 0.1), 1, VmClass::Spot),
        ];
        fill_spot_pools(Attribute::Cpu, 2.0, 2, &mut pools);
        assert_eq!(pools[0].sum_nodes, 3);
        assert_eq!(pools[1].sum_nodes, 2);
    }

    #[test]
    fn test_on_demand_only() {
        let vms = vec![vm("a", 4.0, 16.0, 0.4, 0.1), vm("b", 8.0, 32.0, 0.6, 0.2)];
        let req = ClusterRecommendationRequest {
            sum_cpu: 20.0,
            sum_mem: 80.0,
            min_nodes: 1,
            max_nodes: 10,
            on_demand_pct: 100,
            ..Default::default()
        };
        let pools = recommend_node_pools(Attribute::Cpu, &req, None, &vms, &vms);
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].vm_type.instance_type, "b");
        assert_eq!(pools[0].sum_nodes, 3);
        assert_eq!(pools[0].vm_class, VmClass::Regular);
    }

    #[test]
    fn test_spot_only_has_no_regular_nodes() {
        let vms = vec![
            vm("a", 2.0, 8.0, 0.2, 0.05),
            vm("b", 4.0, 16.0, 0.4, 0.08),
            vm("c", 8.0, 32.0, 0.8, 0.2),
        ];
        let req = ClusterRecommendationRequest {
            sum_cpu: 32.0,
            sum_mem: 128.0,
            min_nodes: 4,
            max_nodes: 12,
            on_demand_pct: 0,
            ..Default::default()
        };
        let pools = recommend_node_pools(Attribute::Cpu, &req, None, &vms, &vms);

        assert!(pools.iter().all(|p| p.vm_class == VmClass::Spot));
        let total: f64 = pools.iter().map(|p| p.sum(Attribute::Cpu)).sum();
        assert!(total >= 32.0);
        // cheapest per cpu first
        assert_eq!(pools[0].vm_type.instance_type, "b");
    }

    #[test]
    fn test_mixed_request_subtracts_on_demand_overshoot() {
        let vms = vec![vm("a", 3.0, 12.0, 0.3, 0.1), vm("b", 2.0, 8.0, 0.3, 0.05)];
        let req = ClusterRecommendationRequest {
            sum_cpu: 10.0,
            sum_mem: 40.0,
            min_nodes: 2,
            max_nodes: 8,
            on_demand_pct: 50,
            ..Default::default()
        };
        let pools = recommend_node_pools(Attribute::Cpu, &req, None, &vms, &vms);

        // 5 cpus on-demand rounded up to two 3-cpu nodes
        assert_eq!(pools[0].vm_type.instance_type, "a");
        assert_eq!(pools[0].sum_nodes, 2);
        let spot: f64 = pools[1..].iter().map(|p| p.sum(Attribute::Cpu)).sum();
        assert!(spot >= 4.0);
        assert!(spot < 4.0 + 3.0 * 2.0);
    }

    #[test]
    fn test_layout_pools_are_extended() {
        let regular = vm("a", 2.0, 8.0, 0.2, 0.05);
        let spot = vm("b", 4.0, 16.0, 0.4, 0.1);
        let gone = vm("c", 4.0, 16.0, 0.4, 0.1);
        let layout = vec![
            NodePool::new(regular.clone(), 2, VmClass::Regular),
            NodePool::new(spot.clone(), 1, VmClass::Spot),
            NodePool::new(gone, 3, VmClass::Spot),
        ];
        let req = ClusterRecommendationRequest {
            sum_cpu: 8.0,
            sum_mem: 32.0,
            min_nodes: 1,
            max_nodes: u32::MAX,
            on_demand_pct: 50,
            ..Default::default()
        };
        let pools = recommend_node_pools(
            Attribute::Cpu,
            &req,
            Some(&layout),
            &[regular],
            &[spot],
        );

        assert_eq!(pools.len(), 3);
        assert_eq!(pools[0].vm_type.instance_type, "a");
        assert_eq!(pools[0].sum_nodes, 4);
        assert_eq!(pools[1].vm_type.instance_type, "b");
        assert_eq!(pools[1].sum_nodes, 2);
        assert_eq!(pools[2].vm_type.instance_type, "c");
        assert_eq!(pools[2].sum_nodes, 3);
    }
}
