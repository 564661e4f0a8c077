//! Attribute value selection
//!
//! Chooses the per-VM attribute values worth considering for a request from
//! the distinct values present in the catalog.

use crate::error::{RecommenderError, RecommenderResult};
use crate::models::{Attribute, ClusterRecommendationRequest, VirtualMachine};

/// Distinct attribute values of the catalog, sorted ascending
pub fn distinct_values(attr: Attribute, vms: &[VirtualMachine]) -> Vec<f64> {
    let mut values: Vec<f64> = vms.iter().map(|vm| attr.value(vm)).collect();
    values.sort_by(f64::total_cmp);
    values.dedup();
    values
}

/// Per-VM interval `[sum / maxNodes, sum / minNodes]` for the attribute
pub fn per_vm_bounds(attr: Attribute, req: &ClusterRecommendationRequest) -> (f64, f64) {
    let sum = attr.requested(req);
    let min = sum / f64::from(req.max_nodes);
    let max = sum / f64::from(req.min_nodes);
    (min, max)
}

/// Select values lying in `[min, max]`
///
/// Falls back to the closest value above `max`, or to the largest value
/// when every value lies below the interval.
pub fn select_values(
    attr: Attribute,
    values: &[f64],
    min: f64,
    max: f64,
) -> RecommenderResult<Vec<f64>> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();

    let Some(&largest) = sorted.last() else {
        return Err(RecommenderError::NoAttributeValues(attr));
    };

    let selected: Vec<f64> = sorted
        .iter()
        .copied()
        .filter(|v| min <= *v && *v <= max)
        .collect();
    if !selected.is_empty() {
        return Ok(selected);
    }

    let fallback = sorted.iter().copied().find(|v| *v > max).unwrap_or(largest);
    Ok(vec![fallback])
}

/// Attribute values to consider for the request
pub fn recommend_values(
    attr: Attribute,
    vms: &[VirtualMachine],
    req: &ClusterRecommendationRequest,
) -> RecommenderResult<Vec<f64>> {
    let (min, max) = per_vm_bounds(attr, req);
    let values = select_values(attr, &distinct_values(attr, vms), min, max)?;
    tracing::debug!(attribute = %attr, min, max, ?values, "Selected attribute values");
    Ok(values)
}

/// Catalog entries whose attribute value is one of `values`
pub fn vms_with_values(
    attr: Attribute,
    vms: &[VirtualMachine],
    values: &[f64],
) -> Vec<VirtualMachine> {
    vms.iter()
        .filter(|vm| values.contains(&attr.value(vm)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_within_interval() {
        let values = [1.0, 2.0, 4.0, 8.0, 16.0];
        let selected = select_values(Attribute::Cpu, &values, 2.0, 8.0).unwrap();
        assert_eq!(selected, vec![2.0, 4.0, 8.0]);
    }

    #[test]
    fn test_fallback_to_closest_above() {
        let values = [60.0, 30.0, 50.0, 40.0];
        let selected = select_values(Attribute::Cpu, &values, 5.0, 10.0).unwrap();
        assert_eq!(selected, vec![30.0]);
    }

    #[test]
    fn test_fallback_to_largest_below() {
        let values = [1.0, 2.0, 3.0, 5.0, 9.0];
        let selected = select_values(Attribute::Cpu, &values, 10.0, 20.0).unwrap();
        assert_eq!(selected, vec![9.0]);
    }

    #[test]
    fn test_no_values() {
        let err = select_values(Attribute::Memory, &[], 1.0, 2.0).unwrap_err();
        assert!(matches!(err, RecommenderError::NoAttributeValues(Attribute::Memory)));
    }

    #[test]
    fn test_selection_is_stable_on_its_own_output() {
        let values = [1.0, 2.0, 4.0, 8.0, 16.0, 32.0];
        for (min, max) in [(2.0, 8.0), (40.0, 80.0), (0.1, 0.5), (3.0, 3.5)] {
            let first = select_values(Attribute::Cpu, &values, min, max).unwrap();
            let second = select_values(Attribute::Cpu, &first, min, max).unwrap();
            assert_eq!(first, second, "bounds [{min}, {max}]");
        }
    }

    #[test]
    fn test_equal_node_bounds_select_exact_value() {
        let req = ClusterRecommendationRequest {
            sum_cpu: 16.0,
            sum_mem: 64.0,
            min_nodes: 4,
            max_nodes: 4,
            ..Default::default()
        };
        let (min, max) = per_vm_bounds(Attribute::Cpu, &req);
        assert_eq!((min, max), (4.0, 4.0));

        let selected = select_values(Attribute::Cpu, &[2.0, 4.0, 8.0], min, max).unwrap();
        assert_eq!(selected, vec![4.0]);
    }
}
