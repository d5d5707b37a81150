//! Time-shared capacity allocator used at both nesting levels of the
//! capacity hierarchy: host capacity divided among placed vms and vm
//! capacity divided among its running cloudlets.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Grants below this value are treated as pool exhaustion to avoid spinning
/// on float dust.
const ALLOCATION_EPSILON: f64 = 1e-9;

/// How the surplus left by consumers that cannot absorb the equal share is
/// redistributed within one allocation pass.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub enum RedistributionMode {
    /// Redistribute repeatedly until no consumer is left under-served or the
    /// pool is exhausted. Converges in at most N rounds for N consumers.
    FixedPoint,
    /// Redistribute once per pass; leftover surplus is granted on later
    /// ticks.
    SinglePass,
}

impl Default for RedistributionMode {
    fn default() -> Self {
        RedistributionMode::FixedPoint
    }
}

/// Demand of a single consumer: the maximum rate it can absorb this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerDemand {
    pub id: u64,
    pub max_rate: f64,
}

impl ConsumerDemand {
    pub fn new(id: u64, max_rate: f64) -> Self {
        Self { id, max_rate }
    }
}

pub struct TimeSharedAllocator {
    mode: RedistributionMode,
}

impl TimeSharedAllocator {
    pub fn new(mode: RedistributionMode) -> Self {
        Self { mode }
    }

    /// Divides `capacity` among `consumers` and returns granted rates keyed
    /// by consumer id.
    ///
    /// Every active consumer receives the equal share `capacity / N`
    /// independent of its total demand. A consumer whose `max_rate` is below
    /// the equal share is capped at `max_rate` and the surplus is shared
    /// among consumers still below their demand. The sum of grants never
    /// exceeds `capacity`. Consumers are processed in ascending id order, so
    /// the result does not depend on the input order.
    pub fn allocate(&self, capacity: f64, consumers: &[ConsumerDemand]) -> BTreeMap<u64, f64> {
        assert!(capacity > 0.0, "capacity pool must be positive");

        let mut granted: BTreeMap<u64, f64> = consumers.iter().map(|c| (c.id, 0.0)).collect();
        assert_eq!(
            granted.len(),
            consumers.len(),
            "consumer ids must be unique"
        );
        if granted.is_empty() {
            return granted;
        }
        let demands: BTreeMap<u64, f64> =
            consumers.iter().map(|c| (c.id, c.max_rate)).collect();

        let rounds_limit = match self.mode {
            RedistributionMode::FixedPoint => consumers.len(),
            // initial equal division plus one redistribution
            RedistributionMode::SinglePass => 2,
        };

        let mut remaining = capacity;
        for _ in 0..rounds_limit {
            let active: Vec<u64> = granted
                .iter()
                .filter(|(id, grant)| demands[*id] - **grant > ALLOCATION_EPSILON)
                .map(|(id, _)| *id)
                .collect();
            if active.is_empty() || remaining <= ALLOCATION_EPSILON {
                break;
            }
            let share = remaining / active.len() as f64;
            for id in active {
                let headroom = demands[&id] - granted[&id];
                let grant = share.min(headroom);
                *granted.get_mut(&id).unwrap() += grant;
                remaining -= grant;
            }
        }
        granted
    }
}

#[cfg(test)]
mod tests {
    use crate::core::allocator::{ConsumerDemand, RedistributionMode, TimeSharedAllocator};

    fn demands(max_rates: &[f64]) -> Vec<ConsumerDemand> {
        max_rates
            .iter()
            .enumerate()
            .map(|(idx, rate)| ConsumerDemand::new(idx as u64, *rate))
            .collect()
    }

    #[test]
    fn test_equal_shares_under_saturation() {
        let allocator = TimeSharedAllocator::new(RedistributionMode::FixedPoint);
        let shares = allocator.allocate(2000.0, &demands(&[2000.0, 2000.0, 2000.0, 2000.0]));
        for share in shares.values() {
            assert_eq!(500.0, *share);
        }
        assert_eq!(2000.0, shares.values().sum::<f64>());
    }

    #[test]
    fn test_sum_of_shares_never_exceeds_capacity() {
        let allocator = TimeSharedAllocator::new(RedistributionMode::FixedPoint);
        let shares = allocator.allocate(10.0, &demands(&[3.0, 100.0, 5.0, 0.5, 42.0]));
        assert!(shares.values().sum::<f64>() <= 10.0 + 1e-9);
    }

    #[test]
    fn test_single_consumer_is_capped_by_own_demand() {
        let allocator = TimeSharedAllocator::new(RedistributionMode::FixedPoint);
        let shares = allocator.allocate(1000.0, &demands(&[300.0]));
        assert_eq!(300.0, shares[&0]);
    }

    #[test]
    fn test_surplus_is_redistributed_to_under_served_consumers() {
        let allocator = TimeSharedAllocator::new(RedistributionMode::FixedPoint);
        let shares = allocator.allocate(10.0, &demands(&[3.0, 10.0]));
        assert_eq!(3.0, shares[&0]);
        assert_eq!(7.0, shares[&1]);
    }

    #[test]
    fn test_redistribution_converges_within_consumer_count_rounds() {
        let allocator = TimeSharedAllocator::new(RedistributionMode::FixedPoint);
        // round 1: [1, 4, 4], round 2: [1, 5, 5.5], round 3: [1, 5, 6]
        let shares = allocator.allocate(12.0, &demands(&[1.0, 5.0, 100.0]));
        assert_eq!(1.0, shares[&0]);
        assert_eq!(5.0, shares[&1]);
        assert_eq!(6.0, shares[&2]);
    }

    #[test]
    fn test_single_pass_leaves_leftover_surplus_unallocated() {
        let allocator = TimeSharedAllocator::new(RedistributionMode::SinglePass);
        let shares = allocator.allocate(12.0, &demands(&[1.0, 5.0, 100.0]));
        assert_eq!(1.0, shares[&0]);
        assert_eq!(5.0, shares[&1]);
        assert_eq!(5.5, shares[&2]);
    }

    #[test]
    fn test_result_does_not_depend_on_input_order() {
        let allocator = TimeSharedAllocator::new(RedistributionMode::FixedPoint);
        let forward = vec![
            ConsumerDemand::new(1, 3.0),
            ConsumerDemand::new(2, 100.0),
            ConsumerDemand::new(3, 7.0),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();
        assert_eq!(
            allocator.allocate(15.0, &forward),
            allocator.allocate(15.0, &reversed)
        );
    }

    #[test]
    fn test_infeasible_minimum_shares_degrade_to_equal_split() {
        let allocator = TimeSharedAllocator::new(RedistributionMode::FixedPoint);
        let shares = allocator.allocate(3.0, &demands(&[10.0, 10.0, 10.0]));
        for share in shares.values() {
            assert_eq!(1.0, *share);
        }
    }

    #[test]
    fn test_no_consumers_yields_empty_allocation() {
        let allocator = TimeSharedAllocator::new(RedistributionMode::FixedPoint);
        assert!(allocator.allocate(10.0, &[]).is_empty());
    }

    #[test]
    #[should_panic]
    fn test_zero_capacity_pool_panics() {
        let allocator = TimeSharedAllocator::new(RedistributionMode::FixedPoint);
        allocator.allocate(0.0, &demands(&[1.0]));
    }
}
