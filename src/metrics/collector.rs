//! Implements centralized storage for metrics. Any component may access this
//! component to report metrics about vms, cloudlets and scaling activity.

use average::{concatenate, Estimate, Max, Mean, Min, Variance};

concatenate!(
    Estimator,
    [Min, min],
    [Max, max],
    [Mean, mean],
    [Variance, population_variance]
);

#[derive(Default)]
pub struct EstimatorWrapper {
    estimator: Estimator,
}

impl std::fmt::Debug for EstimatorWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EstimatorWrapper")
            .field("min", &self.min())
            .field("max", &self.max())
            .field("mean", &self.mean())
            .field("population_variance", &self.population_variance())
            .finish()
    }
}

impl EstimatorWrapper {
    pub fn new() -> Self {
        Self {
            estimator: Estimator::new(),
        }
    }

    pub fn add(&mut self, value: f64) {
        self.estimator.add(value);
    }

    pub fn min(&self) -> f64 {
        self.estimator.min()
    }

    pub fn max(&self) -> f64 {
        self.estimator.max()
    }

    pub fn mean(&self) -> f64 {
        self.estimator.mean()
    }

    pub fn population_variance(&self) -> f64 {
        self.estimator.population_variance()
    }
}

impl PartialEq for EstimatorWrapper {
    fn eq(&self, other: &Self) -> bool {
        self.min() == other.min()
            && self.max() == other.max()
            && self.mean() == other.mean()
            && self.population_variance() == other.population_variance()
    }
}

#[derive(Default)]
pub struct MetricsCollector {
    /// The number of cloudlets accepted by the broker, from any source.
    pub total_cloudlets_submitted: u64,
    /// The number of cloudlets that ran to completion.
    pub cloudlets_finished: u64,

    /// The number of vms admitted by the datacenter.
    pub total_created_vms: u64,
    /// The number of vms the datacenter could not place on any host.
    pub total_rejected_vms: u64,
    /// The number of vms destroyed after staying idle for the grace delay.
    pub total_destroyed_vms: u64,

    // Autoscaling metrics
    /// Total number of vms scaled up by horizontal scaling policies.
    pub total_scaled_up_vms: u64,
    /// Total number of resize requests issued by vertical scaling policies.
    pub total_resize_requests: u64,
    /// Total number of resize requests that took effect.
    pub total_applied_resizes: u64,
    /// Total number of scaling requests rejected due to missing host headroom.
    pub total_rejected_scaling_requests: u64,

    /// Estimations for the cloudlet running duration.
    pub cloudlet_duration_stats: EstimatorWrapper,
    /// Estimations for the time a cloudlet spent at the broker between
    /// becoming ready for dispatch and starting on a vm.
    pub cloudlet_wait_time_stats: EstimatorWrapper,

    /// Estimations for per-vm utilization samples taken at allocation passes.
    /// Ram and bw are tracked for diagnostics only and never feed scaling
    /// decisions.
    pub vm_cpu_utilization_stats: EstimatorWrapper,
    pub vm_ram_utilization_stats: EstimatorWrapper,
    pub vm_bw_utilization_stats: EstimatorWrapper,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Default::default()
    }
}
