//! Vertical vm scaling policy: reacts to cpu utilization crossing the upper
//! or lower threshold by requesting a change of the vm's processing element
//! count. Between the two thresholds lies the hysteresis band where no
//! request is issued.

use serde::Deserialize;

use crate::core::vm::VmUtilizationSample;

/// Threshold supplied either as a constant or as an arbitrary function of
/// the sampled vm state.
pub enum ThresholdFunction {
    Constant(f64),
    Custom(Box<dyn Fn(&VmUtilizationSample) -> f64>),
}

impl ThresholdFunction {
    pub fn evaluate(&self, sample: &VmUtilizationSample) -> f64 {
        match self {
            ThresholdFunction::Constant(value) => *value,
            ThresholdFunction::Custom(function) => function(sample),
        }
    }
}

/// Size of the requested capacity delta as a function of the current
/// allocation. Deltas are multiplicative, so growth compounds with the
/// allocation it is applied to.
pub enum ResourceScalingFunction {
    /// `factor * allocated`.
    Proportional { factor: f64 },
    Custom(Box<dyn Fn(f64) -> f64>),
}

impl ResourceScalingFunction {
    pub fn delta(&self, allocated: f64) -> f64 {
        match self {
            ResourceScalingFunction::Proportional { factor } => factor * allocated,
            ResourceScalingFunction::Custom(function) => function(allocated),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct VerticalScalingConfig {
    /// When enabled the policy is attached to every vm of the initial groups.
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(default = "upper_threshold_default")]
    pub upper_cpu_utilization_threshold: f64,
    #[serde(default = "lower_threshold_default")]
    pub lower_cpu_utilization_threshold: f64,
    #[serde(default = "scaling_factor_default")]
    pub scaling_factor: f64,
    /// Upper bound for scale ups. Absent means bounded by the host only.
    pub max_pe_count: Option<u32>,
}

fn enabled_default() -> bool {
    false // disabled by default
}
fn upper_threshold_default() -> f64 {
    0.7
}
fn lower_threshold_default() -> f64 {
    0.4
}
fn scaling_factor_default() -> f64 {
    0.1
}

impl Default for VerticalScalingConfig {
    fn default() -> Self {
        Self {
            enabled: enabled_default(),
            upper_cpu_utilization_threshold: upper_threshold_default(),
            lower_cpu_utilization_threshold: lower_threshold_default(),
            scaling_factor: scaling_factor_default(),
            max_pe_count: None,
        }
    }
}

pub struct VerticalVmScalingPolicy {
    pub upper_threshold: ThresholdFunction,
    pub lower_threshold: ThresholdFunction,
    pub scaling: ResourceScalingFunction,
    pub max_pe_count: Option<u32>,
}

impl VerticalVmScalingPolicy {
    pub fn from_config(config: &VerticalScalingConfig) -> Self {
        Self {
            upper_threshold: ThresholdFunction::Constant(config.upper_cpu_utilization_threshold),
            lower_threshold: ThresholdFunction::Constant(config.lower_cpu_utilization_threshold),
            scaling: ResourceScalingFunction::Proportional {
                factor: config.scaling_factor,
            },
            max_pe_count: config.max_pe_count,
        }
    }

    /// Returns the processing element count to request for the vm, or None
    /// when utilization stays inside the hysteresis band or the bound is
    /// already reached. The delta is rounded up to whole processing
    /// elements; scale downs never go below one element.
    pub fn desired_pe_count(&self, sample: &VmUtilizationSample) -> Option<u32> {
        let utilization = sample.cpu;
        if utilization > self.upper_threshold.evaluate(sample) {
            let delta = self.scaling.delta(sample.pe_count as f64).ceil().max(1.0) as u32;
            let mut desired = sample.pe_count.saturating_add(delta);
            if let Some(max_pe_count) = self.max_pe_count {
                desired = desired.min(max_pe_count);
            }
            if desired > sample.pe_count {
                Some(desired)
            } else {
                None
            }
        } else if utilization < self.lower_threshold.evaluate(sample) {
            let delta = self.scaling.delta(sample.pe_count as f64).ceil().max(1.0) as u32;
            let desired = sample.pe_count.saturating_sub(delta).max(1);
            if desired < sample.pe_count {
                Some(desired)
            } else {
                None
            }
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::autoscalers::vertical_vm_scaling::{
        ResourceScalingFunction, ThresholdFunction, VerticalScalingConfig, VerticalVmScalingPolicy,
    };
    use crate::core::vm::VmUtilizationSample;

    fn sample(cpu: f64, pe_count: u32) -> VmUtilizationSample {
        VmUtilizationSample {
            vm_id: 0,
            time: 0.0,
            cpu,
            ram: 0.0,
            bw: 0.0,
            pe_count,
            allocated_mips: pe_count as f64 * 1000.0,
            running_cloudlets: 1,
        }
    }

    fn policy(upper: f64, lower: f64, factor: f64) -> VerticalVmScalingPolicy {
        VerticalVmScalingPolicy::from_config(&VerticalScalingConfig {
            enabled: true,
            upper_cpu_utilization_threshold: upper,
            lower_cpu_utilization_threshold: lower,
            scaling_factor: factor,
            max_pe_count: None,
        })
    }

    #[test]
    fn test_fractional_delta_is_rounded_up_to_one_element() {
        // factor 0.1 of 2 allocated elements is 0.2, rounded up to 1
        assert_eq!(Some(3), policy(0.7, 0.0, 0.1).desired_pe_count(&sample(0.75, 2)));
    }

    #[test]
    fn test_delta_compounds_with_allocation() {
        // factor 0.1 of 22 allocated elements is 2.2, rounded up to 3
        assert_eq!(Some(25), policy(0.7, 0.0, 0.1).desired_pe_count(&sample(0.9, 22)));
    }

    #[test]
    fn test_hysteresis_band_issues_no_request() {
        let policy = policy(0.7, 0.4, 0.1);
        assert_eq!(None, policy.desired_pe_count(&sample(0.7, 2)));
        assert_eq!(None, policy.desired_pe_count(&sample(0.55, 2)));
        assert_eq!(None, policy.desired_pe_count(&sample(0.4, 2)));
    }

    #[test]
    fn test_scale_down_is_floored_at_one_element() {
        let policy = policy(0.7, 0.4, 0.1);
        assert_eq!(Some(1), policy.desired_pe_count(&sample(0.1, 2)));
        assert_eq!(None, policy.desired_pe_count(&sample(0.1, 1)));
    }

    #[test]
    fn test_scale_up_is_capped_by_max_pe_count() {
        let mut capped = policy(0.7, 0.0, 0.1);
        capped.max_pe_count = Some(2);
        assert_eq!(None, capped.desired_pe_count(&sample(0.9, 2)));
        capped.max_pe_count = Some(3);
        assert_eq!(Some(3), capped.desired_pe_count(&sample(0.9, 2)));
    }

    #[test]
    fn test_custom_threshold_and_scaling_functions() {
        let policy = VerticalVmScalingPolicy {
            upper_threshold: ThresholdFunction::Custom(Box::new(|s| {
                if s.pe_count > 4 {
                    0.9
                } else {
                    0.5
                }
            })),
            lower_threshold: ThresholdFunction::Constant(0.0),
            // the doubled variant of the original's gradual scaling
            scaling: ResourceScalingFunction::Custom(Box::new(|allocated| 2.0 * 0.1 * allocated)),
            max_pe_count: None,
        };
        // 0.6 crosses 0.5 for a small vm, delta is ceil(0.4) = 1
        assert_eq!(Some(3), policy.desired_pe_count(&sample(0.6, 2)));
        // but stays below 0.9 for a big one
        assert_eq!(None, policy.desired_pe_count(&sample(0.6, 8)));
    }
}
