//! Horizontal vm scaling policy: when the overload predicate holds for a vm
//! it requests the creation of one fresh vm through the broker, at most once
//! per cooldown window. The clone inherits nothing from the overloaded vm.

use serde::Deserialize;

use crate::core::vm::{Vm, VmUtilizationSample};

/// Overload condition supplied either as a cpu threshold or as an arbitrary
/// predicate over the sampled vm state.
pub enum OverloadPredicate {
    /// Cpu utilization strictly above the threshold.
    CpuThreshold(f64),
    Custom(Box<dyn Fn(&VmUtilizationSample) -> bool>),
}

impl OverloadPredicate {
    pub fn is_overloaded(&self, sample: &VmUtilizationSample) -> bool {
        match self {
            OverloadPredicate::CpuThreshold(threshold) => sample.cpu > *threshold,
            OverloadPredicate::Custom(predicate) => predicate(sample),
        }
    }
}

/// Factory of fresh vms for scale ups. The broker assigns an id on
/// submission, so suppliers stay stateless.
pub enum VmSupplier {
    Template(Vm),
    Custom(Box<dyn FnMut() -> Vm>),
}

impl VmSupplier {
    pub fn supply(&mut self) -> Vm {
        match self {
            VmSupplier::Template(template) => template.clone(),
            VmSupplier::Custom(factory) => factory(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct HorizontalScalingConfig {
    /// When enabled the policy is attached to every vm of the initial groups.
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(default = "overload_threshold_default")]
    pub cpu_overload_threshold: f64,
    /// Window within which at most one clone is requested per vm, even if
    /// overload persists across consecutive ticks.
    #[serde(default = "cooldown_default")]
    pub cooldown: f64,
    /// Global bound on the number of scaled up vms. Absent means bounded by
    /// host capacity only.
    pub max_scaled_vms: Option<u64>,
    /// Template of the vm to clone. When absent the policy clones the spec
    /// of the vm it is attached to.
    pub vm_template: Option<Vm>,
}

fn enabled_default() -> bool {
    false // disabled by default
}
fn overload_threshold_default() -> f64 {
    0.7
}
fn cooldown_default() -> f64 {
    10.0 // 10 seconds
}

impl Default for HorizontalScalingConfig {
    fn default() -> Self {
        Self {
            enabled: enabled_default(),
            cpu_overload_threshold: overload_threshold_default(),
            cooldown: cooldown_default(),
            max_scaled_vms: None,
            vm_template: None,
        }
    }
}

pub struct HorizontalVmScalingPolicy {
    pub overload: OverloadPredicate,
    pub supplier: VmSupplier,
    pub cooldown: f64,
    last_scale_up_time: f64,
}

impl HorizontalVmScalingPolicy {
    pub fn new(overload: OverloadPredicate, supplier: VmSupplier, cooldown: f64) -> Self {
        Self {
            overload,
            supplier,
            cooldown,
            last_scale_up_time: f64::NEG_INFINITY,
        }
    }

    /// `vm_template` is the spec of the vm the policy is attached to, used
    /// when the config does not name an explicit template.
    pub fn from_config(config: &HorizontalScalingConfig, vm_template: Vm) -> Self {
        let template = config.vm_template.clone().unwrap_or(vm_template);
        Self::new(
            OverloadPredicate::CpuThreshold(config.cpu_overload_threshold),
            VmSupplier::Template(template),
            config.cooldown,
        )
    }

    pub fn should_scale_up(&self, sample: &VmUtilizationSample, time: f64) -> bool {
        self.overload.is_overloaded(sample) && time - self.last_scale_up_time >= self.cooldown
    }

    /// Produces the clone to submit and opens a new cooldown window.
    pub fn supply_vm(&mut self, time: f64) -> Vm {
        self.last_scale_up_time = time;
        let mut vm = self.supplier.supply();
        vm.id = 0;
        vm
    }
}

#[cfg(test)]
mod tests {
    use crate::autoscalers::horizontal_vm_scaling::{
        HorizontalVmScalingPolicy, OverloadPredicate, VmSupplier,
    };
    use crate::core::vm::{Vm, VmUtilizationSample};

    fn sample(cpu: f64) -> VmUtilizationSample {
        VmUtilizationSample {
            vm_id: 0,
            time: 0.0,
            cpu,
            ram: 0.0,
            bw: 0.0,
            pe_count: 2,
            allocated_mips: 2000.0,
            running_cloudlets: 4,
        }
    }

    fn policy(threshold: f64, cooldown: f64) -> HorizontalVmScalingPolicy {
        HorizontalVmScalingPolicy::new(
            OverloadPredicate::CpuThreshold(threshold),
            VmSupplier::Template(Vm::new(1000.0, 2, 1000, 1000, 10000)),
            cooldown,
        )
    }

    #[test]
    fn test_overload_is_strictly_above_threshold() {
        let policy = policy(0.7, 10.0);
        assert!(!policy.should_scale_up(&sample(0.7), 0.0));
        assert!(policy.should_scale_up(&sample(0.71), 0.0));
    }

    #[test]
    fn test_at_most_one_clone_per_cooldown_window() {
        let mut policy = policy(0.7, 10.0);
        assert!(policy.should_scale_up(&sample(0.9), 1.0));
        policy.supply_vm(1.0);
        assert!(!policy.should_scale_up(&sample(0.9), 2.0));
        assert!(!policy.should_scale_up(&sample(0.9), 10.5));
        assert!(policy.should_scale_up(&sample(0.9), 11.0));
    }

    #[test]
    fn test_custom_predicate_and_supplier() {
        let mut policy = HorizontalVmScalingPolicy::new(
            OverloadPredicate::Custom(Box::new(|s| s.cpu > 0.5 && s.running_cloudlets > 2)),
            VmSupplier::Custom(Box::new(|| Vm::new(2000.0, 4, 2000, 2000, 20000))),
            0.0,
        );
        assert!(policy.should_scale_up(&sample(0.6), 0.0));
        let vm = policy.supply_vm(0.0);
        assert_eq!(4, vm.pe_count);
        assert_eq!(0, vm.id);
    }
}
