//! Config fields definitions for elastisim simulation.

use serde::Deserialize;

use crate::autoscalers::horizontal_vm_scaling::HorizontalScalingConfig;
use crate::autoscalers::scaling_controller::ScalingControllerConfig;
use crate::autoscalers::vertical_vm_scaling::VerticalScalingConfig;
use crate::core::allocator::RedistributionMode;
use crate::core::host::Host;
use crate::core::vm::Vm;
use crate::metrics::printer::MetricsPrinterConfig;
use crate::workload::generator::WorkloadGeneratorConfig;

#[derive(Debug, Deserialize, PartialEq)]
pub struct SimulationConfig {
    pub sim_name: String,
    pub seed: u64,
    /// If not set default output of logs is stdout/stderr.
    pub logs_filepath: Option<String>,
    /// Period of the datacenter allocation cycle in seconds. A cycle may run
    /// earlier when a cloudlet finish is predicted before the next boundary.
    #[serde(default = "scheduling_interval_default")]
    pub scheduling_interval: f64,
    /// How the time-shared allocator redistributes surplus within one pass.
    #[serde(default)]
    pub redistribution_mode: RedistributionMode,
    #[serde(default)]
    pub hosts: Vec<HostGroup>,
    /// Vms submitted at simulation start. Scaling policies enabled in the
    /// configs below are attached to each of them.
    #[serde(default)]
    pub initial_vms: Vec<VmGroup>,
    /// Grace delay in seconds after which an idle vm is destroyed. Absent
    /// means vms are never destroyed.
    pub vm_destruction_delay: Option<f64>,
    #[serde(default)]
    pub scaling_controller: ScalingControllerConfig,
    #[serde(default)]
    pub vertical_scaling: VerticalScalingConfig,
    #[serde(default)]
    pub horizontal_scaling: HorizontalScalingConfig,
    #[serde(default)]
    pub workload_generator: WorkloadGeneratorConfig,
    pub metrics_printer: Option<MetricsPrinterConfig>,
}

fn scheduling_interval_default() -> f64 {
    1.0 // 1 second
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct HostGroup {
    /// If none, the group consists of a single host.
    pub host_count: Option<u32>,
    pub host_template: Host,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct VmGroup {
    /// If none, the group consists of a single vm.
    pub vm_count: Option<u32>,
    pub vm_template: Vm,
}

#[cfg(test)]
mod tests {
    use crate::config::SimulationConfig;

    #[test]
    fn test_default_scenario_config_parses() {
        let config_yaml = include_str!("../configs/default.yaml");
        let config = serde_yaml::from_str::<SimulationConfig>(config_yaml).unwrap();

        assert_eq!("elastisim_default", config.sim_name);
        assert_eq!(1, config.hosts.len());
        assert_eq!(8, config.hosts[0].host_template.pe_count);
        assert_eq!(Some(2), config.initial_vms[0].vm_count);
        assert!(config.vertical_scaling.enabled);
        assert!(!config.horizontal_scaling.enabled);
        assert_eq!(80, config.workload_generator.total_cloudlets);
        assert_eq!(Some(10.0), config.vm_destruction_delay);
    }
}
