//! Helpers shared by integration tests.

use crate::config::SimulationConfig;
use crate::core::cloudlet::Cloudlet;
use crate::core::utilization::interface::UtilizationModelConfig;
use crate::core::vm::Vm;

/// Test config without any hosts; the suffix is expected to define them
/// together with vms and scaling sections.
pub fn base_test_simulation_config(with_suffix: Option<&str>) -> SimulationConfig {
    let mut default = r#"
    sim_name: "test_elastisim"
    seed: 123
    scheduling_interval: 1.0
    "#
    .to_string();

    if !with_suffix.is_none() {
        default.push_str(with_suffix.unwrap());
    }

    serde_yaml::from_str::<SimulationConfig>(&default).unwrap()
}

/// Default test config: one host with 8 pes of 1000 mips and no vms. Vms and
/// scaling policies are added by suffix or submitted by the test itself.
pub fn default_test_simulation_config(with_suffix: Option<&str>) -> SimulationConfig {
    let mut default = r#"
    hosts:
      - host_template:
          pe_count: 8
          mips_per_pe: 1000.0
          ram: 20000
          bw: 20000
          storage: 10000000
    "#
    .to_string();

    if !with_suffix.is_none() {
        default.push_str(with_suffix.unwrap());
    }

    base_test_simulation_config(Some(&default))
}

/// Vm with the shape used across the default scenarios: 2 pes of 1000 mips.
pub fn default_vm() -> Vm {
    Vm::new(1000.0, 2, 1000, 1000, 10000)
}

/// Cloudlet requesting all of its allocated capacity.
pub fn full_cpu_cloudlet(length: u64, pe_count: u32) -> Cloudlet {
    let mut cloudlet = Cloudlet::new(length, pe_count);
    cloudlet.file_size = 1024;
    cloudlet.output_size = 1024;
    cloudlet.ram_utilization = UtilizationModelConfig {
        model_name: "constant".to_string(),
        config: "usage: 0.0125".to_string(),
    };
    cloudlet.bw_utilization = cloudlet.ram_utilization.clone();
    cloudlet
}

/// Cloudlet requesting a constant fraction of its allocated capacity.
pub fn constant_cpu_cloudlet(length: u64, pe_count: u32, usage: f64) -> Cloudlet {
    let mut cloudlet = full_cpu_cloudlet(length, pe_count);
    cloudlet.cpu_utilization = UtilizationModelConfig {
        model_name: "constant".to_string(),
        config: format!("usage: {}", usage),
    };
    cloudlet
}
