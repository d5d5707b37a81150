use std::{cell::RefCell, rc::Rc};

use dslab_elastisim::metrics::collector::MetricsCollector;
use dslab_elastisim::simulator::ElastisimSimulation;
use dslab_elastisim::test_util::helpers::default_test_simulation_config;

fn scaling_scenario_config() -> String {
    r#"
    vm_destruction_delay: 10.0
    initial_vms:
      - vm_count: 2
        vm_template:
          mips: 1000.0
          pe_count: 2
          ram: 1000
          bw: 1000
          size: 10000
    vertical_scaling:
      enabled: true
      upper_cpu_utilization_threshold: 0.7
      lower_cpu_utilization_threshold: 0.4
      scaling_factor: 0.1
    horizontal_scaling:
      enabled: true
      cpu_overload_threshold: 0.7
      cooldown: 10.0
    workload_generator:
      enabled: true
      batch_size: 20
      interval: 4.0
      total_cloudlets: 80
    "#
    .to_string()
}

fn run_simulation() -> Rc<RefCell<MetricsCollector>> {
    let config = default_test_simulation_config(Some(&scaling_scenario_config()));
    let mut sim = ElastisimSimulation::new(Rc::new(config));
    sim.initialize(None);
    sim.step_until_time(500.0);
    sim.metrics_collector.clone()
}

#[test]
pub fn test_simulation_determinism() {
    let first_metrics_collector = run_simulation();

    for _ in 0..5 {
        let current = run_simulation();

        assert_eq!(
            first_metrics_collector.borrow().cloudlets_finished,
            current.borrow().cloudlets_finished
        );
        assert_eq!(
            first_metrics_collector.borrow().total_scaled_up_vms,
            current.borrow().total_scaled_up_vms
        );
        assert_eq!(
            first_metrics_collector.borrow().total_applied_resizes,
            current.borrow().total_applied_resizes
        );
        assert_eq!(
            first_metrics_collector.borrow().total_destroyed_vms,
            current.borrow().total_destroyed_vms
        );
        assert_eq!(
            first_metrics_collector.borrow().cloudlet_duration_stats,
            current.borrow().cloudlet_duration_stats
        );
        assert_eq!(
            first_metrics_collector.borrow().vm_cpu_utilization_stats,
            current.borrow().vm_cpu_utilization_stats
        );
    }
}
