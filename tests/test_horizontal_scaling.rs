use std::rc::Rc;

use dslab_elastisim::autoscalers::horizontal_vm_scaling::{
    HorizontalVmScalingPolicy, OverloadPredicate, VmSupplier,
};
use dslab_elastisim::core::vm::Vm;
use dslab_elastisim::simulator::ElastisimSimulation;
use dslab_elastisim::test_util::helpers::{
    base_test_simulation_config, default_test_simulation_config, full_cpu_cloudlet,
};

fn horizontal_scaling_config(cooldown: f64) -> String {
    format!(
        r#"
    initial_vms:
      - vm_count: 2
        vm_template:
          mips: 1000.0
          pe_count: 2
          ram: 1000
          bw: 1000
          size: 10000
    horizontal_scaling:
      enabled: true
      cpu_overload_threshold: 0.7
      cooldown: {}
    "#,
        cooldown
    )
}

#[test]
fn test_overloaded_vms_are_cloned_once_per_cooldown_window() {
    let config = default_test_simulation_config(Some(&horizontal_scaling_config(100.0)));
    let mut sim = ElastisimSimulation::new(Rc::new(config));
    sim.initialize(None);

    // let both vms come up, then saturate each with one cloudlet; the
    // clones stay idle and unsaturated
    sim.step_until_time(0.5);
    sim.submit_cloudlets(vec![
        full_cpu_cloudlet(1000000, 2),
        full_cpu_cloudlet(1000000, 2),
    ]);

    sim.step_until_time(1.5);
    assert_eq!(4, sim.broker.borrow().vm_count());

    // overload persists but the cooldown window admits no further clones
    sim.step_until_time(8.5);
    assert_eq!(4, sim.broker.borrow().vm_count());
    assert_eq!(2, sim.metrics_collector.borrow().total_scaled_up_vms);
}

#[test]
fn test_new_clones_are_admitted_after_cooldown_expires() {
    let suffix = format!(
        r#"
    hosts:
      - host_template:
          pe_count: 16
          mips_per_pe: 1000.0
          ram: 40000
          bw: 40000
          storage: 10000000
{}"#,
        horizontal_scaling_config(2.0)
    );
    let config = base_test_simulation_config(Some(&suffix));
    let mut sim = ElastisimSimulation::new(Rc::new(config));
    sim.initialize(None);
    sim.step_until_time(0.5);
    sim.submit_cloudlets(vec![
        full_cpu_cloudlet(1000000, 2),
        full_cpu_cloudlet(1000000, 2),
    ]);

    sim.step_until_time(2.5);
    assert_eq!(4, sim.broker.borrow().vm_count());
    // next window opens at t=3
    sim.step_until_time(4.5);
    assert_eq!(6, sim.broker.borrow().vm_count());
}

#[test]
fn test_rejected_clone_leaves_cluster_unchanged() {
    let suffix = r#"
    hosts:
      - host_template:
          pe_count: 4
          mips_per_pe: 1000.0
          ram: 20000
          bw: 20000
          storage: 10000000
    initial_vms:
      - vm_count: 2
        vm_template:
          mips: 1000.0
          pe_count: 2
          ram: 1000
          bw: 1000
          size: 10000
    horizontal_scaling:
      enabled: true
      cpu_overload_threshold: 0.7
      cooldown: 1.0
    "#;
    let config = base_test_simulation_config(Some(suffix));
    let mut sim = ElastisimSimulation::new(Rc::new(config));
    sim.initialize(None);
    sim.step_until_time(0.5);
    sim.submit_cloudlets(vec![
        full_cpu_cloudlet(1000000, 2),
        full_cpu_cloudlet(1000000, 2),
    ]);

    sim.step_until_time(4.5);
    // the host is full, every clone is rejected by the datacenter
    assert_eq!(2, sim.broker.borrow().vm_count());
    assert!(sim.metrics_collector.borrow().total_rejected_vms >= 1);
}

#[test]
fn test_custom_predicate_and_supplier_attached_programmatically() {
    let config = default_test_simulation_config(None);
    let mut sim = ElastisimSimulation::new(Rc::new(config));
    let vm_ids = sim.submit_vms(vec![
        Vm::new(1000.0, 2, 1000, 1000, 10000),
        Vm::new(1000.0, 2, 1000, 1000, 10000),
    ]);
    sim.attach_horizontal_scaling(
        vm_ids[0],
        HorizontalVmScalingPolicy::new(
            OverloadPredicate::Custom(Box::new(|sample| sample.cpu > 0.5)),
            VmSupplier::Custom(Box::new(|| Vm::new(1000.0, 1, 500, 500, 5000))),
            0.5,
        ),
    );
    sim.initialize(None);
    sim.submit_cloudlets(vec![
        full_cpu_cloudlet(1000000, 2),
        full_cpu_cloudlet(1000000, 2),
    ]);

    // the cooldown is shorter than the scan interval, one 1-pe clone per tick
    sim.step_until_time(3.5);
    assert_eq!(5, sim.broker.borrow().vm_count());
}
