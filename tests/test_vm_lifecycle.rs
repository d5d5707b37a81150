use std::rc::Rc;

use dslab_elastisim::simulator::ElastisimSimulation;
use dslab_elastisim::test_util::helpers::{
    default_test_simulation_config, default_vm, full_cpu_cloudlet,
};

fn destruction_delay_config() -> String {
    r#"
    vm_destruction_delay: 10.0
    "#
    .to_string()
}

#[test]
fn test_idle_vm_is_destroyed_after_grace_delay() {
    let config = default_test_simulation_config(Some(&destruction_delay_config()));
    let mut sim = ElastisimSimulation::new(Rc::new(config));
    sim.submit_vms(vec![default_vm()]);
    sim.initialize(None);

    // finishes at t=5, the vm becomes idle and is destroyed at t=15
    sim.submit_cloudlets(vec![full_cpu_cloudlet(10000, 2)]);

    sim.step_until_time(14.5);
    assert_eq!(1, sim.datacenter.borrow().vm_count());
    assert_eq!(1, sim.broker.borrow().vm_count());

    sim.step_until_time(15.5);
    assert_eq!(0, sim.datacenter.borrow().vm_count());
    assert_eq!(0, sim.broker.borrow().vm_count());
    assert_eq!(1, sim.metrics_collector.borrow().total_destroyed_vms);
}

#[test]
fn test_work_arriving_during_grace_delay_cancels_destruction() {
    let config = default_test_simulation_config(Some(&destruction_delay_config()));
    let mut sim = ElastisimSimulation::new(Rc::new(config));
    sim.submit_vms(vec![default_vm()]);
    sim.initialize(None);
    sim.submit_cloudlets(vec![full_cpu_cloudlet(10000, 2)]);

    // idle since t=5, destruction planned for t=15
    sim.step_until_time(12.0);
    sim.submit_cloudlets(vec![full_cpu_cloudlet(10000, 2)]);

    sim.step_until_time(15.5);
    // a vm holding running work is never destroyed
    assert_eq!(1, sim.datacenter.borrow().vm_count());
    assert_eq!(Some(1), sim.datacenter.borrow().vm_running_cloudlet_count(0));

    // the second cloudlet finishes at t=17, destruction happens at t=27
    sim.step_until_time(26.5);
    assert_eq!(1, sim.datacenter.borrow().vm_count());
    sim.step_until_time(27.5);
    assert_eq!(0, sim.datacenter.borrow().vm_count());
}

#[test]
fn test_vms_live_forever_without_destruction_delay() {
    let config = default_test_simulation_config(None);
    let mut sim = ElastisimSimulation::new(Rc::new(config));
    sim.submit_vms(vec![default_vm()]);
    sim.initialize(None);
    sim.submit_cloudlets(vec![full_cpu_cloudlet(10000, 2)]);

    sim.step_until_time(100.0);
    assert_eq!(1, sim.datacenter.borrow().vm_count());
    assert_eq!(1, sim.broker.borrow().finished_cloudlets().len());
}
