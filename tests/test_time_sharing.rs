use std::rc::Rc;

use dslab_elastisim::simulator::ElastisimSimulation;
use dslab_elastisim::test_util::helpers::{
    default_test_simulation_config, default_vm, full_cpu_cloudlet,
};

#[test]
fn test_equal_shares_under_saturation_and_exact_finish_times() {
    let config = default_test_simulation_config(None);
    let mut sim = ElastisimSimulation::new(Rc::new(config));
    sim.submit_vms(vec![default_vm()]);
    sim.initialize(None);

    // 4 identical cloudlets on a 2000 mips vm share 500 mips each
    sim.submit_cloudlets(vec![
        full_cpu_cloudlet(10000, 2),
        full_cpu_cloudlet(10000, 2),
        full_cpu_cloudlet(10000, 2),
        full_cpu_cloudlet(10000, 2),
    ]);
    sim.step_until_time(25.0);

    let broker = sim.broker.borrow();
    let finished = broker.finished_cloudlets();
    assert_eq!(4, finished.len());
    for cloudlet in finished {
        assert!((cloudlet.finish_time - 20.0).abs() < 1e-6);
        assert_eq!(0.0, cloudlet.start_time);
    }
}

#[test]
fn test_surplus_of_capped_consumer_is_redistributed() {
    let config = default_test_simulation_config(None);
    let mut sim = ElastisimSimulation::new(Rc::new(config));
    // 4 pes of 1000 mips
    let mut vm = default_vm();
    vm.pe_count = 4;
    sim.submit_vms(vec![vm]);
    sim.initialize(None);

    // equal share would be 2000, but the single-pe cloudlet can absorb only
    // 1000, so the wide one receives 3000 and both finish at t=10
    sim.submit_cloudlets(vec![
        full_cpu_cloudlet(10000, 1),
        full_cpu_cloudlet(30000, 4),
    ]);
    sim.step_until_time(15.0);

    let broker = sim.broker.borrow();
    let finished = broker.finished_cloudlets();
    assert_eq!(2, finished.len());
    for cloudlet in finished {
        assert!((cloudlet.finish_time - 10.0).abs() < 1e-6);
    }
}

#[test]
fn test_share_of_finished_cloudlet_is_granted_to_remaining_one() {
    let config = default_test_simulation_config(None);
    let mut sim = ElastisimSimulation::new(Rc::new(config));
    sim.submit_vms(vec![default_vm()]);
    sim.initialize(None);

    sim.submit_cloudlets(vec![
        full_cpu_cloudlet(10000, 2),
        full_cpu_cloudlet(30000, 2),
    ]);
    sim.step_until_time(25.0);

    let broker = sim.broker.borrow();
    let finished = broker.finished_cloudlets();
    assert_eq!(2, finished.len());
    let first = finished.iter().find(|c| c.cloudlet_id == 0).unwrap();
    let second = finished.iter().find(|c| c.cloudlet_id == 1).unwrap();
    // both run at 1000 mips until t=10, then the survivor gets all 2000
    assert!((first.finish_time - 10.0).abs() < 1e-6);
    assert!((second.finish_time - 20.0).abs() < 1e-6);
}

#[test]
fn test_cloudlet_queued_until_suitable_vm_exists() {
    let config = default_test_simulation_config(None);
    let mut sim = ElastisimSimulation::new(Rc::new(config));
    sim.initialize(None);

    sim.submit_cloudlets(vec![full_cpu_cloudlet(10000, 2)]);
    sim.step_until_time(2.0);
    assert_eq!(1, sim.broker.borrow().queued_cloudlet_count());
    assert_eq!(0, sim.broker.borrow().finished_cloudlets().len());

    sim.submit_vms(vec![default_vm()]);
    sim.step_until_time(10.0);
    assert_eq!(0, sim.broker.borrow().queued_cloudlet_count());
    // dispatched at t=2 at 2000 mips, finished 5 seconds later
    let broker = sim.broker.borrow();
    let finished = broker.finished_cloudlets();
    assert_eq!(1, finished.len());
    assert!((finished[0].finish_time - 7.0).abs() < 1e-6);
}
