use std::rc::Rc;

use dslab_elastisim::simulator::ElastisimSimulation;
use dslab_elastisim::test_util::helpers::default_test_simulation_config;
use dslab_elastisim::workload::generic::GenericWorkload;
use dslab_elastisim::workload::interface::Workload;

fn get_workload() -> GenericWorkload {
    serde_yaml::from_str(
        &r#"
  events:
  - timestamp: 0.0
    event_type:
      !SubmitVms
        vms:
          - mips: 1000.0
            pe_count: 2
            ram: 1000
            bw: 1000
            size: 10000
  - timestamp: 3.0
    event_type:
      !SubmitCloudlets
        cloudlets:
          - length: 20000
            pe_count: 2
          - length: 10000
            pe_count: 2
            submission_delay: 2.0
  "#,
    )
    .unwrap()
}

#[test]
fn test_yaml_scenario_with_delayed_submissions_runs_to_completion() {
    let config = default_test_simulation_config(None);
    let mut sim = ElastisimSimulation::new(Rc::new(config));
    let mut workload = get_workload();
    sim.initialize(Some(&mut workload as &mut dyn Workload));

    sim.step_until_time(30.0);

    let broker = sim.broker.borrow();
    let finished = broker.finished_cloudlets();
    assert_eq!(2, finished.len());

    // the undelayed cloudlet starts at t=3 and runs alone until the delayed
    // one is dispatched at t=5
    let first = finished.iter().find(|c| c.cloudlet_id == 0).unwrap();
    let second = finished.iter().find(|c| c.cloudlet_id == 1).unwrap();
    assert!((first.start_time - 3.0).abs() < 1e-6);
    assert!((second.start_time - 5.0).abs() < 1e-6);

    // shares: 2000 for c0 until t=5, then 1000 each; c1 finishes at t=15
    // and c0 takes the full pool again for its remaining 6000
    assert!((second.finish_time - 15.0).abs() < 1e-6);
    assert!((first.finish_time - 18.0).abs() < 1e-6);

    assert_eq!(2, sim.metrics_collector.borrow().total_cloudlets_submitted);
    assert_eq!(2, sim.metrics_collector.borrow().cloudlets_finished);
}
