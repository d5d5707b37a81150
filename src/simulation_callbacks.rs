//! Simulation callbacks interface and implementations to define how simulator should behave on start,
//! step, finish and when it should stop running.

use log::info;

use crate::{metrics::printer::print_metrics, simulator::ElastisimSimulation};

pub trait SimulationCallbacks {
    /// Runs before starting a simulation run.
    fn on_simulation_start(&mut self, _sim: &mut ElastisimSimulation) {}

    /// Runs on each step of a simulation run, returns false if the simulation must be stopped.
    fn on_step(&mut self, _sim: &mut ElastisimSimulation) -> bool {
        true
    }

    /// Runs upon the completion of a simulation run.
    fn on_simulation_finish(&mut self, _sim: &mut ElastisimSimulation) {}
}

pub struct RunUntilAllCloudletsFinishedCallbacks {}

/// Returns true when the workload generator has nothing more to emit and
/// every submitted cloudlet ran to completion.
fn all_cloudlets_finished(sim: &mut ElastisimSimulation) -> bool {
    if sim.config.workload_generator.enabled && !sim.workload_generator.borrow().is_exhausted() {
        return false;
    }
    let metrics = sim.metrics_collector.borrow();
    metrics.total_cloudlets_submitted > 0
        && metrics.cloudlets_finished >= metrics.total_cloudlets_submitted
}

impl SimulationCallbacks for RunUntilAllCloudletsFinishedCallbacks {
    fn on_step(&mut self, sim: &mut ElastisimSimulation) -> bool {
        !all_cloudlets_finished(sim)
    }

    fn on_simulation_finish(&mut self, sim: &mut ElastisimSimulation) {
        let metrics = sim.metrics_collector.borrow();
        info!(
            "Processed {} out of {} cloudlets",
            metrics.cloudlets_finished, metrics.total_cloudlets_submitted
        );
        assert_eq!(metrics.cloudlets_finished, metrics.total_cloudlets_submitted);
        drop(metrics);

        if let Some(printer_config) = sim.config.metrics_printer.as_ref() {
            print_metrics(sim.metrics_collector.clone(), printer_config);
        }
    }
}

/// Stops when all cloudlets are finished or the deadline is reached,
/// whichever comes first. Useful for scenarios with scaling policies that
/// keep rescheduling their cycles forever.
pub struct RunUntilDeadlineCallbacks {
    deadline_time: f64,
}

impl RunUntilDeadlineCallbacks {
    pub fn new(deadline_time: f64) -> Self {
        Self { deadline_time }
    }
}

impl SimulationCallbacks for RunUntilDeadlineCallbacks {
    fn on_step(&mut self, sim: &mut ElastisimSimulation) -> bool {
        sim.sim.time() < self.deadline_time && !all_cloudlets_finished(sim)
    }

    fn on_simulation_finish(&mut self, sim: &mut ElastisimSimulation) {
        if let Some(printer_config) = sim.config.metrics_printer.as_ref() {
            print_metrics(sim.metrics_collector.clone(), printer_config);
        }
    }
}
