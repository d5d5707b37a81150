// Interface for any workload scenario which serves as input to the simulator.

use crate::core::common::SimulationEvent;

// Any workload format should implement this method to convert its events to
// the format of events which are emitted to the broker component, defined in
// core::events. First element in the tuple is timestamp, second - event.
pub trait Workload {
    fn convert_to_simulator_events(&mut self) -> Vec<(f64, Box<dyn SimulationEvent>)>;
}
