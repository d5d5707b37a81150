//! Represents generic yaml format for workload scenarios with explicit vm
//! and cloudlet submissions at given timestamps.

use std::mem::swap;

use serde::Deserialize;

use crate::core::cloudlet::Cloudlet;
use crate::core::common::SimulationEvent;
use crate::core::events::{SubmitCloudletsRequest, SubmitVmsRequest};
use crate::core::vm::Vm;
use crate::workload::interface::Workload;

/// GenericWorkload consists of timestamp-ordered submission events in the
/// format corresponding to this scenario type. These events differ from
/// events which are emitted by simulator's components, so to get such events
/// GenericWorkload implements Workload.
#[derive(Debug, Deserialize, PartialEq)]
pub struct GenericWorkload {
    pub events: Vec<WorkloadEvent>,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct WorkloadEvent {
    pub timestamp: f64, // in seconds
    pub event_type: WorkloadEventType,
}

#[derive(Debug, Deserialize, PartialEq)]
pub enum WorkloadEventType {
    SubmitVms { vms: Vec<Vm> },
    SubmitCloudlets { cloudlets: Vec<Cloudlet> },
}

impl Workload for GenericWorkload {
    // Called once to convert and move events.
    fn convert_to_simulator_events(&mut self) -> Vec<(f64, Box<dyn SimulationEvent>)> {
        let mut converted_events: Vec<(f64, Box<dyn SimulationEvent>)> = vec![];
        converted_events.reserve(self.events.len());

        let mut events: Vec<WorkloadEvent> = vec![];
        swap(&mut events, &mut self.events);

        for event in events {
            match event.event_type {
                WorkloadEventType::SubmitVms { vms } => {
                    converted_events.push((event.timestamp, Box::new(SubmitVmsRequest { vms })))
                }
                WorkloadEventType::SubmitCloudlets { cloudlets } => converted_events
                    .push((event.timestamp, Box::new(SubmitCloudletsRequest { cloudlets }))),
            }
        }

        converted_events
    }
}
