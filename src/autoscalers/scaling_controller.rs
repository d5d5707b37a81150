//! Scaling controller component, the orchestrator of the autoscaling loop.
//! Once per scan interval it pulls utilization samples from the datacenter,
//! evaluates the vertical and horizontal policies attached to vms and emits
//! resize requests to the datacenter and clone submissions to the broker.
//!
//! Per vm at most one resize is outstanding at any moment: a vm stays in the
//! resizing state from the request until the datacenter's response arrives,
//! and the policy is not evaluated for it in between. Duplicate delivery of
//! a cycle for an already processed instant is a no-op.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use dslab_core::{cast, log_debug, log_info, Event, EventHandler, SimulationContext};

use serde::Deserialize;

use crate::autoscalers::horizontal_vm_scaling::HorizontalVmScalingPolicy;
use crate::autoscalers::vertical_vm_scaling::VerticalVmScalingPolicy;
use crate::config::SimulationConfig;
use crate::core::common::SimComponentId;
use crate::core::events::{
    ResizeVmRequest, ResizeVmResponse, RunScalingControllerCycle, SubmitVmsRequest,
    VmUtilizationRequest, VmUtilizationResponse,
};
use crate::core::vm::VmUtilizationSample;
use crate::metrics::collector::MetricsCollector;

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ScalingControllerConfig {
    #[serde(default = "scan_interval_default")]
    pub scan_interval: f64,
}

fn scan_interval_default() -> f64 {
    1.0 // 1 second
}

impl Default for ScalingControllerConfig {
    fn default() -> Self {
        Self {
            scan_interval: scan_interval_default(),
        }
    }
}

pub struct ScalingController {
    broker: SimComponentId,
    datacenter: SimComponentId,

    vertical_policies: BTreeMap<u32, VerticalVmScalingPolicy>,
    horizontal_policies: BTreeMap<u32, HorizontalVmScalingPolicy>,
    /// Vms with an outstanding resize request.
    resizing_vms: BTreeSet<u32>,

    /// Last time a scaling cycle was started, to detect repeated delivery of
    /// the same tick.
    last_cycle_time: f64,

    ctx: SimulationContext,
    config: Rc<SimulationConfig>,

    metrics_collector: Rc<RefCell<MetricsCollector>>,
}

impl ScalingController {
    pub fn new(
        broker: SimComponentId,
        datacenter: SimComponentId,
        ctx: SimulationContext,
        config: Rc<SimulationConfig>,
        metrics_collector: Rc<RefCell<MetricsCollector>>,
    ) -> Self {
        Self {
            broker,
            datacenter,
            vertical_policies: Default::default(),
            horizontal_policies: Default::default(),
            resizing_vms: Default::default(),
            last_cycle_time: -1.0,
            ctx,
            config,
            metrics_collector,
        }
    }

    pub fn start(&mut self) {
        if self.vertical_policies.is_empty() && self.horizontal_policies.is_empty() {
            return;
        }
        log_info!(
            self.ctx,
            "Scaling controller started running every {} seconds",
            self.config.scaling_controller.scan_interval
        );
        self.ctx.emit_self_now(RunScalingControllerCycle {});
    }

    pub fn attach_vertical_scaling(&mut self, vm_id: u32, policy: VerticalVmScalingPolicy) {
        assert!(
            self.vertical_policies.insert(vm_id, policy).is_none(),
            "at most one vertical scaling policy per vm"
        );
    }

    pub fn attach_horizontal_scaling(&mut self, vm_id: u32, policy: HorizontalVmScalingPolicy) {
        assert!(
            self.horizontal_policies.insert(vm_id, policy).is_none(),
            "at most one horizontal scaling policy per vm"
        );
    }

    fn run_scaling_controller_cycle(&mut self, event_time: f64) {
        if event_time == self.last_cycle_time {
            // repeated tick signal for the same instant
            return;
        }
        self.last_cycle_time = event_time;
        self.ctx
            .emit(VmUtilizationRequest {}, self.datacenter, 0.0);
        // The cycle is rescheduled when the response with samples arrives.
    }

    fn evaluate_policies(&mut self, event_time: f64, samples: Vec<VmUtilizationSample>) {
        for sample in samples.iter() {
            self.evaluate_vertical_policy(sample);
            self.evaluate_horizontal_policy(event_time, sample);
        }
    }

    fn evaluate_vertical_policy(&mut self, sample: &VmUtilizationSample) {
        if self.resizing_vms.contains(&sample.vm_id) {
            return;
        }
        let policy = match self.vertical_policies.get(&sample.vm_id) {
            Some(policy) => policy,
            None => return,
        };
        if let Some(desired_pe_count) = policy.desired_pe_count(sample) {
            log_debug!(
                self.ctx,
                "Requesting resize of vm {} from {} to {} pes (cpu utilization {:.2})",
                sample.vm_id,
                sample.pe_count,
                desired_pe_count,
                sample.cpu
            );
            self.resizing_vms.insert(sample.vm_id);
            self.metrics_collector.borrow_mut().total_resize_requests += 1;
            self.ctx.emit(
                ResizeVmRequest {
                    vm_id: sample.vm_id,
                    desired_pe_count,
                },
                self.datacenter,
                0.0,
            );
        }
    }

    fn evaluate_horizontal_policy(&mut self, event_time: f64, sample: &VmUtilizationSample) {
        let policy = match self.horizontal_policies.get_mut(&sample.vm_id) {
            Some(policy) => policy,
            None => return,
        };
        if !policy.should_scale_up(sample, event_time) {
            return;
        }
        if let Some(max_scaled_vms) = self.config.horizontal_scaling.max_scaled_vms {
            if self.metrics_collector.borrow().total_scaled_up_vms >= max_scaled_vms {
                return;
            }
        }
        let vm = policy.supply_vm(event_time);
        log_debug!(
            self.ctx,
            "Vm {} is overloaded (cpu utilization {:.2}), scaling up a new vm",
            sample.vm_id,
            sample.cpu
        );
        self.metrics_collector.borrow_mut().total_scaled_up_vms += 1;
        self.ctx
            .emit(SubmitVmsRequest { vms: vec![vm] }, self.broker, 0.0);
    }

    fn handle_resize_response(&mut self, vm_id: u32, pe_count: u32, resized: bool) {
        self.resizing_vms.remove(&vm_id);
        if resized {
            log_debug!(self.ctx, "Vm {} resized to {} pes", vm_id, pe_count);
        } else {
            // the policy retries on a later qualifying tick
            log_debug!(self.ctx, "Resize of vm {} was rejected", vm_id);
        }
    }
}

impl EventHandler for ScalingController {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            RunScalingControllerCycle {} => {
                self.run_scaling_controller_cycle(event.time);
            }
            VmUtilizationResponse { samples } => {
                self.evaluate_policies(event.time, samples);

                let mut delay = self.config.scaling_controller.scan_interval;
                if event.time - self.last_cycle_time > self.config.scaling_controller.scan_interval
                {
                    // schedule now as response waiting took longer than scan interval
                    delay = 0.0;
                }
                self.ctx.emit_self(RunScalingControllerCycle {}, delay);
            }
            ResizeVmResponse {
                vm_id,
                pe_count,
                resized,
            } => {
                self.handle_resize_response(vm_id, pe_count, resized);
            }
        })
    }
}
