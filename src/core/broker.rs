//! Broker component implementing the submission bookkeeping: it assigns
//! monotonic never-reused ids to submitted vms and cloudlets, maps cloudlets
//! to running vms in cyclic round-robin order, collects finished-cloudlet
//! records for reporting and destroys vms that stay idle longer than the
//! configured grace delay.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::rc::Rc;

use dslab_core::{log_debug, log_warn, Event, EventHandler, SimulationContext};

use crate::cast_box;
use crate::config::SimulationConfig;
use crate::core::cloudlet::{Cloudlet, FinishedCloudlet};
use crate::core::common::SimComponentId;
use crate::core::events::{
    CloudletFinishedRunning, CreateVmRequest, CreateVmResponse, DestroyVmRequest,
    ScheduleCloudletRequest, SubmitCloudletsRequest, SubmitVmsRequest, TryDestroyIdleVm,
    VmDestroyed,
};
use crate::core::vm::Vm;
use crate::metrics::collector::MetricsCollector;

#[derive(Debug, PartialEq)]
enum VmState {
    /// Creation request sent to the datacenter, no response yet.
    Requested,
    Running,
    /// Destruction request sent to the datacenter, excluded from dispatch.
    Destroying,
}

struct BrokerVmEntry {
    vm: Vm,
    state: VmState,
    running_cloudlets: BTreeSet<u64>,
    /// Set when the vm became idle, cleared when new work arrives. Used to
    /// drop stale destruction checks.
    idle_since: Option<f64>,
}

pub struct Broker {
    datacenter: SimComponentId,

    pub ctx: SimulationContext,
    config: Rc<SimulationConfig>,
    metrics_collector: Rc<RefCell<MetricsCollector>>,

    next_vm_id: u32,
    next_cloudlet_id: u64,
    vms: BTreeMap<u32, BrokerVmEntry>,
    /// Cloudlets waiting for a suitable running vm.
    queued_cloudlets: VecDeque<Cloudlet>,
    /// Vm used by the last dispatch, for cyclic round-robin mapping.
    last_dispatched_vm: Option<u32>,
    finished: Vec<FinishedCloudlet>,
}

impl Broker {
    pub fn new(
        datacenter: SimComponentId,
        ctx: SimulationContext,
        config: Rc<SimulationConfig>,
        metrics_collector: Rc<RefCell<MetricsCollector>>,
    ) -> Self {
        Self {
            datacenter,
            ctx,
            config,
            metrics_collector,
            next_vm_id: 0,
            next_cloudlet_id: 0,
            vms: Default::default(),
            queued_cloudlets: Default::default(),
            last_dispatched_vm: None,
            finished: Vec::new(),
        }
    }

    pub fn vm_count(&self) -> usize {
        self.vms.len()
    }

    pub fn running_vm_count(&self) -> usize {
        self.vms
            .values()
            .filter(|entry| entry.state == VmState::Running)
            .count()
    }

    pub fn queued_cloudlet_count(&self) -> usize {
        self.queued_cloudlets.len()
    }

    pub fn finished_cloudlets(&self) -> &[FinishedCloudlet] {
        &self.finished
    }

    /// Assigns fresh ids to the submitted vms and requests their placement
    /// from the datacenter. Returns the assigned ids.
    pub fn submit_vms(&mut self, vms: Vec<Vm>) -> Vec<u32> {
        let mut assigned_ids = Vec::with_capacity(vms.len());
        for mut vm in vms {
            assert!(
                vm.pe_count > 0 && vm.mips > 0.0,
                "vm must have a positive capacity pool"
            );
            vm.id = self.next_vm_id;
            self.next_vm_id += 1;
            assigned_ids.push(vm.id);
            log_debug!(self.ctx, "Submitting vm {} to the datacenter", vm.id);
            self.vms.insert(
                vm.id,
                BrokerVmEntry {
                    vm: vm.clone(),
                    state: VmState::Requested,
                    running_cloudlets: Default::default(),
                    idle_since: None,
                },
            );
            self.ctx.emit(CreateVmRequest { vm }, self.datacenter, 0.0);
        }
        assigned_ids
    }

    /// Assigns fresh ids to ready cloudlets and dispatches them; cloudlets
    /// carrying a submission delay are resubmitted after the delay elapses.
    pub fn submit_cloudlets(&mut self, cloudlets: Vec<Cloudlet>, time: f64) {
        for mut cloudlet in cloudlets {
            if cloudlet.submission_delay > 0.0 {
                let delay = cloudlet.submission_delay;
                cloudlet.submission_delay = 0.0;
                self.ctx.emit_self(
                    SubmitCloudletsRequest {
                        cloudlets: vec![cloudlet],
                    },
                    delay,
                );
                continue;
            }
            cloudlet.id = self.next_cloudlet_id;
            self.next_cloudlet_id += 1;
            cloudlet.status.submit_time = time;
            self.metrics_collector.borrow_mut().total_cloudlets_submitted += 1;
            self.dispatch_cloudlet(cloudlet);
        }
    }

    /// Cyclic round-robin over running vms with enough processing elements.
    /// Suitability is checked against the submitted vm spec, a later
    /// vertical resize does not change the mapping.
    fn select_vm(&mut self, cloudlet: &Cloudlet) -> Option<u32> {
        let suitable: Vec<u32> = self
            .vms
            .iter()
            .filter(|(_, entry)| {
                entry.state == VmState::Running && entry.vm.pe_count >= cloudlet.pe_count
            })
            .map(|(vm_id, _)| *vm_id)
            .collect();
        if suitable.is_empty() {
            return None;
        }
        let selected = match self.last_dispatched_vm {
            Some(last) => *suitable
                .iter()
                .find(|vm_id| **vm_id > last)
                .unwrap_or(&suitable[0]),
            None => suitable[0],
        };
        self.last_dispatched_vm = Some(selected);
        Some(selected)
    }

    fn dispatch_cloudlet(&mut self, cloudlet: Cloudlet) {
        match self.select_vm(&cloudlet) {
            Some(vm_id) => {
                let entry = self.vms.get_mut(&vm_id).unwrap();
                entry.running_cloudlets.insert(cloudlet.id);
                entry.idle_since = None;
                self.ctx
                    .emit(ScheduleCloudletRequest { cloudlet, vm_id }, self.datacenter, 0.0);
            }
            None => {
                log_debug!(
                    self.ctx,
                    "No suitable running vm for cloudlet {}, queueing",
                    cloudlet.id
                );
                self.queued_cloudlets.push_back(cloudlet);
            }
        }
    }

    fn dispatch_queued_cloudlets(&mut self) {
        let queued = std::mem::take(&mut self.queued_cloudlets);
        for cloudlet in queued {
            self.dispatch_cloudlet(cloudlet);
        }
    }

    fn handle_create_vm_response(&mut self, vm_id: u32, created: bool) {
        if !created {
            log_warn!(self.ctx, "Vm {} was rejected by the datacenter", vm_id);
            self.vms.remove(&vm_id);
            return;
        }
        self.vms.get_mut(&vm_id).unwrap().state = VmState::Running;
        self.dispatch_queued_cloudlets();
    }

    fn handle_cloudlet_finished(
        &mut self,
        cloudlet_id: u64,
        vm_id: u32,
        host_id: u32,
        length: u64,
        pe_count: u32,
        start_time: f64,
        finish_time: f64,
    ) {
        self.finished.push(FinishedCloudlet {
            cloudlet_id,
            vm_id,
            host_id,
            length,
            pe_count,
            start_time,
            finish_time,
        });
        let mut metrics = self.metrics_collector.borrow_mut();
        metrics.cloudlets_finished += 1;
        metrics.cloudlet_duration_stats.add(finish_time - start_time);
        drop(metrics);

        let entry = match self.vms.get_mut(&vm_id) {
            Some(entry) => entry,
            None => return,
        };
        entry.running_cloudlets.remove(&cloudlet_id);
        if entry.running_cloudlets.is_empty() {
            if let Some(delay) = self.config.vm_destruction_delay {
                entry.idle_since = Some(finish_time);
                self.ctx.emit_self(
                    TryDestroyIdleVm {
                        vm_id,
                        idle_since: finish_time,
                    },
                    delay,
                );
            }
        }
    }

    fn handle_try_destroy_idle_vm(&mut self, vm_id: u32, idle_since: f64) {
        let entry = match self.vms.get_mut(&vm_id) {
            Some(entry) => entry,
            None => return,
        };
        if entry.state != VmState::Running
            || !entry.running_cloudlets.is_empty()
            || entry.idle_since != Some(idle_since)
        {
            return;
        }
        entry.state = VmState::Destroying;
        log_debug!(
            self.ctx,
            "Vm {} stayed idle since {:.3}, destroying",
            vm_id,
            idle_since
        );
        self.ctx.emit(DestroyVmRequest { vm_id }, self.datacenter, 0.0);
    }
}

impl EventHandler for Broker {
    fn on(&mut self, event: Event) {
        // Scenario input arrives as Box<dyn SimulationEvent>, events from
        // other components arrive as concrete types; cast_box! handles both.
        cast_box!(match event.data {
            SubmitVmsRequest { vms } => {
                self.submit_vms(vms);
            }
            SubmitCloudletsRequest { cloudlets } => {
                self.submit_cloudlets(cloudlets, event.time);
            }
            CreateVmResponse { vm_id, created } => {
                self.handle_create_vm_response(vm_id, created);
            }
            CloudletFinishedRunning {
                cloudlet_id,
                vm_id,
                host_id,
                length,
                pe_count,
                start_time,
                finish_time,
            } => {
                self.handle_cloudlet_finished(
                    cloudlet_id,
                    vm_id,
                    host_id,
                    length,
                    pe_count,
                    start_time,
                    finish_time,
                );
            }
            VmDestroyed { vm_id } => {
                self.vms.remove(&vm_id);
            }
            TryDestroyIdleVm { vm_id, idle_since } => {
                self.handle_try_destroy_idle_vm(vm_id, idle_since);
            }
        })
    }
}
