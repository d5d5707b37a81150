//! Datacenter component owning the host table and the vm arena. It is the
//! only mutator of vm and cloudlet runtime state: it advances cloudlet
//! progress, applies scaling requests at tick boundaries and recomputes the
//! two-level time-shared allocation.
//!
//! The allocation cycle self-schedules at the scheduling interval, or
//! earlier when a cloudlet finish is predicted before the next boundary, so
//! finish times are exact. The cycle chain stops when no cloudlet is running
//! and no resize is pending, which lets the simulation drain.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use dslab_core::{cast, log_debug, log_warn, Event, EventHandler, SimulationContext};

use crate::config::SimulationConfig;
use crate::core::allocator::{ConsumerDemand, TimeSharedAllocator};
use crate::core::cloudlet::{Cloudlet, CloudletRun};
use crate::core::common::SimComponentId;
use crate::core::events::{
    CloudletFinishedRunning, CreateVmRequest, CreateVmResponse, DestroyVmRequest, ResizeVmRequest,
    ResizeVmResponse, RunAllocationCycle, ScheduleCloudletRequest, VmDestroyed,
    VmUtilizationRequest, VmUtilizationResponse,
};
use crate::core::host::Host;
use crate::core::vm::{Vm, VmRuntime, VmUtilizationSample};
use crate::metrics::collector::MetricsCollector;

/// Cloudlet is considered finished when its remaining length drops below
/// this tolerance.
const REMAINING_LENGTH_EPSILON: f64 = 1e-6;

struct HostRuntime {
    host: Host,
    used_pe_count: u32,
    used_ram: u64,
    used_bw: u64,
    used_storage: u64,
    vms: BTreeSet<u32>,
}

impl HostRuntime {
    fn new(host: Host) -> Self {
        Self {
            host,
            used_pe_count: 0,
            used_ram: 0,
            used_bw: 0,
            used_storage: 0,
            vms: Default::default(),
        }
    }

    fn can_fit(&self, vm: &Vm) -> bool {
        self.used_pe_count + vm.pe_count <= self.host.pe_count
            && self.used_ram + vm.ram <= self.host.ram
            && self.used_bw + vm.bw <= self.host.bw
            && self.used_storage + vm.size <= self.host.storage
    }
}

struct PendingResize {
    desired_pe_count: u32,
    requester: SimComponentId,
}

pub struct Datacenter {
    broker: SimComponentId,

    pub ctx: SimulationContext,
    config: Rc<SimulationConfig>,
    metrics_collector: Rc<RefCell<MetricsCollector>>,

    allocator: TimeSharedAllocator,
    hosts: BTreeMap<u32, HostRuntime>,
    vms: BTreeMap<u32, VmRuntime>,

    next_host_id: u32,
    last_update_time: f64,
    /// At most one pending resize per vm; applied at the start of the next
    /// allocation cycle.
    pending_resizes: BTreeMap<u32, PendingResize>,
    cycle_scheduled: bool,
}

impl Datacenter {
    pub fn new(
        broker: SimComponentId,
        ctx: SimulationContext,
        config: Rc<SimulationConfig>,
        metrics_collector: Rc<RefCell<MetricsCollector>>,
    ) -> Self {
        let allocator = TimeSharedAllocator::new(config.redistribution_mode);
        Self {
            broker,
            ctx,
            config,
            metrics_collector,
            allocator,
            hosts: Default::default(),
            vms: Default::default(),
            next_host_id: 0,
            last_update_time: 0.0,
            pending_resizes: Default::default(),
            cycle_scheduled: false,
        }
    }

    pub fn add_host(&mut self, mut host: Host) -> u32 {
        assert!(
            host.pe_count > 0 && host.mips_per_pe > 0.0,
            "host must have a positive capacity pool"
        );
        let host_id = self.next_host_id;
        self.next_host_id += 1;
        host.id = host_id;
        log_debug!(
            self.ctx,
            "Added host {} with {} pes of {} mips",
            host_id,
            host.pe_count,
            host.mips_per_pe
        );
        self.hosts.insert(host_id, HostRuntime::new(host));
        host_id
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn vm_count(&self) -> usize {
        self.vms.len()
    }

    pub fn vm_pe_count(&self, vm_id: u32) -> Option<u32> {
        self.vms.get(&vm_id).map(|vm_runtime| vm_runtime.vm.pe_count)
    }

    pub fn vm_running_cloudlet_count(&self, vm_id: u32) -> Option<usize> {
        self.vms.get(&vm_id).map(|vm_runtime| vm_runtime.cloudlets.len())
    }

    pub fn utilization_samples(&mut self, time: f64) -> Vec<VmUtilizationSample> {
        self.vms
            .values_mut()
            .map(|vm_runtime| vm_runtime.utilization_sample(time))
            .collect()
    }

    fn find_host_for(&self, vm: &Vm) -> Option<u32> {
        for (host_id, host_runtime) in self.hosts.iter() {
            if host_runtime.can_fit(vm) {
                return Some(*host_id);
            }
        }
        None
    }

    fn handle_create_vm(&mut self, time: f64, src: SimComponentId, vm: Vm) {
        let vm_id = vm.id;
        match self.find_host_for(&vm) {
            Some(host_id) => {
                self.advance_processing(time);
                let host_runtime = self.hosts.get_mut(&host_id).unwrap();
                host_runtime.used_pe_count += vm.pe_count;
                host_runtime.used_ram += vm.ram;
                host_runtime.used_bw += vm.bw;
                host_runtime.used_storage += vm.size;
                host_runtime.vms.insert(vm_id);
                log_debug!(
                    self.ctx,
                    "Created vm {} with {} pes on host {}",
                    vm_id,
                    vm.pe_count,
                    host_id
                );
                self.vms.insert(vm_id, VmRuntime::new(vm, host_id));
                self.metrics_collector.borrow_mut().total_created_vms += 1;
                self.reallocate(time);
                self.ctx.emit(
                    CreateVmResponse {
                        vm_id,
                        created: true,
                    },
                    src,
                    0.0,
                );
            }
            None => {
                log_warn!(self.ctx, "No host can fit vm {}, rejecting", vm_id);
                self.metrics_collector.borrow_mut().total_rejected_vms += 1;
                self.ctx.emit(
                    CreateVmResponse {
                        vm_id,
                        created: false,
                    },
                    src,
                    0.0,
                );
            }
        }
    }

    fn handle_destroy_vm(&mut self, time: f64, src: SimComponentId, vm_id: u32) {
        let vm_runtime = match self.vms.get(&vm_id) {
            Some(vm_runtime) => vm_runtime,
            None => {
                log_warn!(self.ctx, "Cannot destroy unknown vm {}", vm_id);
                return;
            }
        };
        if !vm_runtime.cloudlets.is_empty() {
            log_warn!(
                self.ctx,
                "Refusing to destroy vm {} with {} running cloudlets",
                vm_id,
                vm_runtime.cloudlets.len()
            );
            return;
        }
        self.advance_processing(time);
        let vm_runtime = self.vms.remove(&vm_id).unwrap();
        let host_runtime = self.hosts.get_mut(&vm_runtime.host_id).unwrap();
        host_runtime.used_pe_count -= vm_runtime.vm.pe_count;
        host_runtime.used_ram -= vm_runtime.vm.ram;
        host_runtime.used_bw -= vm_runtime.vm.bw;
        host_runtime.used_storage -= vm_runtime.vm.size;
        host_runtime.vms.remove(&vm_id);
        self.pending_resizes.remove(&vm_id);
        log_debug!(self.ctx, "Destroyed vm {} at {:.3}", vm_id, time);
        self.metrics_collector.borrow_mut().total_destroyed_vms += 1;
        self.reallocate(time);
        self.ctx.emit(VmDestroyed { vm_id }, src, 0.0);
    }

    fn handle_schedule_cloudlet(&mut self, time: f64, cloudlet: Cloudlet, vm_id: u32) {
        self.advance_processing(time);
        if !self.vms.contains_key(&vm_id) {
            log_warn!(
                self.ctx,
                "Dropping cloudlet {} scheduled to unknown vm {}",
                cloudlet.id,
                vm_id
            );
            return;
        }
        let run = CloudletRun::new(cloudlet, time);
        self.metrics_collector
            .borrow_mut()
            .cloudlet_wait_time_stats
            .add(time - run.cloudlet.status.submit_time);
        log_debug!(
            self.ctx,
            "Started cloudlet {} on vm {} at {:.3}",
            run.cloudlet.id,
            vm_id,
            time
        );
        self.vms
            .get_mut(&vm_id)
            .unwrap()
            .cloudlets
            .insert(run.cloudlet.id, run);
        self.reallocate(time);
        self.schedule_next_cycle();
    }

    fn handle_resize_vm(
        &mut self,
        src: SimComponentId,
        vm_id: u32,
        desired_pe_count: u32,
    ) {
        if !self.vms.contains_key(&vm_id) {
            self.ctx.emit(
                ResizeVmResponse {
                    vm_id,
                    pe_count: 0,
                    resized: false,
                },
                src,
                0.0,
            );
            return;
        }
        self.pending_resizes.insert(
            vm_id,
            PendingResize {
                desired_pe_count,
                requester: src,
            },
        );
        self.schedule_next_cycle();
    }

    /// Applies queued resize requests between the progress advancement and
    /// the allocation pass of a cycle, so the allocator never observes a vm
    /// mid-resize.
    fn apply_pending_resizes(&mut self, time: f64) {
        let pending = std::mem::take(&mut self.pending_resizes);
        for (vm_id, resize) in pending {
            let (pe_count, resized) = self.apply_resize(time, vm_id, resize.desired_pe_count);
            self.ctx.emit(
                ResizeVmResponse {
                    vm_id,
                    pe_count,
                    resized,
                },
                resize.requester,
                0.0,
            );
        }
    }

    fn apply_resize(&mut self, time: f64, vm_id: u32, desired_pe_count: u32) -> (u32, bool) {
        let vm_runtime = match self.vms.get_mut(&vm_id) {
            Some(vm_runtime) => vm_runtime,
            None => return (0, false),
        };
        let current_pe_count = vm_runtime.vm.pe_count;
        if desired_pe_count == current_pe_count {
            return (current_pe_count, false);
        }
        let host_runtime = self.hosts.get_mut(&vm_runtime.host_id).unwrap();
        if desired_pe_count > current_pe_count {
            let grow_by = desired_pe_count - current_pe_count;
            if host_runtime.used_pe_count + grow_by > host_runtime.host.pe_count {
                log_warn!(
                    self.ctx,
                    "Rejecting resize of vm {} to {} pes, host {} has no headroom",
                    vm_id,
                    desired_pe_count,
                    vm_runtime.host_id
                );
                self.metrics_collector
                    .borrow_mut()
                    .total_rejected_scaling_requests += 1;
                return (current_pe_count, false);
            }
            host_runtime.used_pe_count += grow_by;
        } else {
            host_runtime.used_pe_count -= current_pe_count - desired_pe_count;
        }
        vm_runtime.vm.pe_count = desired_pe_count;
        log_debug!(
            self.ctx,
            "Resized vm {} from {} to {} pes at {:.3}",
            vm_id,
            current_pe_count,
            desired_pe_count,
            time
        );
        self.metrics_collector.borrow_mut().total_applied_resizes += 1;
        (desired_pe_count, true)
    }

    /// Advances cloudlet progress by the shares granted at the previous
    /// allocation pass. Re-delivery of the same instant is a no-op.
    fn advance_processing(&mut self, time: f64) {
        let dt = time - self.last_update_time;
        self.last_update_time = time;
        if dt <= 0.0 {
            return;
        }
        let mut finished: Vec<(u32, u64)> = vec![];
        for (vm_id, vm_runtime) in self.vms.iter_mut() {
            for (cloudlet_id, run) in vm_runtime.cloudlets.iter_mut() {
                if run.share_mips <= 0.0 {
                    continue;
                }
                run.remaining_length -= run.share_mips * dt;
                if run.remaining_length <= REMAINING_LENGTH_EPSILON {
                    run.remaining_length = 0.0;
                    finished.push((*vm_id, *cloudlet_id));
                }
            }
        }
        for (vm_id, cloudlet_id) in finished {
            let vm_runtime = self.vms.get_mut(&vm_id).unwrap();
            let host_id = vm_runtime.host_id;
            let run = vm_runtime.cloudlets.remove(&cloudlet_id).unwrap();
            log_debug!(
                self.ctx,
                "Cloudlet {} finished on vm {} at {:.3}",
                cloudlet_id,
                vm_id,
                time
            );
            self.ctx.emit(
                CloudletFinishedRunning {
                    cloudlet_id,
                    vm_id,
                    host_id,
                    length: run.cloudlet.length,
                    pe_count: run.cloudlet.pe_count,
                    start_time: run.start_time,
                    finish_time: time,
                },
                self.broker,
                0.0,
            );
        }
    }

    /// Recomputes both levels of the time-shared allocation and refreshes
    /// per-vm utilization samples.
    fn reallocate(&mut self, time: f64) {
        for host_runtime in self.hosts.values() {
            if host_runtime.vms.is_empty() {
                continue;
            }
            let consumers: Vec<ConsumerDemand> = host_runtime
                .vms
                .iter()
                .map(|vm_id| ConsumerDemand::new(*vm_id as u64, self.vms[vm_id].vm.total_mips()))
                .collect();
            let shares = self
                .allocator
                .allocate(host_runtime.host.total_mips(), &consumers);
            for (vm_id, share) in shares {
                self.vms.get_mut(&(vm_id as u32)).unwrap().allocated_mips = share;
            }
        }
        for (vm_id, vm_runtime) in self.vms.iter_mut() {
            if !vm_runtime.cloudlets.is_empty() {
                let per_pe_mips = vm_runtime.vm.mips;
                let consumers: Vec<ConsumerDemand> = vm_runtime
                    .cloudlets
                    .values()
                    .map(|run| ConsumerDemand::new(run.cloudlet.id, run.max_rate(per_pe_mips)))
                    .collect();
                let shares = self
                    .allocator
                    .allocate(vm_runtime.allocated_mips, &consumers);
                for run in vm_runtime.cloudlets.values_mut() {
                    run.share_mips = shares[&run.cloudlet.id];
                }
            }
            let sample = vm_runtime.utilization_sample(time);
            log_debug!(
                self.ctx,
                "Time {:.1}: vm {} cpu usage {:.2}% ({} pes, {} running cloudlets)",
                time,
                vm_id,
                sample.cpu * 100.0,
                sample.pe_count,
                sample.running_cloudlets
            );
            let mut metrics = self.metrics_collector.borrow_mut();
            metrics.vm_cpu_utilization_stats.add(sample.cpu);
            metrics.vm_ram_utilization_stats.add(sample.ram);
            metrics.vm_bw_utilization_stats.add(sample.bw);
        }
    }

    fn run_allocation_cycle(&mut self, time: f64) {
        self.cycle_scheduled = false;
        self.advance_processing(time);
        self.apply_pending_resizes(time);
        self.reallocate(time);
        self.schedule_next_cycle();
    }

    /// Schedules the next cycle at the scheduling interval or at the
    /// earliest predicted cloudlet finish, whichever comes first.
    fn schedule_next_cycle(&mut self) {
        if self.cycle_scheduled {
            return;
        }
        let mut delay = self.config.scheduling_interval;
        let mut has_work = !self.pending_resizes.is_empty();
        for vm_runtime in self.vms.values() {
            for run in vm_runtime.cloudlets.values() {
                has_work = true;
                if run.share_mips > 0.0 {
                    let finish_delay = run.remaining_length / run.share_mips;
                    delay = delay.min(finish_delay.max(REMAINING_LENGTH_EPSILON));
                }
            }
        }
        if has_work {
            self.cycle_scheduled = true;
            self.ctx.emit_self(RunAllocationCycle {}, delay);
        }
    }
}

impl EventHandler for Datacenter {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            CreateVmRequest { vm } => {
                self.handle_create_vm(event.time, event.src, vm);
            }
            DestroyVmRequest { vm_id } => {
                self.handle_destroy_vm(event.time, event.src, vm_id);
            }
            ScheduleCloudletRequest { cloudlet, vm_id } => {
                self.handle_schedule_cloudlet(event.time, cloudlet, vm_id);
            }
            ResizeVmRequest {
                vm_id,
                desired_pe_count,
            } => {
                self.handle_resize_vm(event.src, vm_id, desired_pe_count);
            }
            VmUtilizationRequest {} => {
                let samples = self.utilization_samples(event.time);
                self.ctx
                    .emit(VmUtilizationResponse { samples }, event.src, 0.0);
            }
            RunAllocationCycle {} => {
                self.run_allocation_cycle(event.time);
            }
        })
    }
}
