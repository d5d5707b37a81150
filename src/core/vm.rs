//! Type definitions for virtual machines and their runtime state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::cloudlet::CloudletRun;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Vm {
    /// Assigned by the broker at submission, monotonic and never reused.
    /// A value present on a submitted spec is ignored.
    #[serde(default)]
    pub id: u32,
    /// Processing rate of a single processing element, in MIPS.
    pub mips: f64,
    /// Current number of allocated processing elements. Changed only by the
    /// datacenter when a resize request is applied.
    pub pe_count: u32,
    pub ram: u64,
    pub bw: u64,
    /// Image size, opaque to the capacity model.
    pub size: u64,
}

impl Vm {
    pub fn new(mips: f64, pe_count: u32, ram: u64, bw: u64, size: u64) -> Self {
        Self {
            id: 0,
            mips,
            pe_count,
            ram,
            bw,
            size,
        }
    }

    pub fn total_mips(&self) -> f64 {
        self.pe_count as f64 * self.mips
    }
}

/// Point-in-time utilization of a vm relative to its currently allocated
/// capacity. Cpu utilization is the sole input of scaling policies, ram and
/// bw feed diagnostics only.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct VmUtilizationSample {
    pub vm_id: u32,
    pub time: f64,
    /// Fractions in [0, 1].
    pub cpu: f64,
    pub ram: f64,
    pub bw: f64,
    pub pe_count: u32,
    pub allocated_mips: f64,
    pub running_cloudlets: usize,
}

/// Runtime state of a vm placed on a host. Owned by the datacenter arena and
/// referenced by vm id everywhere else.
pub struct VmRuntime {
    pub vm: Vm,
    pub host_id: u32,
    /// Mips granted by the host level of the time-shared allocator at the
    /// last allocation pass.
    pub allocated_mips: f64,
    pub cloudlets: BTreeMap<u64, CloudletRun>,
}

impl VmRuntime {
    pub fn new(vm: Vm, host_id: u32) -> Self {
        // until the first host-level pass the vm is granted its own capacity
        let allocated_mips = vm.total_mips();
        Self {
            vm,
            host_id,
            allocated_mips,
            cloudlets: Default::default(),
        }
    }

    /// Cpu utilization is the sum of the per-cloudlet requested fractions
    /// weighted by their processing element counts, relative to the vm's
    /// current processing element count, clipped to [0, 1]. Ram and bw are
    /// sums of the respective model values, clipped to [0, 1].
    pub fn utilization_sample(&mut self, time: f64) -> VmUtilizationSample {
        let mut cpu = 0.0;
        let mut ram = 0.0;
        let mut bw = 0.0;
        for run in self.cloudlets.values_mut() {
            let elapsed = time - run.start_time;
            cpu += run.cpu_model.current_utilization(elapsed) * run.cloudlet.pe_count as f64;
            ram += run.ram_model.current_utilization(elapsed);
            bw += run.bw_model.current_utilization(elapsed);
        }
        VmUtilizationSample {
            vm_id: self.vm.id,
            time,
            cpu: (cpu / self.vm.pe_count as f64).clamp(0.0, 1.0),
            ram: ram.clamp(0.0, 1.0),
            bw: bw.clamp(0.0, 1.0),
            pe_count: self.vm.pe_count,
            allocated_mips: self.allocated_mips,
            running_cloudlets: self.cloudlets.len(),
        }
    }
}
