//! Type definitions for cloudlets, the units of work executed by vms.

use serde::{Deserialize, Serialize};

use crate::core::utilization::interface::{
    resolve_utilization_model, UtilizationModel, UtilizationModelConfig,
};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Cloudlet {
    /// Assigned by the broker at submission, monotonic and never reused.
    /// A value present on a submitted spec is ignored.
    #[serde(default)]
    pub id: u64,
    /// Required processing length in abstract machine instructions.
    pub length: u64,
    /// Number of processing elements the cloudlet occupies on its vm.
    pub pe_count: u32,
    /// Input and output transfer sizes, opaque to the capacity model.
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub output_size: u64,
    /// Requested fraction of allocated capacity over elapsed execution time,
    /// one model per resource.
    #[serde(default = "full_utilization_default")]
    pub cpu_utilization: UtilizationModelConfig,
    #[serde(default = "full_utilization_default")]
    pub ram_utilization: UtilizationModelConfig,
    #[serde(default = "full_utilization_default")]
    pub bw_utilization: UtilizationModelConfig,
    /// Delay between submission to the broker and dispatch to a vm.
    #[serde(default)]
    pub submission_delay: f64,
    #[serde(default)]
    pub status: CloudletStatus,
}

fn full_utilization_default() -> UtilizationModelConfig {
    UtilizationModelConfig {
        model_name: "full".to_string(),
        config: String::new(),
    }
}

#[derive(Default, Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CloudletStatus {
    /// Time the cloudlet became ready for dispatch at the broker, after any
    /// submission delay elapsed.
    pub submit_time: f64,
}

impl Cloudlet {
    pub fn new(length: u64, pe_count: u32) -> Self {
        Self {
            id: 0,
            length,
            pe_count,
            file_size: 0,
            output_size: 0,
            cpu_utilization: full_utilization_default(),
            ram_utilization: full_utilization_default(),
            bw_utilization: full_utilization_default(),
            submission_delay: 0.0,
            status: Default::default(),
        }
    }
}

/// Runtime state of a cloudlet dispatched to a vm. Remaining length is
/// monotonically non-increasing and the cloudlet finishes exactly when it
/// reaches zero.
pub struct CloudletRun {
    pub cloudlet: Cloudlet,
    pub remaining_length: f64,
    /// Mips granted by the vm level of the time-shared allocator at the last
    /// allocation pass.
    pub share_mips: f64,
    pub start_time: f64,
    pub cpu_model: Box<dyn UtilizationModel>,
    pub ram_model: Box<dyn UtilizationModel>,
    pub bw_model: Box<dyn UtilizationModel>,
}

impl CloudletRun {
    pub fn new(cloudlet: Cloudlet, start_time: f64) -> Self {
        let cpu_model = resolve_utilization_model(&cloudlet.cpu_utilization);
        let ram_model = resolve_utilization_model(&cloudlet.ram_utilization);
        let bw_model = resolve_utilization_model(&cloudlet.bw_utilization);
        Self {
            remaining_length: cloudlet.length as f64,
            share_mips: 0.0,
            start_time,
            cloudlet,
            cpu_model,
            ram_model,
            bw_model,
        }
    }

    /// Maximum rate the cloudlet can absorb from the vm pool, bounded by its
    /// processing element count.
    pub fn max_rate(&self, per_pe_mips: f64) -> f64 {
        self.cloudlet.pe_count as f64 * per_pe_mips
    }
}

/// Record of a finished cloudlet kept by the broker for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedCloudlet {
    pub cloudlet_id: u64,
    pub vm_id: u32,
    pub host_id: u32,
    pub length: u64,
    pub pe_count: u32,
    pub start_time: f64,
    pub finish_time: f64,
}

impl FinishedCloudlet {
    pub fn execution_time(&self) -> f64 {
        self.finish_time - self.start_time
    }
}
