//! Events which are exchanged between simulation components' handlers and
//! semantically are `SimulationEvent`s defined in `common.rs`.

extern crate self as dslab_elastisim;

use dslab_elastisim_derive::IsSimulationEvent;

use serde::Serialize;

use crate::core::cloudlet::Cloudlet;
use crate::core::vm::{Vm, VmUtilizationSample};

/// Event from scenario input, workload generator or horizontal scaling
/// policy to broker with request to admit new vms. The broker assigns fresh
/// ids and forwards one creation request per vm to the datacenter.
#[derive(Serialize, Clone, IsSimulationEvent)]
pub struct SubmitVmsRequest {
    pub vms: Vec<Vm>,
}

/// Event from scenario input or workload generator to broker with a batch of
/// new cloudlets. The broker assigns fresh ids and dispatches each cloudlet
/// to a running vm, deferring cloudlets with a submission delay.
#[derive(Serialize, Clone, IsSimulationEvent)]
pub struct SubmitCloudletsRequest {
    pub cloudlets: Vec<Cloudlet>,
}

/// Event from broker to datacenter with request to place a vm on some host.
#[derive(Serialize, Clone, IsSimulationEvent)]
pub struct CreateVmRequest {
    pub vm: Vm,
}

/// Event from datacenter back to broker telling whether the vm was admitted.
/// `created` is false when no host can fit the vm.
#[derive(Serialize, Clone, IsSimulationEvent)]
pub struct CreateVmResponse {
    pub vm_id: u32,
    pub created: bool,
}

/// Event from broker to datacenter to start executing a cloudlet on the vm
/// it was mapped to.
#[derive(Serialize, Clone, IsSimulationEvent)]
pub struct ScheduleCloudletRequest {
    pub cloudlet: Cloudlet,
    pub vm_id: u32,
}

/// Event from datacenter to broker to inform that a cloudlet ran to
/// completion.
#[derive(Serialize, Clone, IsSimulationEvent)]
pub struct CloudletFinishedRunning {
    pub cloudlet_id: u64,
    pub vm_id: u32,
    pub host_id: u32,
    pub length: u64,
    pub pe_count: u32,
    pub start_time: f64,
    pub finish_time: f64,
}

/// Event from scaling controller to datacenter with request to change the
/// processing element count of a vm. Applied atomically at the start of the
/// next allocation cycle, never mid-allocation.
#[derive(Serialize, Clone, IsSimulationEvent)]
pub struct ResizeVmRequest {
    pub vm_id: u32,
    pub desired_pe_count: u32,
}

/// Event from datacenter to scaling controller telling whether the resize
/// took effect. `resized` is false when the vm's host has no headroom for
/// the increase or the vm no longer exists; the policy may retry on a later
/// qualifying tick.
#[derive(Serialize, Clone, IsSimulationEvent)]
pub struct ResizeVmResponse {
    pub vm_id: u32,
    pub pe_count: u32,
    pub resized: bool,
}

/// Event from scaling controller to datacenter asking for fresh utilization
/// samples of all vms.
#[derive(Serialize, Clone, IsSimulationEvent)]
pub struct VmUtilizationRequest {}

/// Event from datacenter to scaling controller with utilization samples of
/// all vms ordered by ascending vm id.
#[derive(Serialize, Clone, IsSimulationEvent)]
pub struct VmUtilizationResponse {
    pub samples: Vec<VmUtilizationSample>,
}

/// Event from broker to datacenter with request to destroy an idle vm and
/// free its host capacity.
#[derive(Serialize, Clone, IsSimulationEvent)]
pub struct DestroyVmRequest {
    pub vm_id: u32,
}

/// Event from datacenter to broker to inform that the vm is removed.
#[derive(Serialize, Clone, IsSimulationEvent)]
pub struct VmDestroyed {
    pub vm_id: u32,
}

/// Event from broker to itself to check whether a vm is still idle after the
/// destruction grace delay. The destruction is dropped when the vm received
/// new work in the meantime, observed by a changed `idle_since`.
#[derive(Serialize, Clone, IsSimulationEvent)]
pub struct TryDestroyIdleVm {
    pub vm_id: u32,
    pub idle_since: f64,
}

/// Event from datacenter to itself to run the next allocation cycle.
#[derive(Serialize, Clone, IsSimulationEvent)]
pub struct RunAllocationCycle {}

/// Event from scaling controller to itself to run the next scaling cycle.
#[derive(Serialize, Clone, IsSimulationEvent)]
pub struct RunScalingControllerCycle {}

/// Event from workload generator to itself to emit the next batch.
#[derive(Serialize, Clone, IsSimulationEvent)]
pub struct RunWorkloadGenerationCycle {}

// Expect event.data to be Box<Box<dyn SimulationEvent>> to downcast it first and then extract a real type.
#[macro_export]
macro_rules! cast_box {
    ( match $event:ident.data { $( $type:ident { $($tt:tt)* } => { $($expr:tt)* } )+ } ) => {
        if let Ok(boxed_event) = $event.data.clone().downcast::<Box<dyn $crate::core::common::SimulationEvent>>() {
            $(
                if boxed_event.is::<$type>() {
                    if let Ok(__value) = boxed_event.downcast::<$type>() {
                        let $type { $($tt)* } = *__value;
                        $($expr)*
                    }
                } else
            )*
            {
                log::error!("unhandled event: {:?}", serde_type_name::type_name(&boxed_event).unwrap());
            }
        } else {
            // Fallback to normal cast! if data.event is already Box<dyn SimulationEvent>.
            dslab_core::cast!(match $event.data { $( $type { $($tt)* } => { $($expr)* } )+ } );
        }
    }
}
