//! Shared definitions used by all simulation components.

use downcast_rs::{impl_downcast, Downcast};
use dyn_clone::{clone_trait_object, DynClone};
use erased_serde::serialize_trait_object;

use dslab_core::Id;

/// Identifier of a simulation component registered in the dslab simulation.
pub type SimComponentId = Id;

/// Marker trait for events exchanged between simulation components.
/// Events implementing it can be emitted both as concrete types and as boxed
/// trait objects read from workload scenario input.
pub trait SimulationEvent: erased_serde::Serialize + Downcast + DynClone {}

impl_downcast!(SimulationEvent);
clone_trait_object!(SimulationEvent);
serialize_trait_object!(SimulationEvent);
