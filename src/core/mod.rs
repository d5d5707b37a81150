pub mod allocator;
pub mod broker;
pub mod cloudlet;
pub mod common;
pub mod datacenter;
pub mod events;
pub mod host;
pub mod utilization;
pub mod vm;
