pub mod horizontal_vm_scaling;
pub mod scaling_controller;
pub mod vertical_vm_scaling;
