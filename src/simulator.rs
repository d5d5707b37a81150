//! Represents entry point for simulator and its config.

use log::info;
use std::time::Instant;
use std::{cell::RefCell, rc::Rc};

use dslab_core::simulation::Simulation;

use crate::autoscalers::horizontal_vm_scaling::HorizontalVmScalingPolicy;
use crate::autoscalers::scaling_controller::ScalingController;
use crate::autoscalers::vertical_vm_scaling::VerticalVmScalingPolicy;
use crate::config::SimulationConfig;
use crate::core::broker::Broker;
use crate::core::cloudlet::Cloudlet;
use crate::core::datacenter::Datacenter;
use crate::core::vm::Vm;
use crate::metrics::collector::MetricsCollector;
use crate::simulation_callbacks::SimulationCallbacks;
use crate::workload::generator::WorkloadGenerator;
use crate::workload::interface::Workload;

pub struct ElastisimSimulation {
    pub config: Rc<SimulationConfig>,
    pub sim: Simulation,

    pub broker: Rc<RefCell<Broker>>,
    pub datacenter: Rc<RefCell<Datacenter>>,
    pub scaling_controller: Rc<RefCell<ScalingController>>,
    pub workload_generator: Rc<RefCell<WorkloadGenerator>>,

    pub metrics_collector: Rc<RefCell<MetricsCollector>>,

    components_started: bool,
}

impl ElastisimSimulation {
    pub fn new(config: Rc<SimulationConfig>) -> Self {
        info!(
            "Creating elastisim simulation {:?} with config: {:?}",
            config.sim_name, config
        );

        let mut sim = Simulation::new(config.seed);
        let metrics_collector = Rc::new(RefCell::new(MetricsCollector::new()));

        // Register simulator components
        let datacenter_component_name = "datacenter";
        let broker_component_name = "broker";
        let scaling_controller_component_name = "scaling_controller";
        let workload_generator_component_name = "workload_generator";

        let datacenter_context = sim.create_context(datacenter_component_name);
        let broker_context = sim.create_context(broker_component_name);
        let scaling_controller_context = sim.create_context(scaling_controller_component_name);
        let workload_generator_context = sim.create_context(workload_generator_component_name);

        let datacenter_id = datacenter_context.id();
        let broker_id = broker_context.id();

        let datacenter = Rc::new(RefCell::new(Datacenter::new(
            broker_id,
            datacenter_context,
            config.clone(),
            metrics_collector.clone(),
        )));
        sim.add_handler(datacenter_component_name, datacenter.clone());

        let broker = Rc::new(RefCell::new(Broker::new(
            datacenter_id,
            broker_context,
            config.clone(),
            metrics_collector.clone(),
        )));
        sim.add_handler(broker_component_name, broker.clone());

        let scaling_controller = Rc::new(RefCell::new(ScalingController::new(
            broker_id,
            datacenter_id,
            scaling_controller_context,
            config.clone(),
            metrics_collector.clone(),
        )));
        sim.add_handler(scaling_controller_component_name, scaling_controller.clone());

        let workload_generator = Rc::new(RefCell::new(WorkloadGenerator::new(
            broker_id,
            workload_generator_context,
            config.clone(),
        )));
        sim.add_handler(workload_generator_component_name, workload_generator.clone());

        ElastisimSimulation {
            config,
            sim,
            broker,
            datacenter,
            scaling_controller,
            workload_generator,
            metrics_collector,
            components_started: false,
        }
    }

    /// Creates the default infrastructure from config, emits scenario events
    /// at their timestamps and starts the periodic components.
    pub fn initialize(&mut self, workload: Option<&mut dyn Workload>) {
        // Asserting we start with the current time = 0, then all delays in
        // emit() calls are equal to the timestamps of scenario events.
        assert_eq!(self.sim.time(), 0.0);

        self.initialize_default_infrastructure();

        if let Some(workload) = workload {
            // Client context for submitting scenario events to the broker
            let client = self.sim.create_context("client");
            let broker_id = self.broker.borrow().ctx.id();
            for (timestamp, event) in workload.convert_to_simulator_events().into_iter() {
                client.emit(event, broker_id, timestamp);
            }
        }

        self.start_components();
    }

    fn initialize_default_infrastructure(&mut self) {
        for host_group in self.config.hosts.clone().into_iter() {
            for _ in 0..host_group.host_count.unwrap_or(1) {
                self.datacenter
                    .borrow_mut()
                    .add_host(host_group.host_template.clone());
            }
        }
        for vm_group in self.config.initial_vms.clone().into_iter() {
            for _ in 0..vm_group.vm_count.unwrap_or(1) {
                self.submit_vm_with_configured_policies(vm_group.vm_template.clone());
            }
        }
    }

    /// Submits a vm through the broker and attaches the scaling policies
    /// enabled in config. Vms scaled up later inherit no policies.
    pub fn submit_vm_with_configured_policies(&mut self, vm: Vm) -> u32 {
        let vm_id = self.broker.borrow_mut().submit_vms(vec![vm.clone()])[0];
        if self.config.vertical_scaling.enabled {
            self.scaling_controller.borrow_mut().attach_vertical_scaling(
                vm_id,
                VerticalVmScalingPolicy::from_config(&self.config.vertical_scaling),
            );
        }
        if self.config.horizontal_scaling.enabled {
            self.scaling_controller
                .borrow_mut()
                .attach_horizontal_scaling(
                    vm_id,
                    HorizontalVmScalingPolicy::from_config(&self.config.horizontal_scaling, vm),
                );
        }
        vm_id
    }

    pub fn submit_vms(&mut self, vms: Vec<Vm>) -> Vec<u32> {
        self.broker.borrow_mut().submit_vms(vms)
    }

    pub fn submit_cloudlets(&mut self, cloudlets: Vec<Cloudlet>) {
        let time = self.sim.time();
        self.broker.borrow_mut().submit_cloudlets(cloudlets, time);
    }

    pub fn attach_vertical_scaling(&mut self, vm_id: u32, policy: VerticalVmScalingPolicy) {
        self.scaling_controller
            .borrow_mut()
            .attach_vertical_scaling(vm_id, policy);
    }

    pub fn attach_horizontal_scaling(&mut self, vm_id: u32, policy: HorizontalVmScalingPolicy) {
        self.scaling_controller
            .borrow_mut()
            .attach_horizontal_scaling(vm_id, policy);
    }

    fn start_components(&mut self) {
        if self.components_started {
            return;
        }
        self.components_started = true;
        if self.config.workload_generator.enabled {
            self.workload_generator.borrow_mut().start();
        }
        // no-op when no policies are attached
        self.scaling_controller.borrow_mut().start();
    }

    pub fn run_with_callbacks(&mut self, mut callbacks: Box<dyn SimulationCallbacks>) {
        self.start_components();

        callbacks.on_simulation_start(self);

        let t = Instant::now();
        while callbacks.on_step(self) {
            if !self.sim.step() {
                break;
            }
        }
        let duration = t.elapsed().as_secs_f64();
        info!(
            "Processed {} events in {:.2?}s ({:.0} events/s)",
            self.sim.event_count(),
            duration,
            self.sim.event_count() as f64 / duration
        );
        info!("Finished at {}", self.sim.time());

        callbacks.on_simulation_finish(self);
    }

    pub fn run_until_no_events(&mut self) {
        // Run simulation until completion of all events and measure time.
        self.start_components();

        let t = Instant::now();
        self.sim.step_until_no_events();
        let duration = t.elapsed().as_secs_f64();
        info!(
            "Processed {} events in {:.2?}s ({:.0} events/s)",
            self.sim.event_count(),
            duration,
            self.sim.event_count() as f64 / duration
        );
    }

    pub fn step(&mut self) -> bool {
        self.sim.step()
    }

    pub fn step_until_time(&mut self, time: f64) {
        self.sim.step_until_time(time);
    }

    /// Returns `true` if there could be more pending events and `false` otherwise.
    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        self.sim.step_for_duration(duration)
    }
}
