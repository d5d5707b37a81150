//! Workload generator component emitting deterministic batches of cloudlets
//! to the broker at a fixed interval until the total budget is exhausted.
//! Cloudlet lengths are drawn round-robin from a fixed ascending sequence to
//! keep scenarios reproducible.

use std::rc::Rc;

use dslab_core::{cast, log_debug, log_info, Event, EventHandler, SimulationContext};

use serde::Deserialize;

use crate::config::SimulationConfig;
use crate::core::cloudlet::Cloudlet;
use crate::core::common::SimComponentId;
use crate::core::events::{RunWorkloadGenerationCycle, SubmitCloudletsRequest};
use crate::core::utilization::interface::UtilizationModelConfig;

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct WorkloadGeneratorConfig {
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(default = "batch_size_default")]
    pub batch_size: u64,
    #[serde(default = "interval_default")]
    pub interval: f64,
    #[serde(default = "total_cloudlets_default")]
    pub total_cloudlets: u64,
    #[serde(default = "cloudlet_lengths_default")]
    pub cloudlet_lengths: Vec<u64>,
    #[serde(default = "cloudlet_pe_count_default")]
    pub cloudlet_pe_count: u32,
    #[serde(default = "cloudlet_file_size_default")]
    pub cloudlet_file_size: u64,
    #[serde(default = "cloudlet_file_size_default")]
    pub cloudlet_output_size: u64,
    #[serde(default = "cpu_utilization_default")]
    pub cpu_utilization: UtilizationModelConfig,
    #[serde(default = "shared_utilization_default")]
    pub ram_utilization: UtilizationModelConfig,
    #[serde(default = "shared_utilization_default")]
    pub bw_utilization: UtilizationModelConfig,
}

fn enabled_default() -> bool {
    false // disabled by default
}
fn batch_size_default() -> u64 {
    20
}
fn interval_default() -> f64 {
    4.0 // 4 seconds
}
fn total_cloudlets_default() -> u64 {
    80
}
fn cloudlet_lengths_default() -> Vec<u64> {
    (1..=20).map(|step| step * 10000).collect()
}
fn cloudlet_pe_count_default() -> u32 {
    2
}
fn cloudlet_file_size_default() -> u64 {
    1024
}
fn cpu_utilization_default() -> UtilizationModelConfig {
    UtilizationModelConfig {
        model_name: "full".to_string(),
        config: String::new(),
    }
}
fn shared_utilization_default() -> UtilizationModelConfig {
    // each cloudlet requests 1/80 of the vm's ram and bw
    UtilizationModelConfig {
        model_name: "constant".to_string(),
        config: "usage: 0.0125".to_string(),
    }
}

impl Default for WorkloadGeneratorConfig {
    fn default() -> Self {
        Self {
            enabled: enabled_default(),
            batch_size: batch_size_default(),
            interval: interval_default(),
            total_cloudlets: total_cloudlets_default(),
            cloudlet_lengths: cloudlet_lengths_default(),
            cloudlet_pe_count: cloudlet_pe_count_default(),
            cloudlet_file_size: cloudlet_file_size_default(),
            cloudlet_output_size: cloudlet_file_size_default(),
            cpu_utilization: cpu_utilization_default(),
            ram_utilization: shared_utilization_default(),
            bw_utilization: shared_utilization_default(),
        }
    }
}

pub struct WorkloadGenerator {
    broker: SimComponentId,

    ctx: SimulationContext,
    config: Rc<SimulationConfig>,

    created: u64,
    /// Last time a batch was emitted, to detect repeated delivery of the
    /// same tick.
    last_emission_time: f64,
}

impl WorkloadGenerator {
    pub fn new(broker: SimComponentId, ctx: SimulationContext, config: Rc<SimulationConfig>) -> Self {
        let generator_config = &config.workload_generator;
        if generator_config.enabled {
            assert!(
                !generator_config.cloudlet_lengths.is_empty(),
                "cloudlet length sequence cannot be empty"
            );
            assert!(generator_config.batch_size > 0, "batch size must be positive");
            assert!(generator_config.interval > 0.0, "interval must be positive");
        }
        Self {
            broker,
            ctx,
            config,
            created: 0,
            last_emission_time: -1.0,
        }
    }

    pub fn start(&mut self) {
        log_info!(
            self.ctx,
            "Workload generator started emitting up to {} cloudlets every {} seconds, {} in total",
            self.config.workload_generator.batch_size,
            self.config.workload_generator.interval,
            self.config.workload_generator.total_cloudlets
        );
        self.ctx.emit_self_now(RunWorkloadGenerationCycle {});
    }

    pub fn created_cloudlets(&self) -> u64 {
        self.created
    }

    pub fn is_exhausted(&self) -> bool {
        self.created >= self.config.workload_generator.total_cloudlets
    }

    fn run_generation_cycle(&mut self, event_time: f64) {
        if event_time == self.last_emission_time {
            // repeated tick signal for the same instant
            return;
        }
        self.last_emission_time = event_time;

        let generator_config = &self.config.workload_generator;
        if self.created >= generator_config.total_cloudlets {
            return;
        }
        let batch = generator_config
            .batch_size
            .min(generator_config.total_cloudlets - self.created);
        let mut cloudlets = Vec::with_capacity(batch as usize);
        for _ in 0..batch {
            let length_index = (self.created % generator_config.cloudlet_lengths.len() as u64) as usize;
            cloudlets.push(Cloudlet {
                id: 0,
                length: generator_config.cloudlet_lengths[length_index],
                pe_count: generator_config.cloudlet_pe_count,
                file_size: generator_config.cloudlet_file_size,
                output_size: generator_config.cloudlet_output_size,
                cpu_utilization: generator_config.cpu_utilization.clone(),
                ram_utilization: generator_config.ram_utilization.clone(),
                bw_utilization: generator_config.bw_utilization.clone(),
                submission_delay: 0.0,
                status: Default::default(),
            });
            self.created += 1;
        }
        log_debug!(
            self.ctx,
            "Creating {} cloudlets at time {:.1}",
            batch,
            event_time
        );
        self.ctx
            .emit(SubmitCloudletsRequest { cloudlets }, self.broker, 0.0);

        if self.created < generator_config.total_cloudlets {
            self.ctx
                .emit_self(RunWorkloadGenerationCycle {}, generator_config.interval);
        }
    }
}

impl EventHandler for WorkloadGenerator {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            RunWorkloadGenerationCycle {} => {
                self.run_generation_cycle(event.time);
            }
        })
    }
}
