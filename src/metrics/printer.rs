//! Printers for simulation results: the finished cloudlets table printed to
//! stdout and aggregated metrics written to a file as json or pretty table.

use prettytable::{row, Table};
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, fs::File, io::Write, rc::Rc};

use crate::core::cloudlet::FinishedCloudlet;
use crate::metrics::collector::{EstimatorWrapper, MetricsCollector};

#[derive(Debug, Default, Deserialize, PartialEq)]
pub enum OutputFormat {
    #[default]
    JSON,
    PrettyTable,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct MetricsPrinterConfig {
    #[serde(default)]
    pub format: OutputFormat,
    pub output_file: std::path::PathBuf,
}

/// Prints the finished cloudlets sorted by vm id and start time, the final
/// report of a simulation run.
pub fn print_finished_cloudlets(finished: &[FinishedCloudlet]) {
    let mut sorted: Vec<&FinishedCloudlet> = finished.iter().collect();
    sorted.sort_by(|a, b| {
        a.vm_id
            .cmp(&b.vm_id)
            .then(a.start_time.total_cmp(&b.start_time))
    });

    let mut table = Table::new();
    table.add_row(row![
        "Cloudlet", "VM", "Host", "Length", "PEs", "StartTime", "FinishTime", "ExecTime"
    ]);
    for cloudlet in sorted {
        table.add_row(row![
            cloudlet.cloudlet_id,
            cloudlet.vm_id,
            cloudlet.host_id,
            cloudlet.length,
            cloudlet.pe_count,
            format!("{:.2}", cloudlet.start_time),
            format!("{:.2}", cloudlet.finish_time),
            format!("{:.2}", cloudlet.execution_time())
        ]);
    }
    table.printstd();
}

pub fn print_metrics(collector: Rc<RefCell<MetricsCollector>>, config: &MetricsPrinterConfig) {
    match config.format {
        OutputFormat::PrettyTable => print_metrics_as_pretty_table(collector, &config.output_file),
        OutputFormat::JSON => print_metrics_as_json(collector, &config.output_file),
    }
}

pub fn print_metrics_as_pretty_table(
    collector: Rc<RefCell<MetricsCollector>>,
    output_file: &std::path::PathBuf,
) {
    let metrics = collector.borrow();
    let mut metrics_file = File::create(output_file).unwrap();

    let mut aggregated_table = Table::new();
    aggregated_table.add_row(row!["Metric", "Count"]);
    aggregated_table.add_row(row![
        "Total cloudlets submitted",
        metrics.total_cloudlets_submitted
    ]);
    aggregated_table.add_row(row!["Cloudlets finished", metrics.cloudlets_finished]);
    aggregated_table.add_row(row!["Total created vms", metrics.total_created_vms]);
    aggregated_table.add_row(row!["Total rejected vms", metrics.total_rejected_vms]);
    aggregated_table.add_row(row!["Total destroyed vms", metrics.total_destroyed_vms]);
    aggregated_table.add_row(row!["Total scaled up vms", metrics.total_scaled_up_vms]);
    aggregated_table.add_row(row![
        "Total resize requests",
        metrics.total_resize_requests
    ]);
    aggregated_table.add_row(row![
        "Total applied resizes",
        metrics.total_applied_resizes
    ]);
    aggregated_table.add_row(row![
        "Total rejected scaling requests",
        metrics.total_rejected_scaling_requests
    ]);

    let mut stats_table = Table::new();
    stats_table.add_row(row!["Metric", "Min", "Max", "Mean", "Variance"]);
    stats_table.add_row(row![
        "Cloudlet duration",
        metrics.cloudlet_duration_stats.min(),
        metrics.cloudlet_duration_stats.max(),
        metrics.cloudlet_duration_stats.mean(),
        metrics.cloudlet_duration_stats.population_variance()
    ]);
    stats_table.add_row(row![
        "Cloudlet wait time",
        metrics.cloudlet_wait_time_stats.min(),
        metrics.cloudlet_wait_time_stats.max(),
        metrics.cloudlet_wait_time_stats.mean(),
        metrics.cloudlet_wait_time_stats.population_variance()
    ]);
    stats_table.add_row(row![
        "Vm cpu utilization",
        metrics.vm_cpu_utilization_stats.min(),
        metrics.vm_cpu_utilization_stats.max(),
        metrics.vm_cpu_utilization_stats.mean(),
        metrics.vm_cpu_utilization_stats.population_variance()
    ]);

    let _ = aggregated_table.print(&mut metrics_file);
    let _ = stats_table.print(&mut metrics_file);
}

#[derive(Serialize)]
struct MetricsJSON {
    counters: Counters,
    timings: Timings,
}

#[derive(Serialize)]
struct Counters {
    total_cloudlets_submitted: u64,
    cloudlets_finished: u64,
    total_created_vms: u64,
    total_rejected_vms: u64,
    total_destroyed_vms: u64,
    total_scaled_up_vms: u64,
    total_resize_requests: u64,
    total_applied_resizes: u64,
    total_rejected_scaling_requests: u64,
}

#[derive(Serialize)]
struct Timings {
    cloudlet_duration: TimingsStats,
    cloudlet_wait_time: TimingsStats,
    vm_cpu_utilization: TimingsStats,
}

#[derive(Serialize)]
struct TimingsStats {
    min: f64,
    max: f64,
    mean: f64,
    variance: f64,
}

fn timings_stats(stats: &EstimatorWrapper) -> TimingsStats {
    TimingsStats {
        min: stats.min(),
        max: stats.max(),
        mean: stats.mean(),
        variance: stats.population_variance(),
    }
}

pub fn print_metrics_as_json(
    collector: Rc<RefCell<MetricsCollector>>,
    output_file: &std::path::PathBuf,
) {
    let metrics = collector.borrow();
    let mut metrics_file = File::create(output_file).unwrap();

    let metrics = MetricsJSON {
        counters: Counters {
            total_cloudlets_submitted: metrics.total_cloudlets_submitted,
            cloudlets_finished: metrics.cloudlets_finished,
            total_created_vms: metrics.total_created_vms,
            total_rejected_vms: metrics.total_rejected_vms,
            total_destroyed_vms: metrics.total_destroyed_vms,
            total_scaled_up_vms: metrics.total_scaled_up_vms,
            total_resize_requests: metrics.total_resize_requests,
            total_applied_resizes: metrics.total_applied_resizes,
            total_rejected_scaling_requests: metrics.total_rejected_scaling_requests,
        },
        timings: Timings {
            cloudlet_duration: timings_stats(&metrics.cloudlet_duration_stats),
            cloudlet_wait_time: timings_stats(&metrics.cloudlet_wait_time_stats),
            vm_cpu_utilization: timings_stats(&metrics.vm_cpu_utilization_stats),
        },
    };

    let serialized_json = serde_json::to_string_pretty(&metrics).unwrap();
    metrics_file.write_all(serialized_json.as_bytes()).unwrap();
}
