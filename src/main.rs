use clap::Parser;
use log::info;
use std::env;
use std::rc::Rc;

use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};

use dslab_elastisim::config::SimulationConfig;
use dslab_elastisim::metrics::printer::print_finished_cloudlets;
use dslab_elastisim::simulation_callbacks::RunUntilAllCloudletsFinishedCallbacks;
use dslab_elastisim::simulator::ElastisimSimulation;
use dslab_elastisim::workload::generic::GenericWorkload;
use dslab_elastisim::workload::interface::Workload;

#[derive(Parser)]
struct Args {
    #[clap(short, long)]
    config_file: std::path::PathBuf,
    /// Optional scenario with explicit vm and cloudlet submissions, applied
    /// in addition to the workload generator from config.
    #[clap(short, long)]
    workload_file: Option<std::path::PathBuf>,
}

fn init_logging(config: &SimulationConfig) {
    // log level INFO by default
    let mut env_logger_builder = env_logger::builder();
    if env::var("RUST_LOG").is_err() {
        env_logger_builder.filter_level(log::LevelFilter::Info);
    }
    if let Some(logs_filepath) = &config.logs_filepath {
        let log_file = FileRotate::new(
            logs_filepath,
            AppendCount::new(3),
            ContentLimit::Lines(500000),
            Compression::None,
            #[cfg(unix)]
            None,
        );
        env_logger_builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    }
    env_logger_builder.init();
}

fn main() {
    let args = Args::parse();

    let config_yaml =
        std::fs::read_to_string(&args.config_file).expect("could not read config file");
    let config = Rc::new(serde_yaml::from_str::<SimulationConfig>(&config_yaml).unwrap());

    init_logging(&config);
    info!(
        "Path to config file: {:?}",
        args.config_file.canonicalize().unwrap()
    );

    let mut workload = args.workload_file.as_ref().map(|workload_file| {
        info!(
            "Path to workload file: {:?}",
            workload_file.canonicalize().unwrap()
        );
        let workload_yaml =
            std::fs::read_to_string(workload_file).expect("could not read workload file");
        serde_yaml::from_str::<GenericWorkload>(&workload_yaml).unwrap()
    });

    let mut elastisim_simulation = ElastisimSimulation::new(config);
    elastisim_simulation.initialize(workload.as_mut().map(|w| w as &mut dyn Workload));
    elastisim_simulation.run_with_callbacks(Box::new(RunUntilAllCloudletsFinishedCallbacks {}));

    print_finished_cloudlets(elastisim_simulation.broker.borrow().finished_cloudlets());
}
