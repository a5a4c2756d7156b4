use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use generator::profile::{build_antenna_table, build_shower};
use grandcore::antenna::TabulatedAntennaModel;
use grandcore::shower::ShowerEvent;
use log::info;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use workflow::config::{SiteConfig, WorkflowConfig};
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Antenna voltages from radio shower simulations")]
struct Args {
    /// Ignore any simulation directory and run on a synthetic shower
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, default_value_t = 42.2281)]
    latitude: f64,
    #[arg(long, default_value_t = 86.6785)]
    longitude: f64,
    #[arg(long, default_value_t = 1100.0)]
    height: f64,
    /// Observation date (YYYY-MM-DD), required for magnetic antenna frames
    #[arg(long)]
    obstime: Option<NaiveDate>,
    /// CoREAS simulation directory
    #[arg(long)]
    shower: Option<PathBuf>,
    /// JSON effective length table
    #[arg(long)]
    antenna_model: Option<PathBuf>,
    /// WMM coefficient file
    #[arg(long)]
    geomagnet: Option<PathBuf>,
    /// Fixed magnetic declination in degrees
    #[arg(long, allow_negative_numbers = true)]
    declination: Option<f64>,
    #[arg(long, default_value = "tools/data/voltages.json")]
    output: PathBuf,
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = if let Some(path) = args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(
            SiteConfig {
                latitude: args.latitude,
                longitude: args.longitude,
                height: args.height,
            },
            args.obstime,
            args.shower,
            args.antenna_model,
            args.geomagnet,
            args.declination,
            args.output,
            args.seed,
        )
    };

    let frame = workflow_config.shower_frame()?;
    let event = match (&workflow_config.shower, args.offline) {
        (Some(path), false) => ShowerEvent::load(path, frame)
            .with_context(|| format!("loading shower from {}", path.display()))?,
        _ => build_shower(&workflow_config.generator, frame)
            .context("generating synthetic shower")?,
    };

    let model = match &workflow_config.antenna_model {
        Some(path) => TabulatedAntennaModel::load(path)
            .with_context(|| format!("loading antenna model {}", path.display()))?,
        None => TabulatedAntennaModel::from_table(build_antenna_table())
            .context("building synthetic antenna model")?,
    };
    let geomagnet = workflow_config.geomagnetic_field()?;

    let runner = Runner::new(workflow_config.clone(), Arc::new(model), geomagnet);
    let result = runner.execute(&event)?;

    let output = &runner.config().output;
    result.write_json(output)?;
    let metrics = result.metrics();
    println!(
        "Run -> antennas {}, failures {}, voltages written to {}",
        metrics.processed,
        metrics.errors,
        output.display()
    );

    let summary = result.summary();
    info!("{}", summary);
    let report_path = output.with_extension("log");
    if let Some(parent) = report_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&report_path)
        .with_context(|| format!("opening summary log {}", report_path.display()))?;
    file.write_all(format!("{}\n", summary).as_bytes())?;

    Ok(())
}
