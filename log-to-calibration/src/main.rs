mod loader;
mod output;
mod parameters;
mod plateau_detection;
mod processing;
mod sensitivity;

use anyhow::Result;
use blv_common::{BatchId, SerialId};
use clap::Parser;
use parameters::AnalysisParameters;
use sensitivity::SensitivityTable;
use std::path::PathBuf;
use tracing::info;

// cargo run --bin log-to-calibration -- --input-file usb0.csv --batch 3 --serial 14 --sensitivity-file sensors.csv

/// Locates stable temperature plateaus in a sensor test log and derives a
/// piecewise baseline-voltage calibration for every populated slot.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// CSV log recorded while the jig cycled through its temperature profile
    #[clap(short, long)]
    input_file: PathBuf,

    /// Directory receiving the per-channel CSVs, calibration artifacts and
    /// the summary table
    #[clap(short, long, default_value = "outputs")]
    output_dir: PathBuf,

    /// Batch number of the sensors under test
    #[clap(long)]
    batch: BatchId,

    /// Serial number of the test run
    #[clap(long)]
    serial: SerialId,

    /// Sensitivity database CSV; omit to skip concentration scaling
    #[clap(long)]
    sensitivity_file: Option<PathBuf>,

    #[command(flatten)]
    parameters: AnalysisParameters,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Cli::parse();

    let log = loader::load_log_file(&args.input_file)?;
    info!(
        "Loaded {} row(s) across {} channel column(s) from {}",
        log.len(),
        log.channels.len(),
        args.input_file.display()
    );

    let sensitivity = args
        .sensitivity_file
        .as_deref()
        .map(SensitivityTable::from_path)
        .transpose()?;

    let result = processing::process_log(
        &log,
        &args.parameters,
        sensitivity.as_ref(),
        args.batch,
        args.serial,
    )?;

    for channel in &result.channels {
        let column = log
            .channels
            .iter()
            .find(|column| column.name == channel.name)
            .expect("channel result should come from a loaded column");
        output::write_channel_csv(&args.output_dir, &log, &result.temperature, column, channel)?;
        output::write_calibration_json(&args.output_dir, &channel.calibration)?;
    }
    output::write_summary_csv(&args.output_dir, &result.channels)?;

    info!(
        "Finished: {} channel(s) calibrated, output in {}",
        result.channels.len(),
        args.output_dir.display()
    );
    Ok(())
}
