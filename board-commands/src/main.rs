mod boards;

use anyhow::{bail, Context, Result};
use blv_common::{calibration_file_pattern, BatchId, ChannelCalibration, SerialId};
use clap::Parser;
use std::{fs::File, path::PathBuf};
use tracing::{error, warn};

// cargo run --bin board-commands -- --batch 3 --serial 14 --json-folder outputs --boards-file sensor_boards.csv

/// Looks up the grooming command sequences for every gas sensor fitted to a
/// board and prints them, ready to replay onto the hardware.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Board batch number
    #[clap(long)]
    batch: BatchId,

    /// Board serial number
    #[clap(long)]
    serial: SerialId,

    /// Directory holding the calibration JSON artifacts
    #[clap(long, default_value = ".")]
    json_folder: PathBuf,

    /// Sensor boards database CSV
    #[clap(long)]
    boards_file: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Cli::parse();

    let sensors = boards::sensors_for_board(&args.boards_file, args.batch, args.serial)?;
    if sensors.is_empty() {
        bail!(
            "Couldn't find a record for sensor board batch #{} / serial #{}",
            args.batch,
            args.serial
        );
    }

    let mut printed_any = false;
    for sensor in &sensors {
        let pattern = args
            .json_folder
            .join(calibration_file_pattern(
                &sensor.sensor_type,
                sensor.batch,
                sensor.serial,
            ))
            .display()
            .to_string();
        let matches: Vec<PathBuf> = glob::glob(&pattern)
            .context("invalid artifact pattern")?
            .collect::<Result<_, _>>()?;

        match matches.as_slice() {
            [] => {
                error!(
                    "0 {} records found for batch {} serial {}, should have been exactly 1",
                    sensor.sensor_type, sensor.batch, sensor.serial
                );
                continue;
            }
            [path] => print_commands(path)?,
            many => {
                warn!(
                    "{} {} records found, should have been exactly 1; using {}",
                    many.len(),
                    sensor.sensor_type,
                    many[0].display()
                );
                print_commands(&many[0])?;
            }
        }
        printed_any = true;
    }

    if !printed_any {
        bail!("no calibration artifact found for any sensor on this board");
    }
    Ok(())
}

fn print_commands(path: &std::path::Path) -> Result<()> {
    let calibration: ChannelCalibration = serde_json::from_reader(File::open(path)?)
        .with_context(|| format!("malformed calibration artifact {}", path.display()))?;
    for command in &calibration.commands {
        println!("{command}");
    }
    Ok(())
}
