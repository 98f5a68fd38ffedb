mod profile;

use anyhow::Result;
use blv_common::{Real, SlotId};
use clap::Parser;
use profile::temperature_profile;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::path::PathBuf;
use tracing::info;

// cargo run --bin log-simulator -- --output-file usb0.csv --plateau-temperatures 20,25,30,35,40

/// Generates a synthetic plateau-cycling sensor log in the format the
/// analysis pipeline consumes.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, default_value = "usb0.csv")]
    output_file: PathBuf,

    /// Plateau temperatures in visit order, degC
    #[clap(long, value_delimiter = ',', default_value = "20,25,30,35,40")]
    plateau_temperatures: Vec<Real>,

    /// Temperature the jig idles at before the first ramp
    #[clap(long, default_value = "15.0")]
    start_temperature: Real,

    /// Samples spent ramping into each plateau
    #[clap(long, default_value = "50")]
    ramp_samples: usize,

    /// Samples spent holding each plateau
    #[clap(long, default_value = "150")]
    hold_samples: usize,

    /// Sensor type stamped on every row
    #[clap(long, default_value = "CO")]
    sensor_type: String,

    /// Populated jig slots, one voltage column each
    #[clap(long, value_delimiter = ',', default_value = "1")]
    slots: Vec<SlotId>,

    /// Generating baseline slope, volts per degC
    #[clap(long, default_value = "0.05")]
    voltage_slope: Real,

    /// Generating baseline intercept, volts
    #[clap(long, default_value = "-0.25")]
    voltage_intercept: Real,

    /// Standard deviation of the Gaussian voltage noise
    #[clap(long, default_value = "0.002")]
    noise_sd: Real,

    /// Nominal relative humidity
    #[clap(long, default_value = "45.0")]
    humidity: Real,

    /// Standard deviation of the humidity noise
    #[clap(long, default_value = "0.5")]
    humidity_noise_sd: Real,

    /// Seconds between samples
    #[clap(long, default_value = "1.0")]
    sample_period_seconds: Real,

    /// Blank every Nth voltage cell to exercise forward-fill downstream
    #[clap(long)]
    dropout_every: Option<usize>,

    /// RNG seed; identical seeds reproduce identical logs
    #[clap(long, default_value = "0")]
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Cli::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);
    let voltage_noise = Normal::new(0.0, args.noise_sd)?;
    let humidity_noise = Normal::new(0.0, args.humidity_noise_sd)?;

    let temperature = temperature_profile(
        args.start_temperature,
        &args.plateau_temperatures,
        args.ramp_samples,
        args.hold_samples,
    );

    let mut writer = csv::Writer::from_path(&args.output_file)?;
    let mut header = vec![
        "Timestamp".to_owned(),
        "Sensor_Type".to_owned(),
        "Temperature_degC".to_owned(),
        "Humidity_%".to_owned(),
    ];
    header.extend(args.slots.iter().map(|slot| format!("Slot_{slot:02}_V")));
    writer.write_record(&header)?;

    for (row, temperature) in temperature.iter().enumerate() {
        let mut record = vec![
            format!("{}", row as Real * args.sample_period_seconds),
            args.sensor_type.clone(),
            format!("{temperature:.4}"),
            format!("{:.2}", args.humidity + humidity_noise.sample(&mut rng)),
        ];
        for _ in &args.slots {
            let voltage = args.voltage_slope * temperature
                + args.voltage_intercept
                + voltage_noise.sample(&mut rng);
            let dropped = args
                .dropout_every
                .is_some_and(|period| period > 0 && row % period == period - 1);
            record.push(if dropped {
                String::new()
            } else {
                format!("{voltage:.5}")
            });
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;

    info!(
        "Wrote {} sample(s) across {} slot column(s) to {}",
        temperature.len(),
        args.slots.len(),
        args.output_file.display()
    );
    Ok(())
}
