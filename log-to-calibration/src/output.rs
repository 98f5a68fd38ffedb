use crate::{
    loader::{
        ChannelColumn, LogFile, HUMIDITY_COLUMN, SENSOR_TYPE_COLUMN, TEMPERATURE_COLUMN,
        TIMESTAMP_COLUMN,
    },
    plateau_detection::Real,
    processing::{ChannelResult, TemperatureAnalysis},
};
use blv_common::{calibration_file_name, CalibrationSegment, ChannelCalibration};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub(crate) enum OutputError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The textual command sequence a grooming station replays onto the board:
/// native sensitivity (when known), a baseline table clear, then one add
/// per segment. All numerics are fixed to 8 decimal places.
pub(crate) fn command_sequence(
    sensor_type: &str,
    native_sensitivity: Option<Real>,
    segments: &[CalibrationSegment],
) -> Vec<String> {
    let prefix = sensor_type.to_lowercase();
    let mut commands = Vec::new();
    if let Some(sensitivity) = native_sensitivity {
        commands.push(format!("{prefix}_sen {sensitivity:.8}"));
    }
    commands.push(format!("{prefix}_blv clear"));
    for segment in segments {
        commands.push(format!(
            "{prefix}_blv add {:.8} {:.8} {:.8}",
            segment.temperature, segment.slope, segment.intercept
        ));
    }
    commands
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// One augmented CSV per channel: the original columns followed by the
/// derived traces, temporally ordered like the input.
pub(crate) fn write_channel_csv(
    output_dir: &Path,
    log: &LogFile,
    analysis: &TemperatureAnalysis,
    column: &ChannelColumn,
    result: &ChannelResult,
) -> Result<PathBuf, OutputError> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!("{}.csv", column.name));
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record([
        TIMESTAMP_COLUMN,
        SENSOR_TYPE_COLUMN,
        TEMPERATURE_COLUMN,
        HUMIDITY_COLUMN,
        column.name.as_str(),
        "Temperature_filtered",
        "Temperature_slope",
        "Plateau_flag",
        "Optimized_flag",
        "Voltage_filtered",
        "Concentration_ppm",
    ])?;

    for row in 0..log.len() {
        writer.write_record([
            log.time[row].to_string(),
            log.sensor_type[row].clone(),
            log.temperature[row].to_string(),
            log.humidity[row].to_string(),
            column.voltage[row]
                .map(|voltage| voltage.to_string())
                .unwrap_or_default(),
            format!("{:.6}", analysis.filtered_temperature[row]),
            format!("{:.6}", analysis.temperature_slope[row]),
            flag(analysis.plateau_flags[row]).to_owned(),
            flag(result.optimized_flags[row]).to_owned(),
            format!("{:.6}", result.filtered_voltage[row]),
            result
                .concentration
                .as_ref()
                .map(|concentration| format!("{:.6}", concentration[row]))
                .unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    info!("Wrote {}", path.display());
    Ok(path)
}

/// The calibration artifact the board tooling reads back later.
pub(crate) fn write_calibration_json(
    output_dir: &Path,
    calibration: &ChannelCalibration,
) -> Result<PathBuf, OutputError> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(calibration_file_name(
        &calibration.sensor_type,
        calibration.batch,
        calibration.serial,
        calibration.slot,
    ));
    serde_json::to_writer_pretty(File::create(&path)?, calibration)?;
    info!("Wrote {}", path.display());
    Ok(path)
}

/// Cross-channel summary table, one row per surviving channel.
pub(crate) fn write_summary_csv(
    output_dir: &Path,
    channels: &[ChannelResult],
) -> Result<PathBuf, OutputError> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join("summary.csv");
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record([
        "Channel",
        "Column",
        "Slot",
        "Plateaus",
        "Regions",
        "Ranges",
        "Segments",
        "Sensitivity_nA_ppm",
    ])?;
    for (index, channel) in channels.iter().enumerate() {
        writer.write_record([
            index.to_string(),
            channel.name.clone(),
            channel.slot.to_string(),
            channel.num_plateaus.to_string(),
            channel.num_regions.to_string(),
            channel.calibration.ranges.len().to_string(),
            channel.calibration.segments.len().to_string(),
            channel
                .native_sensitivity
                .map(|sensitivity| sensitivity.to_string())
                .unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    info!("Wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments() -> Vec<CalibrationSegment> {
        vec![
            CalibrationSegment {
                temperature: 20.0,
                slope: 0.05,
                intercept: 0.0,
            },
            CalibrationSegment {
                temperature: 30.0,
                slope: 0.1,
                intercept: -1.5,
            },
        ]
    }

    #[test]
    fn command_sequence_is_sen_clear_then_adds() {
        let commands = command_sequence("CO", Some(4.25), &segments());
        assert_eq!(
            commands,
            vec![
                "co_sen 4.25000000",
                "co_blv clear",
                "co_blv add 20.00000000 0.05000000 0.00000000",
                "co_blv add 30.00000000 0.10000000 -1.50000000",
            ]
        );
    }

    #[test]
    fn missing_sensitivity_omits_the_sen_command() {
        let commands = command_sequence("NO2", None, &segments());
        assert_eq!(commands[0], "no2_blv clear");
        assert_eq!(commands.len(), 3);
    }
}
