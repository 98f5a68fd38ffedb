use crate::{
    loader::{ChannelColumn, LogFile},
    output::command_sequence,
    parameters::AnalysisParameters,
    plateau_detection::{
        calibration::{build_ranges, build_segments, baseline_at},
        detectors::{cleaned_levels, pair_plateaus, EventFilter, LevelCrossingDetector, Plateau},
        error::FilterError,
        optimizer::{optimize_region, OptimizedRegion},
        window::{fill_forward, FiniteDifference, TwoPoleFilter, WindowFilter},
        Real,
    },
    sensitivity::SensitivityTable,
};
use blv_common::{BatchId, CalibrationRange, ChannelCalibration, SerialId, SlotId};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub(crate) enum ChannelError {
    #[error("{0}")]
    Filter(#[from] FilterError),
    #[error("no plateau produced an optimized region")]
    NoRegions,
}

#[derive(Debug, Error)]
pub(crate) enum RunError {
    #[error("every channel failed, nothing to report")]
    NoSurvivingChannels,
}

/// Stages shared by every channel: the filtered temperature trace, its
/// filtered slope, the debounce-cleaned flat flags and the plateau list.
#[derive(Debug, Clone)]
pub(crate) struct TemperatureAnalysis {
    pub(crate) filtered_temperature: Vec<Real>,
    pub(crate) temperature_slope: Vec<Real>,
    pub(crate) plateau_flags: Vec<bool>,
    pub(crate) plateaus: Vec<Plateau>,
}

/// Everything derived for one channel.
#[derive(Debug, Clone)]
pub(crate) struct ChannelResult {
    pub(crate) name: String,
    pub(crate) slot: SlotId,
    pub(crate) filtered_voltage: Vec<Real>,
    pub(crate) optimized_flags: Vec<bool>,
    pub(crate) concentration: Option<Vec<Real>>,
    pub(crate) native_sensitivity: Option<Real>,
    pub(crate) num_plateaus: usize,
    pub(crate) num_regions: usize,
    pub(crate) calibration: ChannelCalibration,
}

pub(crate) struct RunResult {
    pub(crate) temperature: TemperatureAnalysis,
    pub(crate) channels: Vec<ChannelResult>,
}

/// Filters the temperature trace and its derivative, thresholds the slope
/// into flat/transition flags and extracts the plateau list.
pub(crate) fn analyse_temperature(
    temperature: &[Real],
    parameters: &AnalysisParameters,
) -> TemperatureAnalysis {
    let filtered_temperature: Vec<Real> = temperature
        .iter()
        .copied()
        .window(TwoPoleFilter::new(
            parameters.stiffness_pole1,
            parameters.stiffness_pole2,
        ))
        .collect();

    let temperature_slope: Vec<Real> = filtered_temperature
        .iter()
        .copied()
        .window(FiniteDifference::new())
        .window(TwoPoleFilter::new(
            parameters.stiffness_pole1,
            parameters.stiffness_pole2,
        ))
        .collect();

    let transitions: Vec<_> = temperature_slope
        .iter()
        .map(|slope| slope.abs() < parameters.epsilon)
        .events(LevelCrossingDetector::new(
            parameters.minimum_samples_between_edges,
        ))
        .collect();

    let plateau_flags = cleaned_levels(temperature_slope.len(), &transitions);
    let plateaus = pair_plateaus(&transitions, temperature_slope.len());
    info!("Detected {} plateau(s)", plateaus.len());

    TemperatureAnalysis {
        filtered_temperature,
        temperature_slope,
        plateau_flags,
        plateaus,
    }
}

#[tracing::instrument(skip_all, fields(channel = %channel.name, num_regions))]
pub(crate) fn process_channel(
    channel: &ChannelColumn,
    analysis: &TemperatureAnalysis,
    time: &[Real],
    sensor_type: &str,
    parameters: &AnalysisParameters,
    native_sensitivity: Option<Real>,
    batch: BatchId,
    serial: SerialId,
) -> Result<ChannelResult, ChannelError> {
    let voltage = fill_forward(&channel.voltage)?;
    let filtered_voltage: Vec<Real> = voltage
        .iter()
        .copied()
        .window(TwoPoleFilter::new(
            parameters.stiffness_pole1,
            parameters.stiffness_pole2,
        ))
        .collect();

    let settings = parameters.search_settings();
    let regions: Vec<OptimizedRegion> = analysis
        .plateaus
        .iter()
        .filter_map(
            |plateau| match optimize_region(&filtered_voltage, plateau, &settings) {
                Ok(region) => Some(region),
                Err(e) => {
                    error!(
                        "Skipping plateau [{}, {}): {e}",
                        plateau.rising, plateau.falling
                    );
                    None
                }
            },
        )
        .collect();
    tracing::Span::current().record("num_regions", regions.len());
    if regions.is_empty() && !analysis.plateaus.is_empty() {
        return Err(ChannelError::NoRegions);
    }

    let retained = build_ranges(
        &regions,
        time,
        &analysis.filtered_temperature,
        &parameters.range_thresholds(),
    );
    let mut optimized_flags = vec![false; filtered_voltage.len()];
    for (region, _) in &retained {
        for flag in optimized_flags
            .iter_mut()
            .take(region.falling)
            .skip(region.rising)
        {
            *flag = true;
        }
    }
    let ranges: Vec<CalibrationRange> = retained.into_iter().map(|(_, range)| range).collect();
    let segments = build_segments(&ranges);

    let concentration = match (native_sensitivity, segments.is_empty()) {
        (Some(sensitivity), false) => Some(
            filtered_voltage
                .iter()
                .zip(&analysis.filtered_temperature)
                .map(|(voltage, temperature)| {
                    let baseline = baseline_at(&segments, *temperature).unwrap_or(*voltage);
                    (voltage - baseline) / sensitivity
                })
                .collect(),
        ),
        _ => None,
    };

    let commands = command_sequence(sensor_type, native_sensitivity, &segments);
    let calibration = ChannelCalibration {
        sensor_type: sensor_type.to_owned(),
        batch,
        serial,
        slot: channel.slot,
        ranges,
        segments,
        commands,
    };

    Ok(ChannelResult {
        name: channel.name.clone(),
        slot: channel.slot,
        filtered_voltage,
        optimized_flags,
        concentration,
        native_sensitivity,
        num_plateaus: analysis.plateaus.len(),
        num_regions: regions.len(),
        calibration,
    })
}

/// Runs the full pipeline over one loaded log. Channels are independent of
/// one another and processed in parallel; a failed channel is reported and
/// dropped without disturbing its siblings, and only a run with no
/// surviving channel at all fails outright.
pub(crate) fn process_log(
    log: &LogFile,
    parameters: &AnalysisParameters,
    sensitivity: Option<&SensitivityTable>,
    batch: BatchId,
    serial: SerialId,
) -> Result<RunResult, RunError> {
    let analysis = analyse_temperature(&log.temperature, parameters);
    let sensor_type = log.sensor_type.first().cloned().unwrap_or_default();

    let channels: Vec<ChannelResult> = log
        .channels
        .par_iter()
        .filter_map(|channel| {
            let native_sensitivity = sensitivity.and_then(|table| {
                let hit = table.lookup(batch, channel.slot);
                if hit.is_none() {
                    warn!(
                        "No sensitivity entry for batch {batch} slot {}, \
                         channel {} proceeds without concentration scaling",
                        channel.slot, channel.name
                    );
                }
                hit
            });
            match process_channel(
                channel,
                &analysis,
                &log.time,
                &sensor_type,
                parameters,
                native_sensitivity,
                batch,
                serial,
            ) {
                Ok(result) => Some(result),
                Err(e) => {
                    error!("Channel {} failed: {e}", channel.name);
                    None
                }
            }
        })
        .collect();

    if channels.is_empty() && !log.channels.is_empty() {
        return Err(RunError::NoSurvivingChannels);
    }
    Ok(RunResult {
        temperature: analysis,
        channels,
    })
}
