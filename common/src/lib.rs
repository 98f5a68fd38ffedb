use serde::{Deserialize, Serialize};

pub type Real = f64;

pub type SlotId = u8;
pub type BatchId = u32;
pub type SerialId = u32;

/// Slots are numbered from 1; a test jig never carries more than this many.
pub const MAX_SLOTS_PER_BATCH: SlotId = 50;

/// Canonical file name for a channel's calibration artifact, shared by the
/// analyzer that writes it and the board tooling that reads it back.
pub fn calibration_file_name(
    sensor_type: &str,
    batch: BatchId,
    serial: SerialId,
    slot: SlotId,
) -> String {
    format!("{sensor_type}_Batch_{batch:05}_Serial_{serial:05}_Slot_{slot:02}_blv.json")
}

/// Glob pattern matching a sensor's calibration artifact across all slots,
/// for consumers which know which sensor they want but not where it sat in
/// the jig.
pub fn calibration_file_pattern(sensor_type: &str, batch: BatchId, serial: SerialId) -> String {
    format!("{sensor_type}_Batch_{batch:05}_Serial_{serial:05}_Slot_*_blv.json")
}

/// Summary of one retained optimized region, keyed for segment derivation
/// by its mean temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRange {
    pub start_time: Real,
    pub end_time: Real,
    pub num_samples: usize,
    pub mean_temperature: Real,
    pub mean_voltage: Real,
    pub stdev_voltage: Real,
}

/// One piecewise-linear baseline-voltage segment, anchored at the lower
/// of the two range temperatures it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSegment {
    pub temperature: Real,
    pub slope: Real,
    pub intercept: Real,
}

/// The complete calibration artifact for one sensor channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelCalibration {
    pub sensor_type: String,
    pub batch: BatchId,
    pub serial: SerialId,
    pub slot: SlotId,
    pub ranges: Vec<CalibrationRange>,
    pub segments: Vec<CalibrationSegment>,
    pub commands: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_names_are_zero_padded() {
        assert_eq!(
            calibration_file_name("NO2", 3, 14, 7),
            "NO2_Batch_00003_Serial_00014_Slot_07_blv.json"
        );
        assert_eq!(
            calibration_file_name("CO", 12345, 67890, 42),
            "CO_Batch_12345_Serial_67890_Slot_42_blv.json"
        );
    }

    #[test]
    fn artifact_pattern_matches_the_name_for_any_slot() {
        assert_eq!(
            calibration_file_pattern("CO", 3, 14),
            "CO_Batch_00003_Serial_00014_Slot_*_blv.json"
        );
    }
}
