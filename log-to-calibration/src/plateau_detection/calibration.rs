use super::{optimizer::OptimizedRegion, Real};
use blv_common::{CalibrationRange, CalibrationSegment};
use itertools::Itertools;
use tracing::{error, warn};

/// Retention thresholds for optimized regions; a region failing either
/// never truly stabilized and must not contribute to the baseline curve.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RangeThresholds {
    pub(crate) minimum_sample_count: usize,
    pub(crate) minimum_duration_minutes: Real,
}

const SECONDS_PER_MINUTE: Real = 60.0;

/// Two ranges closer in temperature than this cannot support a slope.
const MINIMUM_TEMPERATURE_SPAN: Real = 1e-9;

/// Packages each retained optimized region into a calibration range and
/// re-sorts the result by ascending mean temperature (a test profile may
/// visit its plateaus in any order). The paired region is kept alongside so
/// the caller can mark retained samples in the output trace.
pub(crate) fn build_ranges(
    regions: &[OptimizedRegion],
    time: &[Real],
    filtered_temperature: &[Real],
    thresholds: &RangeThresholds,
) -> Vec<(OptimizedRegion, CalibrationRange)> {
    let mut ranges: Vec<(OptimizedRegion, CalibrationRange)> = regions
        .iter()
        .filter_map(|region| {
            let temperature = filtered_temperature.get(region.rising..region.falling)?;
            let start_time = *time.get(region.rising)?;
            let end_time = *time.get(region.falling - 1)?;
            let mean_temperature =
                temperature.iter().sum::<Real>() / region.num_samples as Real;

            if region.num_samples < thresholds.minimum_sample_count {
                warn!(
                    "Dropping range at {mean_temperature:.2} degC: only {} sample(s), need {}",
                    region.num_samples, thresholds.minimum_sample_count
                );
                return None;
            }
            let duration_minutes = (end_time - start_time) / SECONDS_PER_MINUTE;
            if duration_minutes < thresholds.minimum_duration_minutes {
                warn!(
                    "Dropping range at {mean_temperature:.2} degC: lasted {duration_minutes:.2} \
                     minute(s), need {}",
                    thresholds.minimum_duration_minutes
                );
                return None;
            }

            Some((
                region.clone(),
                CalibrationRange {
                    start_time,
                    end_time,
                    num_samples: region.num_samples,
                    mean_temperature,
                    mean_voltage: region.mean_voltage,
                    stdev_voltage: region.stdev_voltage,
                },
            ))
        })
        .collect();

    ranges.sort_by(|(_, lhs), (_, rhs)| {
        lhs.mean_temperature.total_cmp(&rhs.mean_temperature)
    });
    ranges
}

/// Derives one baseline-voltage segment per adjacent pair of
/// temperature-sorted ranges, anchored at the lower temperature. A pair of
/// ranges sharing a mean temperature cannot produce a finite slope; the
/// pair is reported and skipped rather than letting NaN or infinity into
/// the calibration.
pub(crate) fn build_segments(ranges: &[CalibrationRange]) -> Vec<CalibrationSegment> {
    ranges
        .iter()
        .tuple_windows()
        .filter_map(|(low, high)| {
            let temperature_span = high.mean_temperature - low.mean_temperature;
            if temperature_span.abs() < MINIMUM_TEMPERATURE_SPAN {
                error!(
                    "Calibration ranges at {:.4} and {:.4} degC coincide, skipping the pair",
                    low.mean_temperature, high.mean_temperature
                );
                return None;
            }
            let slope = (high.mean_voltage - low.mean_voltage) / temperature_span;
            let intercept = high.mean_voltage - slope * high.mean_temperature;
            Some(CalibrationSegment {
                temperature: low.mean_temperature,
                slope,
                intercept,
            })
        })
        .collect()
}

/// Evaluates the piecewise baseline at `temperature`: the segment with the
/// greatest anchor at or below it, clamped to the first and last segments
/// outside the calibrated span. None when no segments were derived.
pub(crate) fn baseline_at(segments: &[CalibrationSegment], temperature: Real) -> Option<Real> {
    let segment = segments
        .iter()
        .take_while(|segment| segment.temperature <= temperature)
        .last()
        .or_else(|| segments.first())?;
    Some(segment.slope * temperature + segment.intercept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn region(rising: usize, falling: usize, mean_voltage: Real) -> OptimizedRegion {
        OptimizedRegion {
            rising,
            falling,
            num_samples: falling - rising,
            mean_voltage,
            stdev_voltage: 0.0,
        }
    }

    fn range(mean_temperature: Real, mean_voltage: Real) -> CalibrationRange {
        CalibrationRange {
            start_time: 0.0,
            end_time: 600.0,
            num_samples: 100,
            mean_temperature,
            mean_voltage,
            stdev_voltage: 0.0,
        }
    }

    fn thresholds() -> RangeThresholds {
        RangeThresholds {
            minimum_sample_count: 4,
            minimum_duration_minutes: 0.0,
        }
    }

    #[test]
    fn two_point_segment_matches_hand_computation() {
        let segments = build_segments(&[range(20.0, 1.0), range(40.0, 2.0)]);
        assert_eq!(segments.len(), 1);
        assert_approx_eq!(segments[0].temperature, 20.0, 1e-12);
        assert_approx_eq!(segments[0].slope, 0.05, 1e-12);
        assert_approx_eq!(segments[0].intercept, 0.0, 1e-12);
    }

    #[test]
    fn coincident_temperatures_are_skipped_not_propagated() {
        let segments = build_segments(&[
            range(20.0, 1.0),
            range(20.0, 1.5),
            range(40.0, 2.0),
        ]);
        assert_eq!(segments.len(), 1);
        assert!(segments.iter().all(|s| s.slope.is_finite()));
    }

    #[test]
    fn ranges_are_sorted_by_temperature_not_visit_order() {
        // Profile cycles 30 -> 10 -> 20 degrees.
        let time: Vec<Real> = (0..30).map(|i| i as Real * 60.0).collect();
        let temperature: Vec<Real> = (0..30)
            .map(|i| match i / 10 {
                0 => 30.0,
                1 => 10.0,
                _ => 20.0,
            })
            .collect();
        let regions = vec![
            region(0, 10, 3.0),
            region(10, 20, 1.0),
            region(20, 30, 2.0),
        ];
        let ranges = build_ranges(&regions, &time, &temperature, &thresholds());
        let temperatures: Vec<Real> = ranges
            .iter()
            .map(|(_, range)| range.mean_temperature)
            .collect();
        assert_eq!(temperatures, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn short_and_brief_ranges_are_dropped() {
        let time: Vec<Real> = (0..40).map(|i| i as Real).collect();
        let temperature = vec![25.0; 40];
        let regions = vec![region(0, 3, 1.0), region(10, 30, 1.0)];
        let thresholds = RangeThresholds {
            minimum_sample_count: 4,
            minimum_duration_minutes: 0.1,
        };
        let ranges = build_ranges(&regions, &time, &temperature, &thresholds);
        // The 3-sample region fails the count check; the 20-sample region
        // spans 19 seconds and passes the 0.1 minute duration check.
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].0.rising, 10);
    }

    #[test]
    fn baseline_interpolates_and_clamps() {
        let segments = vec![
            CalibrationSegment {
                temperature: 20.0,
                slope: 0.05,
                intercept: 0.0,
            },
            CalibrationSegment {
                temperature: 30.0,
                slope: 0.10,
                intercept: -1.5,
            },
        ];
        // Inside the first span.
        assert_approx_eq!(baseline_at(&segments, 25.0).unwrap(), 1.25, 1e-12);
        // Above the last anchor: the last segment extends.
        assert_approx_eq!(baseline_at(&segments, 40.0).unwrap(), 2.5, 1e-12);
        // Below the first anchor: clamped to the first segment.
        assert_approx_eq!(baseline_at(&segments, 10.0).unwrap(), 0.5, 1e-12);
        assert_eq!(baseline_at(&[], 25.0), None);
    }
}
