use crate::plateau_detection::{calibration::RangeThresholds, optimizer::SearchSettings};
use blv_common::Real;
use clap::Parser;

/// Every numeric knob of the analysis, with the defaults used for a
/// standard grooming run. All of them only alter the algorithms; none has
/// side effects.
#[derive(Debug, Clone, Parser)]
pub(crate) struct AnalysisParameters {
    /// First-stage smoothing coefficient of the two-pole filter, in (0, 1].
    #[clap(long, default_value = "0.1")]
    pub(crate) stiffness_pole1: Real,

    /// Second-stage smoothing coefficient of the two-pole filter, in (0, 1].
    #[clap(long, default_value = "0.1")]
    pub(crate) stiffness_pole2: Real,

    /// Half-width of the flat/transition classifier applied to the filtered
    /// temperature slope, in degC per sample.
    #[clap(long, default_value = "0.05")]
    pub(crate) epsilon: Real,

    /// Debounce spacing; level crossings closer than this to the previous
    /// registered edge are discarded as spurious.
    #[clap(long, default_value = "10")]
    pub(crate) minimum_samples_between_edges: usize,

    /// Width of each candidate window as a fraction of its plateau.
    #[clap(long, default_value = "0.5")]
    pub(crate) analysis_width_pct: Real,

    /// Leading fraction of each plateau excluded from the window search.
    #[clap(long, default_value = "0.2")]
    pub(crate) taboo_front_pct: Real,

    /// Trailing fraction of each plateau excluded from the window search.
    #[clap(long, default_value = "0.05")]
    pub(crate) taboo_tail_pct: Real,

    /// Weight of flatness against fit quality in the composite ranking.
    #[clap(long, default_value = "0.85")]
    pub(crate) slope_fit_weight: Real,

    /// Relative margin below which two slope magnitudes rank equal.
    #[clap(long, default_value = "0.05")]
    pub(crate) better_slope_sig_margin: Real,

    /// Relative margin below which two R² values rank equal.
    #[clap(long, default_value = "0.025")]
    pub(crate) better_rsquared_sig_margin: Real,

    /// Fraction of candidate windows surviving the slope stage.
    #[clap(long, default_value = "0.25")]
    pub(crate) min_slope_percentile: Real,

    /// Fraction of slope-stage survivors surviving the fit stage.
    #[clap(long, default_value = "0.5")]
    pub(crate) min_fit_percentile: Real,

    /// Optimized regions with fewer samples than this are discarded.
    #[clap(long, default_value = "30")]
    pub(crate) minimum_optimized_sample_count: usize,

    /// Optimized regions shorter than this are discarded.
    #[clap(long, default_value = "5.0")]
    pub(crate) minimum_optimized_duration_minutes: Real,
}

impl AnalysisParameters {
    pub(crate) fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            analysis_width_pct: self.analysis_width_pct,
            taboo_front_pct: self.taboo_front_pct,
            taboo_tail_pct: self.taboo_tail_pct,
            slope_fit_weight: self.slope_fit_weight,
            better_slope_sig_margin: self.better_slope_sig_margin,
            better_rsquared_sig_margin: self.better_rsquared_sig_margin,
            min_slope_percentile: self.min_slope_percentile,
            min_fit_percentile: self.min_fit_percentile,
        }
    }

    pub(crate) fn range_thresholds(&self) -> RangeThresholds {
        RangeThresholds {
            minimum_sample_count: self.minimum_optimized_sample_count,
            minimum_duration_minutes: self.minimum_optimized_duration_minutes,
        }
    }
}
