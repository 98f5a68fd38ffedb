use super::{
    detectors::Plateau,
    error::OptimizerError,
    regression::{self, LineFit, WindowStats},
    Real,
};
use std::cmp::Ordering;
use tracing::debug;

/// Numeric knobs governing the sub-window search within one plateau.
#[derive(Debug, Clone)]
pub(crate) struct SearchSettings {
    /// Width of each candidate window as a fraction of the plateau length.
    pub(crate) analysis_width_pct: Real,
    /// Leading fraction of the plateau excluded from the search, covering
    /// the thermal-settling transient after the rising edge.
    pub(crate) taboo_front_pct: Real,
    /// Trailing fraction excluded from the search.
    pub(crate) taboo_tail_pct: Real,
    /// Weight of flatness against fit quality in the composite heuristic.
    pub(crate) slope_fit_weight: Real,
    /// Relative ratio below which two slope magnitudes rank equal.
    pub(crate) better_slope_sig_margin: Real,
    /// Relative ratio below which two R² values rank equal.
    pub(crate) better_rsquared_sig_margin: Real,
    /// Fraction of candidates surviving the slope stage.
    pub(crate) min_slope_percentile: Real,
    /// Fraction of slope-stage survivors surviving the fit stage.
    pub(crate) min_fit_percentile: Real,
}

/// One window position under evaluation.
#[derive(Debug, Clone)]
struct Candidate {
    start: usize,
    fit: LineFit,
    r_squared: Real,
    stats: WindowStats,
}

/// The winning sub-window of one plateau. `falling` is one past the final
/// sample, so `[rising, falling)` indexes the trace directly.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OptimizedRegion {
    pub(crate) rising: usize,
    pub(crate) falling: usize,
    pub(crate) num_samples: usize,
    pub(crate) mean_voltage: Real,
    pub(crate) stdev_voltage: Real,
}

/// True when `lhs` exceeds `rhs` by more than the relative margin. Both
/// ranking metrics are non-negative so the one-sided form suffices.
fn significantly_greater(lhs: Real, rhs: Real, margin: Real) -> bool {
    lhs > rhs * (1.0 + margin)
}

/// Candidates surviving a percentile stage; every stage keeps at least one.
fn retained(num_candidates: usize, percentile: Real) -> usize {
    ((num_candidates as Real * percentile).ceil() as usize).clamp(1, num_candidates)
}

/// Linear remap of `value` into [0, 1] against observed bounds. A metric
/// with no observed spread maps every candidate to 1.0 and leaves the
/// decision to the tie-break.
fn normalize(value: Real, bounds: (Real, Real)) -> Real {
    let (min, max) = bounds;
    if max - min <= Real::EPSILON {
        1.0
    } else {
        (value - min) / (max - min)
    }
}

fn metric_bounds(values: impl Iterator<Item = Real>) -> (Real, Real) {
    values.fold((Real::INFINITY, Real::NEG_INFINITY), |(min, max), value| {
        (min.min(value), max.max(value))
    })
}

/// Ranks `lhs` against `rhs` so that a significantly better metric sorts
/// first and equal-rank candidates prefer the later window start.
fn rank(
    (lhs_metric, lhs_start): (Real, usize),
    (rhs_metric, rhs_start): (Real, usize),
    margin: Real,
) -> Ordering {
    if significantly_greater(lhs_metric, rhs_metric, margin) {
        Ordering::Less
    } else if significantly_greater(rhs_metric, lhs_metric, margin) {
        Ordering::Greater
    } else {
        rhs_start.cmp(&lhs_start)
    }
}

/// Slope stage: flattest candidates first, best fraction retained.
fn slope_stage(mut candidates: Vec<Candidate>, margin: Real, percentile: Real) -> Vec<Candidate> {
    candidates.sort_by(|lhs, rhs| {
        rank(
            (rhs.fit.slope.abs(), lhs.start),
            (lhs.fit.slope.abs(), rhs.start),
            margin,
        )
    });
    let keep = retained(candidates.len(), percentile);
    debug!(
        "Slope stage retains {keep} of {} candidate(s)",
        candidates.len()
    );
    candidates.truncate(keep);
    candidates
}

/// Fit stage: highest R² first, best fraction retained.
fn fit_stage(mut candidates: Vec<Candidate>, margin: Real, percentile: Real) -> Vec<Candidate> {
    candidates.sort_by(|lhs, rhs| {
        rank(
            (lhs.r_squared, lhs.start),
            (rhs.r_squared, rhs.start),
            margin,
        )
    });
    let keep = retained(candidates.len(), percentile);
    debug!(
        "Fit stage retains {keep} of {} candidate(s)",
        candidates.len()
    );
    candidates.truncate(keep);
    candidates
}

/// Composite stage: weighted flatness/fit heuristic, normalized against the
/// bounds observed over the whole slope-stage population.
fn composite_stage(
    mut candidates: Vec<Candidate>,
    slope_bounds: (Real, Real),
    fit_bounds: (Real, Real),
    weight: Real,
    margin: Real,
) -> Vec<Candidate> {
    let heuristic = |candidate: &Candidate| {
        let flatness = 1.0 - normalize(candidate.fit.slope.abs(), slope_bounds);
        let fit_quality = normalize(candidate.r_squared, fit_bounds);
        weight * flatness + (1.0 - weight) * fit_quality
    };
    candidates.sort_by(|lhs, rhs| {
        rank(
            (heuristic(lhs), lhs.start),
            (heuristic(rhs), rhs.start),
            margin,
        )
    });
    candidates
}

/// Finds the most temperature-flat, best-fitting fixed-width sub-window of
/// `plateau`, scored over the filtered voltage trace.
///
/// Three stages, each a sort-and-retain over the previous stage's
/// survivors: ascending slope magnitude, descending R², then the composite
/// heuristic. All comparisons are tolerance-relative so floating noise
/// cannot reorder near-identical candidates; exact ties go to the later
/// window start.
pub(crate) fn optimize_region(
    voltage: &[Real],
    plateau: &Plateau,
    settings: &SearchSettings,
) -> Result<OptimizedRegion, OptimizerError> {
    let window_length = plateau.len();
    let num_samples = (window_length as Real * settings.analysis_width_pct).ceil() as usize;
    let taboo_front = (window_length as Real * settings.taboo_front_pct).ceil() as usize;
    let taboo_tail = (window_length as Real * settings.taboo_tail_pct).ceil() as usize;

    let last_offset = window_length as i64 - num_samples as i64 - taboo_tail as i64;
    if num_samples < 2 || last_offset < taboo_front as i64 {
        return Err(OptimizerError::EmptySearchWindow {
            rising: plateau.rising,
            falling: plateau.falling,
            num_samples,
            taboo_front,
            taboo_tail,
        });
    }

    let candidates = (taboo_front..=last_offset as usize)
        .map(|offset| {
            let start = plateau.rising + offset;
            let fit = regression::fit_window(voltage, start, num_samples)?;
            let r_squared = regression::r_squared(voltage, start, num_samples, &fit)?;
            let stats = regression::window_stats(voltage, start, num_samples)?;
            Ok(Candidate {
                start,
                fit,
                r_squared,
                stats,
            })
        })
        .collect::<Result<Vec<_>, OptimizerError>>()?;

    // Normalization bounds come from the whole population, not the
    // survivors of later stages.
    let slope_bounds = metric_bounds(candidates.iter().map(|c| c.fit.slope.abs()));
    let fit_bounds = metric_bounds(candidates.iter().map(|c| c.r_squared));

    let candidates = slope_stage(
        candidates,
        settings.better_slope_sig_margin,
        settings.min_slope_percentile,
    );
    let candidates = fit_stage(
        candidates,
        settings.better_rsquared_sig_margin,
        settings.min_fit_percentile,
    );
    let candidates = composite_stage(
        candidates,
        slope_bounds,
        fit_bounds,
        settings.slope_fit_weight,
        settings.better_slope_sig_margin,
    );

    let winner = candidates
        .first()
        .expect("every stage should retain at least one candidate");
    Ok(OptimizedRegion {
        rising: winner.start,
        falling: winner.start + num_samples,
        num_samples,
        mean_voltage: winner.stats.mean,
        stdev_voltage: winner.stats.stdev,
    })
}
