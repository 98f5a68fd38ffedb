use super::{error::RegressionError, Real};

/// Least-squares line over a window, with `x` the implicit sample offsets
/// `0..n-1`.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(crate) struct LineFit {
    pub(crate) slope: Real,
    pub(crate) intercept: Real,
}

/// Mean and sample standard deviation of a window.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(crate) struct WindowStats {
    pub(crate) mean: Real,
    pub(crate) stdev: Real,
}

fn window(
    data: &[Real],
    start: usize,
    num_samples: usize,
) -> Result<&[Real], RegressionError> {
    if num_samples < 2 {
        return Err(RegressionError::InsufficientSamples { num_samples });
    }
    data.get(start..start + num_samples)
        .ok_or(RegressionError::WindowOutOfBounds {
            start,
            num_samples,
            length: data.len(),
        })
}

fn mean(values: impl Iterator<Item = Real> + Clone, num_samples: usize) -> Real {
    values.sum::<Real>() / num_samples as Real
}

/// Pearson correlation of two equal-length series; zero when either side
/// has no variance (the correlation is undefined there, and a flat series
/// carries no ordering information for the later ranking stages).
fn correlation(
    lhs: impl Iterator<Item = Real> + Clone,
    rhs: impl Iterator<Item = Real> + Clone,
    num_samples: usize,
) -> Real {
    let mean_lhs = mean(lhs.clone(), num_samples);
    let mean_rhs = mean(rhs.clone(), num_samples);
    let mut covariance = 0.0;
    let mut variance_lhs = 0.0;
    let mut variance_rhs = 0.0;
    for (x, y) in lhs.zip(rhs) {
        covariance += (x - mean_lhs) * (y - mean_rhs);
        variance_lhs += (x - mean_lhs).powi(2);
        variance_rhs += (y - mean_rhs).powi(2);
    }
    if variance_lhs == 0.0 || variance_rhs == 0.0 {
        0.0
    } else {
        covariance / (variance_lhs.sqrt() * variance_rhs.sqrt())
    }
}

/// Fits `y = slope * x + intercept` to `data[start..start + num_samples]`
/// via the Pearson identity `slope = r * (s_y / s_x)`.
pub(crate) fn fit_window(
    data: &[Real],
    start: usize,
    num_samples: usize,
) -> Result<LineFit, RegressionError> {
    let window = window(data, start, num_samples)?;
    let offsets = (0..num_samples).map(|offset| offset as Real);

    let mean_x = mean(offsets.clone(), num_samples);
    let mean_y = mean(window.iter().copied(), num_samples);
    let stdev_x = sample_variance(offsets.clone(), mean_x, num_samples).sqrt();
    let stdev_y = sample_variance(window.iter().copied(), mean_y, num_samples).sqrt();

    let correlation = correlation(offsets, window.iter().copied(), num_samples);
    let slope = correlation * stdev_y / stdev_x;
    let intercept = mean_y - slope * mean_x;
    Ok(LineFit { slope, intercept })
}

/// Squared Pearson correlation between the window and the model vector
/// `slope * x + intercept` evaluated over the same offsets.
pub(crate) fn r_squared(
    data: &[Real],
    start: usize,
    num_samples: usize,
    fit: &LineFit,
) -> Result<Real, RegressionError> {
    let window = window(data, start, num_samples)?;
    let model = (0..num_samples).map(|offset| fit.slope * offset as Real + fit.intercept);
    Ok(correlation(model, window.iter().copied(), num_samples).powi(2))
}

fn sample_variance(
    values: impl Iterator<Item = Real>,
    mean: Real,
    num_samples: usize,
) -> Real {
    values.map(|value| (value - mean).powi(2)).sum::<Real>() / (num_samples - 1) as Real
}

/// Mean and sample standard deviation over the window.
pub(crate) fn window_stats(
    data: &[Real],
    start: usize,
    num_samples: usize,
) -> Result<WindowStats, RegressionError> {
    let window = window(data, start, num_samples)?;
    let mean = mean(window.iter().copied(), num_samples);
    let stdev = sample_variance(window.iter().copied(), mean, num_samples).sqrt();
    Ok(WindowStats { mean, stdev })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn perfect_line_is_recovered_exactly() {
        let data: Vec<Real> = (0..32).map(|i| 0.25 * i as Real - 3.0).collect();
        let fit = fit_window(&data, 0, data.len()).unwrap();
        assert_approx_eq!(fit.slope, 0.25, 1e-9);
        assert_approx_eq!(fit.intercept, -3.0, 1e-9);
        let r2 = r_squared(&data, 0, data.len(), &fit).unwrap();
        assert_approx_eq!(r2, 1.0, 1e-9);
    }

    #[test]
    fn offset_window_fit_uses_local_offsets() {
        // y = 2x + 1 over the whole trace; within [4, 8) the local fit is
        // y = 2x' + 9 with x' = 0..4.
        let data: Vec<Real> = (0..12).map(|i| 2.0 * i as Real + 1.0).collect();
        let fit = fit_window(&data, 4, 4).unwrap();
        assert_approx_eq!(fit.slope, 2.0, 1e-9);
        assert_approx_eq!(fit.intercept, 9.0, 1e-9);
    }

    #[test]
    fn constant_window_has_zero_slope() {
        let data = [7.5; 16];
        let fit = fit_window(&data, 0, data.len()).unwrap();
        assert_approx_eq!(fit.slope, 0.0, 1e-12);
        assert_approx_eq!(fit.intercept, 7.5, 1e-12);
        // Undefined correlation degrades to zero rather than NaN.
        let r2 = r_squared(&data, 0, data.len(), &fit).unwrap();
        assert_approx_eq!(r2, 0.0, 1e-12);
    }

    #[test]
    fn single_sample_window_is_rejected() {
        assert_eq!(
            fit_window(&[1.0, 2.0], 0, 1),
            Err(RegressionError::InsufficientSamples { num_samples: 1 })
        );
    }

    #[test]
    fn out_of_bounds_window_is_rejected() {
        assert_eq!(
            fit_window(&[1.0, 2.0, 3.0], 2, 4),
            Err(RegressionError::WindowOutOfBounds {
                start: 2,
                num_samples: 4,
                length: 3
            })
        );
    }

    #[test]
    fn window_stats_match_hand_computation() {
        let data = [1.0, 2.0, 3.0, 4.0];
        let stats = window_stats(&data, 0, 4).unwrap();
        assert_approx_eq!(stats.mean, 2.5, 1e-12);
        assert_approx_eq!(stats.stdev, (5.0_f64 / 3.0).sqrt(), 1e-12);
    }
}
