use blv_common::Real;

/// Piecewise temperature profile: a linear ramp into each target followed
/// by a rectangular hold, starting from `start_temperature`. Targets may be
/// listed in any order; the profile simply visits them as given.
pub(crate) fn temperature_profile(
    start_temperature: Real,
    targets: &[Real],
    ramp_samples: usize,
    hold_samples: usize,
) -> Vec<Real> {
    let mut profile = Vec::with_capacity(targets.len() * (ramp_samples + hold_samples));
    let mut previous = start_temperature;
    for &target in targets {
        for step in 0..ramp_samples {
            profile.push(previous + (target - previous) * (step + 1) as Real / ramp_samples as Real);
        }
        profile.extend(std::iter::repeat(target).take(hold_samples));
        previous = target;
    }
    profile
}
