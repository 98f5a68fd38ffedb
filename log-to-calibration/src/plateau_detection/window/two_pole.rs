use super::{
    super::{error::FilterError, Real},
    Window,
};

/// Cascaded two-stage exponential low-pass. The first pole tracks the raw
/// signal with `stiffness_pole1`, the second smooths the first pole's output
/// with `stiffness_pole2`. The first sample passes through unchanged.
#[derive(Default, Clone)]
pub(crate) struct TwoPoleFilter {
    stiffness_pole1: Real,
    stiffness_pole2: Real,
    poles: Option<Poles>,
}

#[derive(Clone)]
struct Poles {
    pole1: Real,
    output: Real,
}

impl TwoPoleFilter {
    pub(crate) fn new(stiffness_pole1: Real, stiffness_pole2: Real) -> Self {
        Self {
            stiffness_pole1,
            stiffness_pole2,
            poles: None,
        }
    }
}

impl Window for TwoPoleFilter {
    type InputType = Real;
    type OutputType = Real;

    fn push(&mut self, value: Real) -> Real {
        match self.poles.as_mut() {
            None => {
                self.poles = Some(Poles {
                    pole1: value,
                    output: value,
                });
                value
            }
            Some(poles) => {
                poles.pole1 += (value - poles.pole1) * self.stiffness_pole1;
                poles.output += (poles.pole1 - poles.output) * self.stiffness_pole2;
                poles.output
            }
        }
    }
}

/// Replaces every missing entry with the last numeric value seen; a missing
/// leading run is filled from the first numeric entry. Fails if the vector
/// contains no numeric value at all.
pub(crate) fn fill_forward(values: &[Option<Real>]) -> Result<Vec<Real>, FilterError> {
    let first_numeric = values
        .iter()
        .copied()
        .flatten()
        .next()
        .ok_or(FilterError::EmptyData)?;
    let mut last_seen = first_numeric;
    Ok(values
        .iter()
        .map(|value| {
            if let Some(value) = value {
                last_seen = *value;
            }
            last_seen
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{super::WindowFilter, *};
    use assert_approx_eq::assert_approx_eq;

    fn filter(input: &[Real], s1: Real, s2: Real) -> Vec<Real> {
        input
            .iter()
            .copied()
            .window(TwoPoleFilter::new(s1, s2))
            .collect()
    }

    #[test]
    fn constant_input_is_a_fixed_point() {
        let output = filter(&[5.5; 64], 0.1, 0.3);
        for value in output {
            assert_approx_eq!(value, 5.5, 1e-12);
        }
    }

    #[test]
    fn first_sample_passes_through() {
        let output = filter(&[3.0, 9.0, 9.0, 9.0], 0.5, 0.5);
        assert_approx_eq!(output[0], 3.0, 1e-12);
    }

    #[test]
    fn output_stays_within_running_bounds() {
        let input = [1.0, 4.0, 2.0, 8.0, 3.0, 0.0, 5.0];
        let output = filter(&input, 0.4, 0.7);
        let mut min = input[0];
        let mut max = input[0];
        for (raw, filtered) in input.iter().zip(&output) {
            min = min.min(*raw);
            max = max.max(*raw);
            assert!(*filtered >= min - 1e-12 && *filtered <= max + 1e-12);
        }
    }

    #[test]
    fn unit_stiffness_tracks_the_input() {
        let input = [1.0, 4.0, 2.0, 8.0];
        let output = filter(&input, 1.0, 1.0);
        for (raw, filtered) in input.iter().zip(&output) {
            assert_approx_eq!(*raw, *filtered, 1e-12);
        }
    }

    #[test]
    fn step_response_converges() {
        let mut input = vec![0.0; 4];
        input.extend(std::iter::repeat(10.0).take(200));
        let output = filter(&input, 0.2, 0.2);
        assert!((output.last().unwrap() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn fill_forward_flat_interpolates() {
        let values = [None, Some(2.0), None, None, Some(7.0), None];
        assert_eq!(
            fill_forward(&values).unwrap(),
            vec![2.0, 2.0, 2.0, 2.0, 7.0, 7.0]
        );
    }

    #[test]
    fn fill_forward_rejects_all_missing() {
        assert!(matches!(
            fill_forward(&[None, None, None]),
            Err(FilterError::EmptyData)
        ));
    }
}
