use super::{super::Real, Window};

/// Sample-to-sample slope of the incoming series. The first output is zero
/// so the derivative stays index-aligned with its source.
#[derive(Default, Clone)]
pub(crate) struct FiniteDifference {
    previous: Option<Real>,
}

impl FiniteDifference {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl Window for FiniteDifference {
    type InputType = Real;
    type OutputType = Real;

    fn push(&mut self, value: Real) -> Real {
        let difference = match self.previous {
            None => 0.0,
            Some(previous) => value - previous,
        };
        self.previous = Some(value);
        difference
    }
}
