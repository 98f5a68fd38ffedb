use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum FilterError {
    #[error("input vector contains no numeric samples")]
    EmptyData,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum RegressionError {
    #[error("regression window of {num_samples} sample(s) is too short, need at least 2")]
    InsufficientSamples { num_samples: usize },
    #[error("window [{start}, {start}+{num_samples}) exceeds data of length {length}")]
    WindowOutOfBounds {
        start: usize,
        num_samples: usize,
        length: usize,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum OptimizerError {
    #[error(
        "no legal window start in plateau [{rising}, {falling}): \
         {num_samples} samples wide with taboo zones [{taboo_front}, {taboo_tail}]"
    )]
    EmptySearchWindow {
        rising: usize,
        falling: usize,
        num_samples: usize,
        taboo_front: usize,
        taboo_tail: usize,
    },
    #[error("{0}")]
    Regression(#[from] RegressionError),
}
