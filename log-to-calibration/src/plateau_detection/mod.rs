//! This module provides tools for locating stable temperature plateaus in a
//! logged sensor trace and reducing each one to the flattest, best-fitting
//! sub-window it contains.
//!
//! A trace takes the form of a Vec (or some other similar container) of
//! scalar values. Typical usage looks like:
//! ```rust,ignore
//! let filtered: Vec<Real> = temperature
//!     .iter()
//!     .copied()
//!     .window(TwoPoleFilter::new(0.1, 0.1))   // cascaded exponential smoother
//!     .collect();
//! let transitions: Vec<Transition> = flags
//!     .iter()
//!     .copied()
//!     .events(LevelCrossingDetector::new(10)) // debounced edge detection
//!     .collect();
//! ```

pub(crate) mod calibration;
pub(crate) mod detectors;
pub(crate) mod error;
pub(crate) mod optimizer;
pub(crate) mod regression;
pub(crate) mod window;

pub(crate) use blv_common::Real;
