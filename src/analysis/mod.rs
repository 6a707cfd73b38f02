//! Curve fitting used both online (ramp steering) and offline (scoring).

mod regression;

pub use regression::{Regression, RegressionOptions, RegressionProfile, Segment};
