//! Statistical building blocks for the controller and scoring engine.
//!
//! - Online mean/variance/percentile accumulation ([`Experiment`])
//! - IQR outlier filtering for interval frame lengths
//! - Steady-state Kalman smoothing of noisy frame-length measurements
//! - Deterministic percentile bootstrap for confidence intervals

mod bootstrap;
mod experiment;
mod kalman;
mod outliers;

pub use bootstrap::{bootstrap, BootstrapResult};
pub use experiment::Experiment;
pub use kalman::KalmanEstimator;
pub use outliers::{filter_outliers, percentile_sorted};
