//! # framemark
//!
//! Adaptive complexity control and statistical scoring for graphics
//! benchmarks.
//!
//! The crate drives a benchmark scene toward the complexity at which the
//! host stops sustaining its target frame rate, then turns the recorded
//! samples into a score with a confidence interval:
//! - Frame-by-frame sampling with IQR outlier rejection and Kalman
//!   smoothing of frame lengths
//! - Three complexity strategies: hold fixed, PID-tune toward the target
//!   frame length, or sweep descending ramps steered by regression
//! - Constrained two-segment piecewise regression locating the breakeven
//!   complexity
//! - A deterministic percentile bootstrap around that breakpoint
//!
//! ## Quick Start
//!
//! ```ignore
//! use framemark::{Config, Controller, Stage, Strategy};
//!
//! let mut stage = MyScene::new();
//! let mut controller = Controller::start(Config::quick(), Strategy::Ramp, now(), &mut stage);
//!
//! // Per frame callback from the render loop:
//! while !controller.should_stop(now()) {
//!     stage.animate();
//!     controller.update(now(), &mut stage);
//! }
//!
//! let results = controller.results(now());
//! println!("score: {:?} ± {:?}", results.score, results.bootstrap);
//! ```
//!
//! The driver owns the render loop and the scene; the controller only reads
//! the scene's complexity through the [`Stage`] trait and requests changes
//! to it. Nothing in the crate spawns threads or blocks.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod config;
mod constants;
mod result;
mod sampler;
mod types;

// Functional modules
pub mod adaptive;
pub mod analysis;
pub mod statistics;

// Re-exports for public API
pub use adaptive::{Controller, PidController, Strategy, TuningStage};
pub use analysis::{Regression, RegressionOptions, RegressionProfile, Segment};
pub use config::Config;
pub use constants::{DEFAULT_CONCERN_PERCENTAGE, DEFAULT_SEED};
pub use result::{ControllerResults, RampDescriptor, SampleSeries, SegmentDescriptor};
pub use sampler::Sampler;
pub use statistics::{bootstrap, BootstrapResult, Experiment, KalmanEstimator};
pub use types::{FrameType, Mark, MarkName, Sample, Stage};
