//! Default tuning values shared across the crate.

/// Seed for the deterministic bootstrap generator. Fixed so repeated
/// scoring of the same samples is bit-identical.
pub const DEFAULT_SEED: u64 = 0x6672_616D_65; // "frame"

/// Frame rate the host is expected to sustain.
pub const DEFAULT_TARGET_FRAME_RATE: f64 = 60.0;

/// Length of one sampling interval in milliseconds.
pub const DEFAULT_TEST_INTERVAL_MS: f64 = 100.0;

/// Nominal test duration in milliseconds.
pub const DEFAULT_TEST_LENGTH_MS: f64 = 10_000.0;

/// Kalman process error for the frame-length smoother.
pub const DEFAULT_KALMAN_PROCESS_ERROR: f64 = 1.0;

/// Kalman measurement error for the frame-length smoother.
pub const DEFAULT_KALMAN_MEASUREMENT_ERROR: f64 = 4.0;

/// Number of bootstrap resamples for the final confidence interval.
pub const DEFAULT_BOOTSTRAP_ITERATIONS: usize = 2_500;

/// Confidence level of the bootstrap interval, in (0, 1).
pub const DEFAULT_CONFIDENCE_PERCENTAGE: f64 = 0.8;

/// Hold time at the top of each ramp before descending, in milliseconds.
pub const DEFAULT_RAMP_WARMUP_MS: f64 = 200.0;

/// Length of the descending complexity sweep, in milliseconds.
pub const DEFAULT_RAMP_LENGTH_MS: f64 = 3_000.0;

/// Tier cut-off when the smoothed estimate is already on target.
pub const DEFAULT_TIER_FAST_TEST_MS: f64 = 250.0;

/// Upper bound on a tier while a noisy estimate settles.
pub const DEFAULT_TIER_SLOW_TEST_MS: f64 = 750.0;

/// Slack multiplier applied when pre-sizing sample storage.
pub const DEFAULT_SAMPLE_CAPACITY_SLACK: f64 = 1.25;

/// Extra duration budgeted for tier search when pre-sizing sample
/// storage. Tier transitions push the deadline out, so the nominal test
/// length alone under-provisions the sample buffer.
pub const TIER_SEARCH_ALLOWANCE_MS: f64 = 45_000.0;

/// Percentage of worst samples averaged into the concern term of the
/// Fixed and Adaptive scores.
pub const DEFAULT_CONCERN_PERCENTAGE: f64 = 5.0;

/// Number of worst samples an [`Experiment`] retains for the concern
/// computation.
///
/// [`Experiment`]: crate::statistics::Experiment
pub const CONCERN_HEAP_SIZE: usize = 100;
