//! Configuration for the adaptive complexity controller.

use crate::constants::{
    DEFAULT_BOOTSTRAP_ITERATIONS, DEFAULT_CONFIDENCE_PERCENTAGE, DEFAULT_KALMAN_MEASUREMENT_ERROR,
    DEFAULT_KALMAN_PROCESS_ERROR, DEFAULT_RAMP_LENGTH_MS, DEFAULT_RAMP_WARMUP_MS,
    DEFAULT_SAMPLE_CAPACITY_SLACK, DEFAULT_TARGET_FRAME_RATE, DEFAULT_TEST_INTERVAL_MS,
    DEFAULT_TEST_LENGTH_MS, DEFAULT_TIER_FAST_TEST_MS, DEFAULT_TIER_SLOW_TEST_MS,
    TIER_SEARCH_ALLOWANCE_MS,
};

/// Configuration options for a [`Controller`] run.
///
/// Every knob the core consumes is an explicit field, validated once at
/// construction. There is no dynamic options bag.
///
/// [`Controller`]: crate::adaptive::Controller
#[derive(Debug, Clone)]
pub struct Config {
    /// Frame rate the host is expected to sustain. Default: 60.
    pub target_frame_rate: f64,

    /// Length of one sampling interval in milliseconds. Interval closes
    /// trigger outlier filtering, Kalman smoothing, and strategy decisions.
    /// Default: 100.
    pub test_interval_ms: f64,

    /// Nominal test duration in milliseconds. The deadline is extended at
    /// tier transitions so this budget is spent inside ramps. Default: 10000.
    pub test_length_ms: f64,

    /// Kalman process error for the frame-length smoother. Default: 1.0.
    pub kalman_process_error: f64,

    /// Kalman measurement error for the frame-length smoother. Default: 4.0.
    pub kalman_measurement_error: f64,

    /// Number of bootstrap resamples for the final confidence interval.
    /// Default: 2500.
    pub bootstrap_iterations: usize,

    /// Confidence level of the bootstrap interval, in (0, 1). Default: 0.8.
    pub confidence_percentage: f64,

    /// Slack multiplier applied when pre-sizing sample storage from the
    /// expected duration and frame rate. Default: 1.25.
    pub sample_capacity_slack: f64,

    /// Hold time at the top of each ramp before descending, in
    /// milliseconds. Default: 200.
    pub warmup_length_ms: f64,

    /// Length of the descending complexity sweep, in milliseconds.
    /// Default: 3000.
    pub ramp_length_ms: f64,

    /// Tier cut-off when the smoothed estimate is already on target, in
    /// milliseconds. Default: 250.
    pub tier_fast_test_ms: f64,

    /// Upper bound on a tier while a noisy estimate settles, in
    /// milliseconds. Default: 750.
    pub tier_slow_test_ms: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_frame_rate: DEFAULT_TARGET_FRAME_RATE,
            test_interval_ms: DEFAULT_TEST_INTERVAL_MS,
            test_length_ms: DEFAULT_TEST_LENGTH_MS,
            kalman_process_error: DEFAULT_KALMAN_PROCESS_ERROR,
            kalman_measurement_error: DEFAULT_KALMAN_MEASUREMENT_ERROR,
            bootstrap_iterations: DEFAULT_BOOTSTRAP_ITERATIONS,
            confidence_percentage: DEFAULT_CONFIDENCE_PERCENTAGE,
            sample_capacity_slack: DEFAULT_SAMPLE_CAPACITY_SLACK,
            warmup_length_ms: DEFAULT_RAMP_WARMUP_MS,
            ramp_length_ms: DEFAULT_RAMP_LENGTH_MS,
            tier_fast_test_ms: DEFAULT_TIER_FAST_TEST_MS,
            tier_slow_test_ms: DEFAULT_TIER_SLOW_TEST_MS,
        }
    }
}

impl Config {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Short run for development and CI smoke tests.
    ///
    /// 5 second test, 1.5 second ramps, 500 bootstrap resamples.
    pub fn quick() -> Self {
        Self {
            test_length_ms: 5_000.0,
            ramp_length_ms: 1_500.0,
            bootstrap_iterations: 500,
            ..Default::default()
        }
    }

    /// Long run for low-variance scoring.
    ///
    /// 30 second test, 5000 bootstrap resamples.
    pub fn thorough() -> Self {
        Self {
            test_length_ms: 30_000.0,
            bootstrap_iterations: 5_000,
            ..Default::default()
        }
    }

    // =========================================================================
    // Builder methods
    // =========================================================================

    /// Set the target frame rate.
    pub fn target_frame_rate(mut self, rate: f64) -> Self {
        assert!(rate > 0.0, "target_frame_rate must be positive");
        self.target_frame_rate = rate;
        self
    }

    /// Set the sampling interval length in milliseconds.
    pub fn test_interval_ms(mut self, ms: f64) -> Self {
        assert!(ms > 0.0, "test_interval_ms must be positive");
        self.test_interval_ms = ms;
        self
    }

    /// Set the nominal test duration in milliseconds.
    pub fn test_length_ms(mut self, ms: f64) -> Self {
        assert!(ms > 0.0, "test_length_ms must be positive");
        self.test_length_ms = ms;
        self
    }

    /// Set the Kalman process error.
    pub fn kalman_process_error(mut self, error: f64) -> Self {
        assert!(error > 0.0, "kalman_process_error must be positive");
        self.kalman_process_error = error;
        self
    }

    /// Set the Kalman measurement error.
    pub fn kalman_measurement_error(mut self, error: f64) -> Self {
        assert!(error > 0.0, "kalman_measurement_error must be positive");
        self.kalman_measurement_error = error;
        self
    }

    /// Set the number of bootstrap resamples.
    pub fn bootstrap_iterations(mut self, iterations: usize) -> Self {
        assert!(iterations > 0, "bootstrap_iterations must be positive");
        self.bootstrap_iterations = iterations;
        self
    }

    /// Set the bootstrap confidence level.
    pub fn confidence_percentage(mut self, confidence: f64) -> Self {
        assert!(
            confidence > 0.0 && confidence < 1.0,
            "confidence_percentage must be in (0, 1)"
        );
        self.confidence_percentage = confidence;
        self
    }

    /// Set the ramp length in milliseconds.
    pub fn ramp_length_ms(mut self, ms: f64) -> Self {
        assert!(ms > 0.0, "ramp_length_ms must be positive");
        self.ramp_length_ms = ms;
        self
    }

    /// Set the per-ramp warmup length in milliseconds.
    pub fn warmup_length_ms(mut self, ms: f64) -> Self {
        assert!(ms >= 0.0, "warmup_length_ms must be non-negative");
        self.warmup_length_ms = ms;
        self
    }

    // =========================================================================
    // Derived values
    // =========================================================================

    /// Frame length matching the target frame rate, in milliseconds.
    pub fn desired_frame_length(&self) -> f64 {
        1000.0 / self.target_frame_rate
    }

    /// Frame lengths at or below this are considered on target.
    ///
    /// Slightly above the desired frame length so measurement jitter on an
    /// on-target host does not read as degradation.
    pub fn frame_length_threshold(&self) -> f64 {
        1000.0 / (self.target_frame_rate - 2.0).max(1.0)
    }

    /// Frame length of half the target rate; ends tier search.
    pub fn frame_length_slow_threshold(&self) -> f64 {
        2000.0 / self.target_frame_rate
    }

    /// Frame length ramps aim to reach at their top.
    pub fn frame_length_severe_threshold(&self) -> f64 {
        3000.0 / self.target_frame_rate
    }

    /// Pre-computed sample capacity: expected duration times target frame
    /// rate plus slack, including the tier-search allowance.
    pub fn sample_capacity(&self) -> usize {
        let duration_ms = self.test_length_ms + TIER_SEARCH_ALLOWANCE_MS;
        let frames = self.target_frame_rate * duration_ms / 1000.0;
        (frames * self.sample_capacity_slack).ceil() as usize
    }

    /// Check that the configuration is internally consistent.
    pub fn validate(&self) -> Result<(), String> {
        if self.target_frame_rate <= 0.0 {
            return Err("target_frame_rate must be positive".to_string());
        }
        if self.test_interval_ms <= 0.0 {
            return Err("test_interval_ms must be positive".to_string());
        }
        if self.test_length_ms < self.test_interval_ms {
            return Err("test_length_ms must cover at least one interval".to_string());
        }
        if self.kalman_process_error <= 0.0 || self.kalman_measurement_error <= 0.0 {
            return Err("kalman errors must be positive".to_string());
        }
        if self.bootstrap_iterations == 0 {
            return Err("bootstrap_iterations must be positive".to_string());
        }
        if self.confidence_percentage <= 0.0 || self.confidence_percentage >= 1.0 {
            return Err("confidence_percentage must be in (0, 1)".to_string());
        }
        if self.ramp_length_ms <= 0.0 {
            return Err("ramp_length_ms must be positive".to_string());
        }
        if self.tier_fast_test_ms > self.tier_slow_test_ms {
            return Err("tier_fast_test_ms must not exceed tier_slow_test_ms".to_string());
        }
        Ok(())
    }
}
