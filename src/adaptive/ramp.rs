//! Tier search and ramp scheduling for the Ramp strategy.
//!
//! A run opens with an exponential tier probe that brackets the workable
//! complexity range, then spends the rest of the budget on timed linear
//! descents from the top of that range. Each descent yields one regression;
//! the regressions steer the next descent's bounds toward the transition
//! region and, at the end of the run, are pooled into the final fit.

use log::debug;

use crate::analysis::{Regression, RegressionOptions, RegressionProfile};
use crate::config::Config;
use crate::statistics::Experiment;
use crate::types::MarkName;

use super::state::ControllerState;

/// Scheduling phase of the Ramp strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RampPhase {
    /// Exponential complexity probe bracketing the workable range.
    TierSearch,
    /// Holding at the ramp maximum while the host settles.
    Warmup,
    /// Timed linear descent from maximum to minimum complexity.
    Descent,
}

/// Mutable state of the tier search and the ramp scheduler.
#[derive(Debug)]
pub(crate) struct RampState {
    phase: RampPhase,

    tier_exponent: f64,
    tier_complexity: i64,
    tier_start_timestamp: f64,
    last_tier_complexity: i64,
    last_tier_frame_length: f64,

    minimum_complexity: f64,
    maximum_complexity: f64,
    possible_minimum: f64,
    possible_maximum: f64,
    min_experiment: Experiment,
    max_experiment: Experiment,

    ramp_start_timestamp: f64,
    ramp_start_index: usize,

    ramp_regressions: Vec<Regression>,
    ramp_ranges: Vec<(usize, usize)>,
    flat_ramps: usize,
}

impl RampState {
    pub fn new(start_timestamp: f64) -> Self {
        let tier_exponent = -0.5;
        Self {
            phase: RampPhase::TierSearch,
            tier_exponent,
            tier_complexity: tier_target(tier_exponent, 0),
            tier_start_timestamp: start_timestamp,
            last_tier_complexity: 0,
            last_tier_frame_length: 0.0,
            minimum_complexity: 1.0,
            maximum_complexity: 1.0,
            possible_minimum: 1.0,
            possible_maximum: 1.0,
            min_experiment: Experiment::new(),
            max_experiment: Experiment::new(),
            ramp_start_timestamp: 0.0,
            ramp_start_index: 0,
            ramp_regressions: Vec::new(),
            ramp_ranges: Vec::new(),
            flat_ramps: 0,
        }
    }

    /// Completed ramps as `(regression, sample range)` pairs.
    pub fn ramps(&self) -> impl Iterator<Item = (&Regression, (usize, usize))> {
        self.ramp_regressions
            .iter()
            .zip(self.ramp_ranges.iter().copied())
    }

    /// Sample range of the in-flight descent, if one is underway.
    pub fn current_descent_range(&self, state: &ControllerState) -> Option<(usize, usize)> {
        if self.phase == RampPhase::Descent && state.sampler.len() > self.ramp_start_index {
            Some((self.ramp_start_index, state.sampler.len()))
        } else {
            None
        }
    }

    /// Constraint mode for the final fit: `Flat` when most completed ramps
    /// degraded as a step rather than a slope.
    pub fn dominant_profile(&self) -> RegressionProfile {
        if self.flat_ramps * 2 > self.ramp_regressions.len() {
            RegressionProfile::Flat
        } else {
            RegressionProfile::Slope
        }
    }

    /// Consume one interval estimate. Tier advancement happens here; during
    /// ramps the estimate only feeds the recorded series.
    pub fn interval_estimate(
        &mut self,
        timestamp: f64,
        estimate: f64,
        state: &mut ControllerState,
        config: &Config,
    ) {
        if self.phase != RampPhase::TierSearch {
            return;
        }

        let elapsed = timestamp - self.tier_start_timestamp;
        if elapsed < config.tier_fast_test_ms {
            return;
        }

        if estimate > config.frame_length_slow_threshold() {
            self.conclude_tier_search(timestamp, estimate, state, config);
        } else if estimate <= config.frame_length_threshold() || elapsed >= config.tier_slow_test_ms
        {
            self.advance_tier(timestamp, estimate, state);
        }
    }

    /// Complexity the stage should be running at `timestamp`. Drives the
    /// warmup hold, the linear descent, and ramp turnover.
    pub fn target_complexity(
        &mut self,
        timestamp: f64,
        state: &mut ControllerState,
        config: &Config,
    ) -> i64 {
        match self.phase {
            RampPhase::TierSearch => self.tier_complexity,
            RampPhase::Warmup => {
                if timestamp - self.ramp_start_timestamp >= config.warmup_length_ms {
                    self.phase = RampPhase::Descent;
                }
                (self.maximum_complexity.round() as i64).max(1)
            }
            RampPhase::Descent => {
                let elapsed = timestamp - self.ramp_start_timestamp - config.warmup_length_ms;
                if elapsed >= config.ramp_length_ms {
                    self.finish_ramp(timestamp, state, config);
                    return (self.maximum_complexity.round() as i64).max(1);
                }
                let progress = elapsed / config.ramp_length_ms;
                let span = self.maximum_complexity - self.minimum_complexity;
                let target = self.maximum_complexity - span * progress;
                (target.round() as i64).max(1)
            }
        }
    }

    fn advance_tier(&mut self, timestamp: f64, estimate: f64, state: &mut ControllerState) {
        // Tier search time does not count against the test budget.
        state.end_timestamp += timestamp - self.tier_start_timestamp;

        self.last_tier_complexity = self.tier_complexity;
        self.last_tier_frame_length = estimate;

        let increment = if self.tier_complexity < 50 {
            0.5
        } else if self.tier_complexity < 10_000 {
            0.25
        } else {
            0.125
        };
        self.tier_exponent += increment;
        self.tier_complexity = tier_target(self.tier_exponent, self.tier_complexity);
        self.tier_start_timestamp = timestamp;
        state.kalman.reset();

        debug!(
            "tier search: {:.1}ms estimate, advancing to complexity {}",
            estimate, self.tier_complexity
        );
    }

    fn conclude_tier_search(
        &mut self,
        timestamp: f64,
        estimate: f64,
        state: &mut ControllerState,
        config: &Config,
    ) {
        state.end_timestamp += timestamp - self.tier_start_timestamp;
        state.sampler.add_mark(MarkName::TierComplete, timestamp);

        // Interpolate the last two tiers at the on-target threshold to
        // place the first ramp maximum near the transition region.
        let (c1, f1) = (self.last_tier_complexity as f64, self.last_tier_frame_length);
        let (c2, f2) = (self.tier_complexity as f64, estimate);
        let threshold = config.frame_length_threshold();
        let interpolated = if (f2 - f1).abs() < f64::EPSILON {
            c2
        } else {
            c1 + (threshold - f1) * (c2 - c1) / (f2 - f1)
        };

        self.possible_minimum = 1.0;
        self.possible_maximum = c2;
        self.minimum_complexity = 1.0;
        self.maximum_complexity = interpolated.clamp(1.0, c2);

        debug!(
            "tier search: done at complexity {}, ramp range [{}, {:.0}]",
            self.tier_complexity, self.minimum_complexity, self.maximum_complexity
        );
        self.begin_ramp(timestamp, state, config);
    }

    fn begin_ramp(&mut self, timestamp: f64, state: &mut ControllerState, config: &Config) {
        self.phase = RampPhase::Warmup;
        self.ramp_start_timestamp = timestamp;
        self.ramp_start_index = state.sampler.len();
        // Warmup holds are not part of the descent budget either.
        state.end_timestamp += config.warmup_length_ms;
        state.kalman.reset();
    }

    fn finish_ramp(&mut self, timestamp: f64, state: &mut ControllerState, config: &Config) {
        let end_index = state.sampler.len();
        state.sampler.add_mark(MarkName::RampComplete, timestamp);

        let points = state.sampler.regression_points(self.ramp_start_index, end_index);
        let options = RegressionOptions {
            desired_frame_length: config.desired_frame_length(),
            profile: RegressionProfile::Slope,
        };
        if let Some(regression) = Regression::new(&points, options) {
            self.steer(&regression, config);
            self.ramp_regressions.push(regression);
            self.ramp_ranges.push((self.ramp_start_index, end_index));
        }

        self.begin_ramp(timestamp, state, config);
    }

    /// True when the fit saw no degradation slope within the ramp: either
    /// the second segment does not rise, or the breakpoint sits at the very
    /// top of the swept range.
    fn is_flat(&self, regression: &Regression) -> bool {
        regression.segment2.t <= 0.0 || regression.complexity > 0.99 * self.maximum_complexity
    }

    /// Move the next ramp's bounds toward the transition region.
    fn steer(&mut self, regression: &Regression, config: &Config) {
        if self.is_flat(regression) {
            self.flat_ramps += 1;
            // No degradation inside the swept range: widen upward so the
            // next descent has a chance of crossing the transition.
            self.maximum_complexity = (self.maximum_complexity * 1.2).min(self.possible_maximum);
            debug!(
                "ramp: flat fit, widening to maximum {:.0}",
                self.maximum_complexity
            );
            return;
        }

        let breakpoint = regression.complexity;
        let span = config.frame_length_severe_threshold() - config.desired_frame_length();
        // Complexity at which the fit predicts the severe threshold: the
        // descent should start about there so the full transition is swept.
        let at_severe = breakpoint + span / regression.segment2.t;
        self.max_experiment
            .sample(at_severe.clamp(self.possible_minimum, self.possible_maximum));
        self.min_experiment
            .sample((breakpoint * 0.5).max(self.possible_minimum));

        // Running means smooth per-ramp noise; the 20% movement clamp keeps
        // one noisy ramp from yanking the bounds.
        let next_max = self
            .max_experiment
            .mean()
            .clamp(self.maximum_complexity * 0.8, self.maximum_complexity * 1.2)
            .min(self.possible_maximum)
            .max(self.possible_minimum + 1.0);
        let next_min = self
            .min_experiment
            .mean()
            .max(self.possible_minimum)
            .min(next_max * 0.5);

        self.maximum_complexity = next_max;
        self.minimum_complexity = next_min;
        debug!(
            "ramp: breakpoint {:.0}, next range [{:.0}, {:.0}]",
            breakpoint, next_min, next_max
        );
    }
}

fn tier_target(exponent: f64, last: i64) -> i64 {
    (10f64.powf(exponent).round() as i64).max(last + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::default()
    }

    fn state(config: &Config) -> ControllerState {
        ControllerState::new(config, 0.0)
    }

    #[test]
    fn test_tier_target_sequence() {
        let mut exponent = -0.5;
        let mut complexity = 0;
        let mut tiers = Vec::new();
        for _ in 0..11 {
            complexity = tier_target(exponent, complexity);
            tiers.push(complexity);
            exponent += if complexity < 50 {
                0.5
            } else if complexity < 10_000 {
                0.25
            } else {
                0.125
            };
        }
        assert_eq!(tiers, vec![1, 2, 3, 10, 32, 100, 178, 316, 562, 1000, 1778]);
    }

    #[test]
    fn test_fast_tiers_advance_quickly() {
        let config = config();
        let mut state = state(&config);
        let mut ramp = RampState::new(0.0);

        // On-target estimate after the fast-test window advances the tier.
        ramp.interval_estimate(100.0, 16.7, &mut state, &config);
        assert_eq!(ramp.tier_complexity, 1);
        ramp.interval_estimate(300.0, 16.7, &mut state, &config);
        assert_eq!(ramp.tier_complexity, 2);
    }

    #[test]
    fn test_noisy_tier_waits_for_slow_test() {
        let config = config();
        let mut state = state(&config);
        let mut ramp = RampState::new(0.0);

        // Above threshold but below the slow cut-off: the tier holds until
        // the slow-test window elapses.
        ramp.interval_estimate(300.0, 20.0, &mut state, &config);
        assert_eq!(ramp.tier_complexity, 1);
        ramp.interval_estimate(800.0, 20.0, &mut state, &config);
        assert_eq!(ramp.tier_complexity, 2);
    }

    #[test]
    fn test_tier_search_extends_deadline() {
        let config = config();
        let mut state = state(&config);
        let deadline = state.end_timestamp;
        let mut ramp = RampState::new(0.0);

        ramp.interval_estimate(300.0, 16.7, &mut state, &config);
        assert_eq!(state.end_timestamp, deadline + 300.0);
    }

    #[test]
    fn test_conclusion_interpolates_maximum() {
        let config = config();
        let mut state = state(&config);
        let mut ramp = RampState::new(0.0);
        ramp.tier_complexity = 1778;
        ramp.last_tier_complexity = 1000;
        ramp.last_tier_frame_length = 26.67;

        // 42.23ms estimate exceeds the slow threshold (33.33ms at 60fps).
        ramp.interval_estimate(300.0, 42.23, &mut state, &config);

        assert_eq!(ramp.phase, RampPhase::Warmup);
        // Interpolating (1000, 26.67)-(1778, 42.23) at 1000/58 lands near 529.
        assert!(
            (ramp.maximum_complexity - 529.0).abs() < 5.0,
            "maximum {} should be near 529",
            ramp.maximum_complexity
        );
        assert_eq!(ramp.minimum_complexity, 1.0);
        assert_eq!(ramp.possible_maximum, 1778.0);
        assert_eq!(state.sampler.marks().len(), 1);
    }

    #[test]
    fn test_descent_is_monotonic() {
        let config = config();
        let mut state = state(&config);
        let mut ramp = RampState::new(0.0);
        ramp.phase = RampPhase::Warmup;
        ramp.ramp_start_timestamp = 0.0;
        ramp.minimum_complexity = 10.0;
        ramp.maximum_complexity = 500.0;

        // Warmup holds at the maximum.
        assert_eq!(ramp.target_complexity(50.0, &mut state, &config), 500);

        let mut previous = i64::MAX;
        let mut t = config.warmup_length_ms;
        while t < config.warmup_length_ms + config.ramp_length_ms {
            let target = ramp.target_complexity(t, &mut state, &config);
            assert!(target <= previous, "descent rose at t={t}");
            previous = target;
            t += 16.7;
        }
        assert!(previous <= 15, "descent should approach the minimum");
    }

    #[test]
    fn test_steering_centers_on_breakpoint() {
        let config = config();
        let mut ramp = RampState::new(0.0);
        ramp.minimum_complexity = 1.0;
        ramp.maximum_complexity = 529.0;
        ramp.possible_minimum = 1.0;
        ramp.possible_maximum = 1778.0;

        // Exact knee at 500 with slope 0.02 above it.
        let points: Vec<(f64, f64)> = (1..=529)
            .map(|c| {
                let x = c as f64;
                (x, 50.0f64.max((x - 500.0) * 0.02 + 50.0))
            })
            .collect();
        let options = RegressionOptions {
            desired_frame_length: 50.0,
            profile: RegressionProfile::Slope,
        };
        let regression = Regression::new(&points, options).unwrap();
        ramp.steer(&regression, &config);

        // The maximum may move at most 20% per ramp, upward here because
        // the severe threshold sits above the swept range.
        assert!(ramp.maximum_complexity > 529.0);
        assert!(ramp.maximum_complexity <= 529.0 * 1.2 + 1.0);
        // The minimum rises toward half the breakpoint.
        assert!(ramp.minimum_complexity > 100.0);
        assert_eq!(ramp.flat_ramps, 0);
    }

    #[test]
    fn test_flat_ramp_widens_upward() {
        let config = config();
        let mut ramp = RampState::new(0.0);
        ramp.minimum_complexity = 1.0;
        ramp.maximum_complexity = 100.0;
        ramp.possible_minimum = 1.0;
        ramp.possible_maximum = 1000.0;

        // Constant frame length: no degradation anywhere in the range.
        let points: Vec<(f64, f64)> = (1..=100).map(|c| (c as f64, 16.7)).collect();
        let options = RegressionOptions {
            desired_frame_length: 16.7,
            profile: RegressionProfile::Slope,
        };
        let regression = Regression::new(&points, options).unwrap();
        ramp.steer(&regression, &config);

        assert_eq!(ramp.flat_ramps, 1);
        assert!((ramp.maximum_complexity - 120.0).abs() < 1e-9);
        assert_eq!(ramp.dominant_profile(), RegressionProfile::Flat);
    }
}
