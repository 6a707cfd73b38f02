//! The complexity controller: one state machine, three strategies.
//!
//! The external benchmark driver calls [`Controller::update`] once per frame
//! callback with the current timestamp; the controller records the frame,
//! closes sampling intervals as they elapse, and steers the [`Stage`]'s
//! workload according to the selected [`Strategy`]. When
//! [`Controller::should_stop`] reports the deadline, the driver calls
//! [`Controller::results`] to obtain the recorded series and the score.

mod pid;
mod ramp;
mod state;

pub use pid::{PidController, TuningStage};

use log::debug;

use crate::analysis::{Regression, RegressionOptions};
use crate::config::Config;
use crate::constants::DEFAULT_CONCERN_PERCENTAGE;
use crate::result::{ControllerResults, RampDescriptor, SampleSeries};
use crate::statistics::{bootstrap, BootstrapResult, Experiment};
use crate::types::{MarkName, Stage};

use ramp::RampState;
use state::ControllerState;

/// Complexity scheduling strategy for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Never tune; sample whatever complexity the stage starts with.
    Fixed,
    /// PID-tune complexity toward the target frame length.
    Adaptive,
    /// Tier search followed by regression-steered descending ramps.
    Ramp,
}

/// Per-strategy mutable state. The variants are closed on purpose: there is
/// no registry of strategies, and dispatch is a plain `match`.
#[derive(Debug)]
enum StrategyState {
    Fixed {
        complexity: Experiment,
    },
    Adaptive {
        pid: PidController,
        complexity: Experiment,
        last_tune_timestamp: Option<f64>,
    },
    Ramp(Box<RampState>),
}

/// Frame-clock-driven benchmark controller.
///
/// Single-threaded and synchronous: every method completes within the call,
/// and "waiting" exists only as state polled by the driver on the next
/// frame callback.
#[derive(Debug)]
pub struct Controller {
    config: Config,
    state: ControllerState,
    strategy_state: StrategyState,
}

impl Controller {
    /// Begin a run at `timestamp`, immediately steering `stage` to the
    /// strategy's starting complexity.
    ///
    /// # Panics
    ///
    /// Panics when `config` fails [`Config::validate`].
    pub fn start(config: Config, strategy: Strategy, timestamp: f64, stage: &mut dyn Stage) -> Self {
        if let Err(message) = config.validate() {
            panic!("invalid configuration: {message}");
        }

        let mut state = ControllerState::new(&config, timestamp);
        state.sampler.add_mark(MarkName::SamplingStart, timestamp);

        let strategy_state = match strategy {
            Strategy::Fixed => StrategyState::Fixed {
                complexity: Experiment::with_concern(),
            },
            Strategy::Adaptive => StrategyState::Adaptive {
                pid: PidController::new(config.desired_frame_length()),
                complexity: Experiment::with_concern(),
                last_tune_timestamp: None,
            },
            Strategy::Ramp => StrategyState::Ramp(Box::new(RampState::new(timestamp))),
        };

        debug!("controller: starting {strategy:?} run at {timestamp:.1}ms");
        let mut controller = Self {
            config,
            state,
            strategy_state,
        };
        if let StrategyState::Ramp(ramp) = &mut controller.strategy_state {
            let target = ramp.target_complexity(timestamp, &mut controller.state, &controller.config);
            apply_target(stage, target);
        }
        controller
    }

    /// Process one frame callback.
    ///
    /// Records the frame, closes the sampling interval if it elapsed, and
    /// applies the strategy's tuning decision to `stage`.
    pub fn update(&mut self, timestamp: f64, stage: &mut dyn Stage) {
        self.state.record_frame(timestamp, stage.complexity());

        let estimate = if self.state.interval_elapsed(timestamp) {
            self.state.close_interval(timestamp)
        } else {
            None
        };

        match &mut self.strategy_state {
            StrategyState::Fixed { complexity } => {
                if estimate.is_some() {
                    complexity.sample(stage.complexity() as f64);
                }
            }
            StrategyState::Adaptive {
                pid,
                complexity,
                last_tune_timestamp,
            } => {
                if let Some(measurement) = estimate {
                    complexity.sample(stage.complexity() as f64);
                    let h = last_tune_timestamp
                        .map(|last| timestamp - last)
                        .unwrap_or(self.config.test_interval_ms);
                    *last_tune_timestamp = Some(timestamp);
                    let delta = pid.tune(timestamp, h, measurement);
                    if delta != 0 {
                        stage.tune(delta);
                    }
                }
            }
            StrategyState::Ramp(ramp) => {
                if let Some(measurement) = estimate {
                    ramp.interval_estimate(timestamp, measurement, &mut self.state, &self.config);
                }
                let target = ramp.target_complexity(timestamp, &mut self.state, &self.config);
                apply_target(stage, target);
            }
        }
    }

    /// True when the run's deadline has passed. The deadline is extended at
    /// tier and ramp transitions, so the configured test length is spent
    /// inside ramps rather than setup.
    pub fn should_stop(&self, timestamp: f64) -> bool {
        timestamp >= self.state.end_timestamp
    }

    /// End the run and assemble results. Terminal: consumes the controller.
    pub fn results(mut self, timestamp: f64) -> ControllerResults {
        self.state.sampler.add_mark(MarkName::SamplingEnd, timestamp);

        let (score, bootstrap_result, ramps) = match &self.strategy_state {
            StrategyState::Fixed { complexity }
            | StrategyState::Adaptive { complexity, .. } => {
                let score = if complexity.count() > 0 {
                    Some(complexity.score(DEFAULT_CONCERN_PERCENTAGE))
                } else {
                    None
                };
                (score, None, Vec::new())
            }
            StrategyState::Ramp(ramp) => self.ramp_results(ramp),
        };

        let start = self.state.start_timestamp;
        let mut sampler = self.state.sampler;
        sampler.rebase(start);

        let samples = SampleSeries {
            frame_type: sampler.frame_types().to_vec(),
            time: sampler.timestamps().to_vec(),
            complexity: sampler.complexities().to_vec(),
            frame_length: sampler.frame_lengths().to_vec(),
            smoothed_frame_length: sampler.estimates().to_vec(),
        };

        debug!(
            "controller: run ended with {} samples, score {:?}",
            samples.len(),
            score
        );
        ControllerResults {
            samples,
            marks: sampler.marks().to_vec(),
            ramps,
            score,
            bootstrap: bootstrap_result,
        }
    }

    /// Final fit and score for a Ramp run: pool every completed ramp's
    /// samples (plus the in-flight descent), fit with the predominant
    /// profile, and bootstrap the breakpoint.
    fn ramp_results(
        &self,
        ramp: &RampState,
    ) -> (Option<f64>, Option<BootstrapResult>, Vec<RampDescriptor>) {
        let mut descriptors = Vec::new();
        let mut points: Vec<(f64, f64)> = Vec::new();

        for (regression, (start, end)) in ramp.ramps() {
            let ramp_points = self.state.sampler.regression_points(start, end);
            if let Some((min_x, max_x)) = x_range(&ramp_points) {
                descriptors.push(RampDescriptor::from_regression(
                    regression, min_x, max_x, start, end,
                ));
            }
            points.extend(ramp_points);
        }
        if let Some((start, end)) = ramp.current_descent_range(&self.state) {
            points.extend(self.state.sampler.regression_points(start, end));
        }
        if points.is_empty() {
            return (None, None, descriptors);
        }

        let options = RegressionOptions {
            desired_frame_length: self.config.desired_frame_length(),
            profile: ramp.dominant_profile(),
        };
        // A resample can shuffle the degradation out of view and produce a
        // downhill second segment; score such draws at the top of the swept
        // range instead of at a meaningless intersection.
        let statistic = |resample: &[(f64, f64)]| -> f64 {
            let max_x = resample.iter().map(|p| p.0).fold(f64::MIN, f64::max);
            match Regression::new(resample, options) {
                Some(regression) if regression.segment2.t >= 0.0 => regression.complexity,
                _ => max_x,
            }
        };

        let result = bootstrap(
            &points,
            self.config.bootstrap_iterations,
            statistic,
            self.config.confidence_percentage,
        );
        (Some(result.median), Some(result), descriptors)
    }
}

fn apply_target(stage: &mut dyn Stage, target: i64) {
    let delta = target - stage.complexity();
    if delta != 0 {
        stage.tune(delta);
    }
}

fn x_range(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    if points.is_empty() {
        return None;
    }
    let mut min_x = f64::MAX;
    let mut max_x = f64::MIN;
    for &(x, _) in points {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
    }
    Some((min_x, max_x))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stage stub with an instantaneous complexity-to-frame-length plant.
    struct PlantStage {
        complexity: i64,
    }

    impl Stage for PlantStage {
        fn complexity(&self) -> i64 {
            self.complexity
        }

        fn tune(&mut self, delta: i64) {
            self.complexity = (self.complexity + delta).max(0);
        }
    }

    #[test]
    #[should_panic(expected = "invalid configuration")]
    fn test_invalid_config_fails_fast() {
        let mut config = Config::default();
        config.confidence_percentage = 2.0;
        let mut stage = PlantStage { complexity: 1 };
        Controller::start(config, Strategy::Fixed, 0.0, &mut stage);
    }

    #[test]
    fn test_fixed_strategy_never_tunes() {
        let mut stage = PlantStage { complexity: 50 };
        let mut controller = Controller::start(Config::default(), Strategy::Fixed, 0.0, &mut stage);

        let mut t = 0.0;
        for _ in 0..120 {
            t += 16.7;
            controller.update(t, &mut stage);
        }
        assert_eq!(stage.complexity, 50);

        let results = controller.results(t);
        assert_eq!(results.samples.len(), 120);
        assert!(results.ramps.is_empty());
        assert!(results.bootstrap.is_none());
        // Constant complexity: mean and concern coincide, score is exact.
        assert!((results.score.unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_results_rebase_to_run_start() {
        let mut stage = PlantStage { complexity: 10 };
        let mut controller =
            Controller::start(Config::default(), Strategy::Fixed, 5_000.0, &mut stage);
        controller.update(5_016.7, &mut stage);
        controller.update(5_033.4, &mut stage);

        let results = controller.results(5_033.4);
        assert!((results.samples.time[0] - 16.7).abs() < 1e-9);
        assert_eq!(results.marks[0].name, MarkName::SamplingStart);
        assert_eq!(results.marks[0].time, 0.0);
        assert_eq!(results.marks.last().unwrap().name, MarkName::SamplingEnd);
    }

    #[test]
    fn test_deadline_without_transitions() {
        let mut stage = PlantStage { complexity: 1 };
        let controller = Controller::start(Config::default(), Strategy::Fixed, 0.0, &mut stage);
        assert!(!controller.should_stop(9_999.0));
        assert!(controller.should_stop(10_000.0));
    }

    #[test]
    fn test_adaptive_strategy_raises_complexity() {
        // One complexity unit costs 0.01ms, floored at 10ms (the driver
        // cannot call back faster than 100fps), so the 16.67ms target sits
        // near complexity 1667. The PID should push complexity well above
        // the start within the run.
        let mut stage = PlantStage { complexity: 1 };
        let mut controller =
            Controller::start(Config::default(), Strategy::Adaptive, 0.0, &mut stage);

        let mut t = 0.0;
        for _ in 0..1_200 {
            t += (stage.complexity as f64 / 100.0).max(10.0);
            controller.update(t, &mut stage);
        }
        assert!(
            stage.complexity > 200,
            "adaptive run stalled at complexity {}",
            stage.complexity
        );

        let results = controller.results(t);
        assert!(results.score.is_some());
        assert!(results.ramps.is_empty());
    }

    #[test]
    fn test_ramp_strategy_starts_at_first_tier() {
        let mut stage = PlantStage { complexity: 37 };
        Controller::start(Config::default(), Strategy::Ramp, 0.0, &mut stage);
        assert_eq!(stage.complexity, 1);
    }
}
