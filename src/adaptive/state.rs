//! Shared per-run state: sample recording and interval processing.

use crate::config::Config;
use crate::sampler::Sampler;
use crate::statistics::{filter_outliers, KalmanEstimator};
use crate::types::{FrameType, Sample};

/// State shared by every controller strategy.
///
/// Created at `Controller::start` and discarded after `results`; there is
/// no reset or reuse contract.
#[derive(Debug)]
pub(crate) struct ControllerState {
    pub sampler: Sampler,
    pub kalman: KalmanEstimator,

    pub start_timestamp: f64,
    /// Deadline for `should_stop`; extended at tier transitions.
    pub end_timestamp: f64,

    interval_length: f64,
    interval_start_timestamp: f64,
    interval_start_index: usize,

    previous_timestamp: Option<f64>,
    previous_complexity: Option<i64>,
}

impl ControllerState {
    pub fn new(config: &Config, start_timestamp: f64) -> Self {
        Self {
            sampler: Sampler::new(config.sample_capacity()),
            kalman: KalmanEstimator::new(
                config.kalman_process_error,
                config.kalman_measurement_error,
            ),
            start_timestamp,
            end_timestamp: start_timestamp + config.test_length_ms,
            interval_length: config.test_interval_ms,
            interval_start_timestamp: start_timestamp,
            interval_start_index: 0,
            previous_timestamp: None,
            previous_complexity: None,
        }
    }

    /// Record one frame. The frame type is `Mutation` when complexity
    /// changed since the previous recorded frame; the raw frame length is
    /// the inter-frame delta, or -1.0 for the first frame.
    pub fn record_frame(&mut self, timestamp: f64, complexity: i64) {
        let frame_length = match self.previous_timestamp {
            Some(previous) => timestamp - previous,
            None => -1.0,
        };
        let frame_type = match self.previous_complexity {
            Some(previous) if previous != complexity => FrameType::Mutation,
            Some(_) => FrameType::Animation,
            None => FrameType::Mutation,
        };

        self.sampler.record(Sample {
            frame_type,
            timestamp,
            complexity,
            frame_length,
            frame_length_estimate: -1.0,
        });

        self.previous_timestamp = Some(timestamp);
        self.previous_complexity = Some(complexity);
    }

    /// True when the current sampling interval has elapsed.
    pub fn interval_elapsed(&self, timestamp: f64) -> bool {
        timestamp - self.interval_start_timestamp >= self.interval_length
    }

    /// Close the current sampling interval.
    ///
    /// IQR-filters the interval's raw frame deltas, averages the
    /// survivors, folds the average into the Kalman smoother, and stamps
    /// the smoothed estimate over the interval's samples. Returns the
    /// smoothed estimate, or `None` for an interval without any deltas.
    pub fn close_interval(&mut self, timestamp: f64) -> Option<f64> {
        let start = self.interval_start_index;
        let end = self.sampler.len();
        self.interval_start_timestamp = timestamp;
        self.interval_start_index = end;

        let deltas: Vec<f64> = self.sampler.frame_lengths()[start..end]
            .iter()
            .copied()
            .filter(|&d| d >= 0.0)
            .collect();
        if deltas.is_empty() {
            return None;
        }

        let filtered = filter_outliers(&deltas);
        if filtered.is_empty() {
            return None;
        }
        let average = filtered.iter().sum::<f64>() / filtered.len() as f64;
        let estimate = self.kalman.next(average);
        self.sampler.backfill_estimates(start, end, estimate);
        Some(estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ControllerState {
        ControllerState::new(&Config::default(), 1000.0)
    }

    #[test]
    fn test_first_frame_has_no_length() {
        let mut state = state();
        state.record_frame(1000.0, 5);
        let sample = state.sampler.sample_at(0);
        assert_eq!(sample.frame_length, -1.0);
        assert_eq!(sample.frame_type, FrameType::Mutation);
    }

    #[test]
    fn test_frame_type_tracks_complexity_changes() {
        let mut state = state();
        state.record_frame(1000.0, 5);
        state.record_frame(1016.7, 5);
        state.record_frame(1033.4, 6);

        assert_eq!(state.sampler.sample_at(1).frame_type, FrameType::Animation);
        assert_eq!(state.sampler.sample_at(2).frame_type, FrameType::Mutation);
        assert!((state.sampler.sample_at(1).frame_length - 16.7).abs() < 1e-9);
    }

    #[test]
    fn test_interval_close_backfills_estimates() {
        let mut state = state();
        let mut t = 1000.0;
        for _ in 0..8 {
            state.record_frame(t, 5);
            t += 16.7;
        }
        assert!(state.interval_elapsed(t));
        let estimate = state.close_interval(t).unwrap();
        assert!((estimate - 16.7).abs() < 1e-9);
        // Every sample in the interval carries the estimate now.
        for i in 0..state.sampler.len() {
            assert_eq!(state.sampler.sample_at(i).frame_length_estimate, estimate);
        }
    }

    #[test]
    fn test_interval_filtering_discards_stall() {
        let mut state = state();
        let mut t = 1000.0;
        state.record_frame(t, 5);
        for i in 1..10 {
            t += if i == 5 { 400.0 } else { 16.7 };
            state.record_frame(t, 5);
        }
        let estimate = state.close_interval(t).unwrap();
        assert!((estimate - 16.7).abs() < 1e-9, "stall leaked: {estimate}");
    }

    #[test]
    fn test_empty_interval_yields_none() {
        let mut state = state();
        assert!(state.close_interval(1100.0).is_none());
    }
}
