//! Online mean/variance/percentile accumulator.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::constants::CONCERN_HEAP_SIZE;

/// Total-order wrapper so frame lengths can live in a [`BinaryHeap`].
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrdF64(f64);

impl Eq for OrdF64 {}

impl PartialOrd for OrdF64 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrdF64 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Online experiment accumulator.
///
/// Accumulates `sum`, `square_sum`, and `count` in O(1) per sample and
/// derives mean, unbiased standard deviation, and a Gaussian CDF from them.
/// With [`Experiment::with_concern`], a bounded heap additionally tracks the
/// largest observed values so the worst-percentile "concern" statistic can
/// be computed without retaining every sample.
#[derive(Debug, Clone, Default)]
pub struct Experiment {
    sum: f64,
    square_sum: f64,
    count: usize,
    // Min-heap of the largest values seen, capped at CONCERN_HEAP_SIZE.
    worst: Option<BinaryHeap<Reverse<OrdF64>>>,
}

impl Experiment {
    /// Create an accumulator without concern tracking.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an accumulator that also tracks worst-case samples.
    pub fn with_concern() -> Self {
        Self {
            worst: Some(BinaryHeap::with_capacity(CONCERN_HEAP_SIZE + 1)),
            ..Self::default()
        }
    }

    /// Record one observation.
    pub fn sample(&mut self, value: f64) {
        self.sum += value;
        self.square_sum += value * value;
        self.count += 1;

        if let Some(heap) = self.worst.as_mut() {
            heap.push(Reverse(OrdF64(value)));
            if heap.len() > CONCERN_HEAP_SIZE {
                heap.pop();
            }
        }
    }

    /// Number of observations recorded so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Sample mean, or 0 with no observations.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum / self.count as f64
    }

    /// Unbiased sample standard deviation (n-1 denominator).
    ///
    /// Returns 0 for fewer than two observations.
    pub fn standard_deviation(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let n = self.count as f64;
        let variance = (self.square_sum - self.sum * self.sum / n) / (n - 1.0);
        // Cancellation can push a zero variance slightly negative.
        variance.max(0.0).sqrt()
    }

    /// Gaussian CDF of `value` under the accumulated mean and deviation.
    ///
    /// Uses the Abramowitz–Stegun erf approximation. With zero deviation
    /// this degenerates to a step function at the mean.
    pub fn cdf(&self, value: f64) -> f64 {
        let sd = self.standard_deviation();
        if sd == 0.0 {
            return if value < self.mean() { 0.0 } else { 1.0 };
        }
        0.5 * (1.0 + erf((value - self.mean()) / (sd * std::f64::consts::SQRT_2)))
    }

    /// Mean of the worst `percentage`% of observations.
    ///
    /// Falls back to the plain mean when concern tracking is disabled.
    /// Returns 0 with no observations.
    pub fn concern(&self, percentage: f64) -> f64 {
        let Some(heap) = self.worst.as_ref() else {
            return self.mean();
        };
        let size = ((self.count as f64 * percentage / 100.0).ceil() as usize)
            .min(heap.len())
            .max(if heap.is_empty() { 0 } else { 1 });
        if size == 0 {
            return 0.0;
        }

        // The heap holds the largest values overall; take its top `size`.
        let mut values: Vec<f64> = heap.iter().map(|Reverse(OrdF64(v))| *v).collect();
        values.sort_by(|a, b| b.total_cmp(a));
        values.truncate(size);
        values.iter().sum::<f64>() / size as f64
    }

    /// Concern-weighted score: the geometric mean of the mean and the
    /// worst-percentile concern.
    ///
    /// The concern term is floored at 1 so a sub-unit tail cannot collapse
    /// the geometric mean to zero.
    pub fn score(&self, percentage: f64) -> f64 {
        (self.mean() * self.concern(percentage).max(1.0)).sqrt()
    }
}

/// Abramowitz–Stegun erf approximation (formula 7.1.26, |error| <= 1.5e-7).
fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_experiment() {
        let experiment = Experiment::new();
        assert_eq!(experiment.mean(), 0.0);
        assert_eq!(experiment.standard_deviation(), 0.0);
        assert_eq!(experiment.count(), 0);
    }

    #[test]
    fn test_single_sample_deviation_is_zero() {
        let mut experiment = Experiment::new();
        experiment.sample(42.0);
        assert_eq!(experiment.mean(), 42.0);
        assert_eq!(experiment.standard_deviation(), 0.0);
    }

    #[test]
    fn test_constant_samples() {
        let mut experiment = Experiment::new();
        for _ in 0..4 {
            experiment.sample(2.0);
        }
        assert_eq!(experiment.mean(), 2.0);
        assert_eq!(experiment.standard_deviation(), 0.0);
    }

    #[test]
    fn test_mean_and_deviation() {
        let mut experiment = Experiment::new();
        for x in [1.0, 2.0, 3.0, 4.0, 5.0] {
            experiment.sample(x);
        }
        assert!((experiment.mean() - 3.0).abs() < 1e-12);
        // Sample variance of [1..5] is 2.5.
        assert!((experiment.standard_deviation() - 2.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_cdf_at_mean_is_half() {
        let mut experiment = Experiment::new();
        for x in [1.0, 2.0, 3.0, 4.0, 5.0] {
            experiment.sample(x);
        }
        assert!((experiment.cdf(3.0) - 0.5).abs() < 1e-7);
        assert!(experiment.cdf(10.0) > 0.99);
        assert!(experiment.cdf(-4.0) < 0.01);
    }

    #[test]
    fn test_cdf_zero_deviation_is_step() {
        let mut experiment = Experiment::new();
        experiment.sample(5.0);
        experiment.sample(5.0);
        assert_eq!(experiment.cdf(4.9), 0.0);
        assert_eq!(experiment.cdf(5.0), 1.0);
    }

    #[test]
    fn test_concern_tracks_worst_samples() {
        let mut experiment = Experiment::with_concern();
        for i in 1..=100 {
            experiment.sample(i as f64);
        }
        // Worst 5% of 100 samples are [96..100], mean 98.
        assert!((experiment.concern(5.0) - 98.0).abs() < 1e-12);
        assert!(experiment.concern(5.0) > experiment.mean());
    }

    #[test]
    fn test_concern_without_heap_falls_back_to_mean() {
        let mut experiment = Experiment::new();
        for i in 1..=10 {
            experiment.sample(i as f64);
        }
        assert_eq!(experiment.concern(5.0), experiment.mean());
    }

    #[test]
    fn test_score_is_geometric_mean() {
        let mut experiment = Experiment::with_concern();
        for i in 1..=100 {
            experiment.sample(i as f64);
        }
        let expected = (experiment.mean() * experiment.concern(5.0)).sqrt();
        assert!((experiment.score(5.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_score_concern_floor() {
        let mut experiment = Experiment::with_concern();
        for _ in 0..10 {
            experiment.sample(0.25);
        }
        // Concern 0.25 floors to 1, so the score equals sqrt(mean).
        assert!((experiment.score(5.0) - 0.25f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_erf_reference_values() {
        // The polynomial approximation carries an absolute error around
        // 1.5e-7, so even erf(0) is only zero to that order.
        assert!(erf(0.0).abs() < 1e-7);
        assert!((erf(1.0) - 0.8427007929).abs() < 1e-6);
        assert!((erf(-1.0) + 0.8427007929).abs() < 1e-6);
        assert!((erf(2.0) - 0.9953222650).abs() < 1e-6);
    }
}
