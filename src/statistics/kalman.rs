//! Steady-state scalar Kalman smoother for frame-length measurements.

/// Fixed-gain scalar Kalman estimator.
///
/// Frame-length noise characteristics do not change within a run, so the
/// filter uses the steady-state gain of the scalar Riccati recursion
/// instead of tracking covariance per step: for process error `q` and
/// measurement error `r`, the converged estimation error is
/// `e = (sqrt(q^2 + 4qr) - q) / 2` and the gain is `e / (e + r)`.
#[derive(Debug, Clone)]
pub struct KalmanEstimator {
    gain: f64,
    estimate: Option<f64>,
}

impl KalmanEstimator {
    /// Create an estimator from process and measurement error magnitudes.
    ///
    /// # Panics
    ///
    /// Panics if either error is not positive.
    pub fn new(process_error: f64, measurement_error: f64) -> Self {
        assert!(process_error > 0.0, "process error must be positive");
        assert!(measurement_error > 0.0, "measurement error must be positive");

        let error = 0.5
            * ((process_error * process_error + 4.0 * process_error * measurement_error).sqrt()
                - process_error);
        Self {
            gain: error / (error + measurement_error),
            estimate: None,
        }
    }

    /// Fold one measurement into the estimate and return the new estimate.
    ///
    /// The first measurement initializes the filter directly.
    pub fn next(&mut self, measurement: f64) -> f64 {
        let updated = match self.estimate {
            Some(estimate) => estimate + self.gain * (measurement - estimate),
            None => measurement,
        };
        self.estimate = Some(updated);
        updated
    }

    /// Current smoothed estimate, or 0 before the first measurement.
    pub fn estimate(&self) -> f64 {
        self.estimate.unwrap_or(0.0)
    }

    /// Forget the current estimate.
    ///
    /// Called when complexity jumps (tier transitions, ramp starts) so the
    /// smoother does not bleed the previous operating point into the next.
    pub fn reset(&mut self) {
        self.estimate = None;
    }
}
