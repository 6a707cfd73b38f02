//! Self-tuning PID feedback controller for the Adaptive strategy.
//!
//! The controller knows nothing about the plant ahead of time: a single
//! complexity unit might be a particle or an entire scene layer. It
//! therefore auto-tunes with a Ziegler–Nichols relay-style procedure:
//! grow the proportional gain until the output oscillates around the
//! setpoint, measure the oscillation period, then derive the integral and
//! derivative times from the "some overshoot" tuning row.

use log::debug;

/// Phases of the auto-tuning procedure. Transitions are strictly
/// forward-only, driven by setpoint crossings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuningStage {
    /// Proportional-only, gain ramping up until the first crossing.
    Warming,
    /// First oscillation half-period after the initial crossing.
    Overshoot,
    /// Second oscillation half-period, still at the ultimate gain.
    Undershoot,
    /// Full PID with anti-windup, gains frozen.
    Saturate,
}

/// PID controller with Ziegler–Nichols auto-tuning and back-calculation
/// anti-windup.
#[derive(Debug, Clone)]
pub struct PidController {
    setpoint: f64,
    stage: TuningStage,

    kp: f64,
    /// Proportional gain at the first crossing (ultimate gain).
    ku: f64,
    ti: f64,
    td: f64,
    tt: f64,
    integral: f64,

    /// Continuous control signal (target complexity).
    out: f64,
    /// Control signal after integer rounding was applied.
    applied: f64,

    start_timestamp: Option<f64>,
    initial_distance: f64,
    /// Sign of the error at the current stage's entry.
    stage_error_sign: f64,
    prev_y: f64,

    oscillation_start: f64,
    out_min: f64,
    out_max: f64,
}

impl PidController {
    /// Create a controller driving the system output toward `setpoint`.
    pub fn new(setpoint: f64) -> Self {
        Self {
            setpoint,
            stage: TuningStage::Warming,
            kp: 0.0,
            ku: 0.0,
            ti: 0.0,
            td: 0.0,
            tt: 0.0,
            integral: 0.0,
            out: 0.0,
            applied: 0.0,
            start_timestamp: None,
            initial_distance: 0.0,
            stage_error_sign: 0.0,
            prev_y: 0.0,
            oscillation_start: 0.0,
            out_min: f64::MAX,
            out_max: f64::MIN,
        }
    }

    /// Current tuning stage.
    pub fn stage(&self) -> TuningStage {
        self.stage
    }

    /// Compute the next complexity delta.
    ///
    /// `t` is the timestamp in milliseconds, `h` the elapsed time since the
    /// previous call, and `y` the measured system output (smoothed frame
    /// length). The returned delta is rounded away from zero so any
    /// nonzero control action moves complexity by at least one unit.
    pub fn tune(&mut self, t: f64, h: f64, y: f64) -> i64 {
        let e = self.setpoint - y;

        let start = *self.start_timestamp.get_or_insert_with(|| {
            self.initial_distance = e.abs();
            self.stage_error_sign = sign(e);
            self.prev_y = y;
            t
        });

        let crossed = e == 0.0 || sign(e) != self.stage_error_sign;
        match self.stage {
            TuningStage::Warming => {
                if crossed {
                    self.enter_overshoot(t, e);
                } else {
                    // The reference distance follows a cubic ramp from the
                    // initial error: deliberately slow-starting, so the
                    // effect of a single complexity unit is measurable
                    // before the gain commits to larger steps.
                    let elapsed = (t - start) / 1000.0;
                    let ultimate = self.initial_distance * elapsed * elapsed * elapsed;
                    let current = e.abs();
                    if ultimate > 0.0 && current > 0.0 {
                        self.kp = (self.kp + 0.1 * (ultimate / current).ln()).max(0.0);
                    }
                }
                self.out = self.kp * e;
            }
            TuningStage::Overshoot => {
                if crossed {
                    self.enter_undershoot(e);
                }
                self.out = self.kp * e;
                self.track_band();
            }
            TuningStage::Undershoot => {
                if crossed {
                    self.enter_saturate(t, e);
                    self.out = self.pid_step(h, y, e);
                } else {
                    self.out = self.kp * e;
                    self.track_band();
                }
            }
            TuningStage::Saturate => {
                self.out = self.pid_step(h, y, e);
            }
        }

        self.prev_y = y;

        let delta = round_away_from_zero(self.out - self.applied);
        self.applied += delta as f64;
        delta
    }

    fn enter_overshoot(&mut self, t: f64, e: f64) {
        self.stage = TuningStage::Overshoot;
        self.ku = self.kp;
        self.oscillation_start = t;
        self.stage_error_sign = sign(e);
        // The control signal that caused the crossing bounds the band; the
        // oscillation extremes widen it from here.
        self.out_min = self.out;
        self.out_max = self.out;
        debug!("pid: warming -> overshoot, ku={:.3}", self.ku);
    }

    fn enter_undershoot(&mut self, e: f64) {
        self.stage = TuningStage::Undershoot;
        // The gain stays at ku so the oscillation sustains itself through
        // the second half-period; anything lower lets the loop settle
        // before the period has been measured.
        self.stage_error_sign = sign(e);
        debug!("pid: overshoot -> undershoot");
    }

    fn enter_saturate(&mut self, t: f64, e: f64) {
        self.stage = TuningStage::Saturate;
        self.stage_error_sign = sign(e);

        // Ziegler-Nichols "some overshoot" row from the measured
        // oscillation period.
        let tu = (t - self.oscillation_start).max(1.0);
        self.ti = tu / 2.0;
        self.td = tu / 3.0;
        self.tt = (self.ti * self.td).sqrt();
        self.kp = self.ku / 3.0;

        // Bumpless transfer: seed the integral so the first PID output
        // matches the current control signal.
        self.integral = self.out - self.kp * e;
        debug!(
            "pid: undershoot -> saturate, tu={:.1} ti={:.1} td={:.1} band=[{:.1}, {:.1}]",
            tu, self.ti, self.td, self.out_min, self.out_max
        );
    }

    fn track_band(&mut self) {
        self.out_min = self.out_min.min(self.out);
        self.out_max = self.out_max.max(self.out);
    }

    /// One PID step with back-calculation anti-windup. The actuator is
    /// clamped to the band observed during the oscillation phases, and the
    /// clamping delta is fed back into the integral term.
    fn pid_step(&mut self, h: f64, y: f64, e: f64) -> f64 {
        let h = h.max(1.0);
        let p = self.kp * e;
        self.integral += self.kp * h / self.ti * e;
        // Derivative on the measurement, not the error, to avoid setpoint
        // kick.
        let d = -self.kp * self.td * (y - self.prev_y) / h;

        let v = p + self.integral + d;
        let clamped = v.clamp(self.out_min, self.out_max);
        self.integral += (clamped - v) * h / self.tt;
        clamped
    }
}

fn sign(x: f64) -> f64 {
    if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}

fn round_away_from_zero(x: f64) -> i64 {
    if x > 0.0 {
        x.ceil() as i64
    } else if x < 0.0 {
        x.floor() as i64
    } else {
        0
    }
}
