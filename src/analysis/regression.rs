//! Constrained two-segment piecewise-linear least squares.
//!
//! Complexity/frame-length curves are expected to sit flat at the desired
//! frame length below a capacity threshold and degrade linearly above it.
//! A single unconstrained fit smears that shape into a misleading slope, so
//! the solver pins the first segment to the desired frame length and
//! free-fits only the break position and the second slope (Kundu–Ubhaya
//! style constrained segmented regression). In the flat profile both
//! segments are horizontal, modeling degradation that arrives as a step.

use serde::{Deserialize, Serialize};

/// Regression constraint mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegressionProfile {
    /// First segment pinned to the desired frame length, second free.
    Slope,
    /// Both segments horizontal; the breakpoint is the step location.
    Flat,
}

/// Inputs to the solver besides the points themselves.
#[derive(Debug, Clone, Copy)]
pub struct RegressionOptions {
    /// Frame length the first segment is pinned to.
    pub desired_frame_length: f64,
    /// Constraint mode.
    pub profile: RegressionProfile,
}

/// One fitted line segment: `y = s + t * x` over `n` points with summed
/// squared residual `e`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Intercept.
    pub s: f64,
    /// Slope.
    pub t: f64,
    /// Number of points in the partition.
    pub n: usize,
    /// Sum of squared residuals.
    pub e: f64,
}

impl Segment {
    fn single_point(y: f64) -> Self {
        Self { s: y, t: 0.0, n: 1, e: 0.0 }
    }

    /// Evaluate the segment's line at `x`.
    pub fn value_at(&self, x: f64) -> f64 {
        self.s + self.t * x
    }
}

/// Running sufficient statistics for one partition.
#[derive(Debug, Clone, Copy, Default)]
struct PartitionSums {
    n: f64,
    sx: f64,
    sxx: f64,
    sy: f64,
    sxy: f64,
    syy: f64,
}

impl PartitionSums {
    fn add(&mut self, x: f64, y: f64, weight: f64) {
        self.n += weight;
        self.sx += weight * x;
        self.sxx += weight * x * x;
        self.sy += weight * y;
        self.sxy += weight * x * y;
        self.syy += weight * y * y;
    }

    fn remove(&mut self, x: f64, y: f64, weight: f64) {
        self.add(x, y, -weight);
    }

    /// Residual error of the fixed line `y = s + t * x` over the partition.
    fn error_against(&self, s: f64, t: f64) -> f64 {
        let e = self.syy - 2.0 * s * self.sy - 2.0 * t * self.sxy
            + 2.0 * s * t * self.sx
            + s * s * self.n
            + t * t * self.sxx;
        e.max(0.0)
    }

    /// Free least-squares line, or `None` on a degenerate denominator.
    fn least_squares(&self) -> Option<(f64, f64, f64)> {
        if self.n <= 0.0 {
            return None;
        }
        let denom = self.n * self.sxx - self.sx * self.sx;
        if denom.abs() < f64::EPSILON {
            return None;
        }
        let t = (self.n * self.sxy - self.sx * self.sy) / denom;
        let s = (self.sy - t * self.sx) / self.n;
        let e = (self.syy - s * self.sy - t * self.sxy).max(0.0);
        Some((s, t, e))
    }

    /// Horizontal least-squares line (mean fit).
    fn flat_fit(&self) -> Option<(f64, f64)> {
        if self.n <= 0.0 {
            return None;
        }
        let s = self.sy / self.n;
        let e = (self.syy - self.sy * self.sy / self.n).max(0.0);
        Some((s, e))
    }
}

/// Result of the two-segment fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Regression {
    /// Left segment (pinned to the desired frame length, except in the
    /// single-point boundary case).
    pub segment1: Segment,
    /// Right segment.
    pub segment2: Segment,
    /// Breakpoint: x-coordinate where the two segments intersect.
    pub complexity: f64,
    /// Constraint mode the fit was computed under.
    pub profile: RegressionProfile,
    /// `sqrt(e1 / n1)`.
    pub stdev1: f64,
    /// `sqrt(e2 / n2)`.
    pub stdev2: f64,
    /// Total error `e1 + e2`.
    pub error: f64,
}

/// Intersection acceptance tolerance, relative to the x window.
const WINDOW_EPS: f64 = 1e-9;

impl Regression {
    /// Fit `(complexity, frame_length)` points.
    ///
    /// Returns `None` for an empty input; a single point yields the
    /// documented boundary result where both segments pass through it with
    /// zero error. Candidate splits with degenerate denominators are
    /// skipped, keeping the best feasible pair seen so far.
    pub fn new(points: &[(f64, f64)], options: RegressionOptions) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let mut sorted = points.to_vec();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        if sorted.len() == 1 {
            let (x, y) = sorted[0];
            return Some(Self {
                segment1: Segment::single_point(y),
                segment2: Segment::single_point(y),
                complexity: x,
                profile: options.profile,
                stdev1: 0.0,
                stdev2: 0.0,
                error: 0.0,
            });
        }

        let solver = Solver {
            points: &sorted,
            options,
        };
        Some(solver.solve())
    }

    /// Evaluate the fitted piecewise line at `x`.
    pub fn value_at(&self, x: f64) -> f64 {
        if x < self.complexity {
            self.segment1.value_at(x)
        } else {
            self.segment2.value_at(x)
        }
    }
}

struct Solver<'a> {
    points: &'a [(f64, f64)],
    options: RegressionOptions,
}

/// A candidate segment pair at one split position.
struct Candidate {
    segment1: Segment,
    segment2: Segment,
    complexity: f64,
    error: f64,
}

impl Solver<'_> {
    fn solve(&self) -> Regression {
        let n = self.points.len();
        let mut left = PartitionSums::default();
        let mut right = PartitionSums::default();
        for &(x, y) in self.points {
            right.add(x, y, 1.0);
        }

        let mut best: Option<Candidate> = None;

        for j in 0..n - 1 {
            let (xj, yj) = self.points[j];
            left.add(xj, yj, 1.0);
            right.remove(xj, yj, 1.0);

            let best_error = best.as_ref().map_or(f64::MAX, |b| b.error);

            if let Some(candidate) = self.candidate_at(j, &left, &right, 0.0, best_error) {
                best = Some(candidate);
            } else if let Some(candidate) = self.lambda_candidate(j, &left, &right, best_error) {
                best = Some(candidate);
            }
        }

        match best {
            Some(c) => self.finish(c),
            None => self.fallback(),
        }
    }

    /// Fit both partitions with `lambda` weight of the boundary point
    /// `points[j + 1]` shifted into the left partition, then run the
    /// feasibility test against the `[x[j], x[j+1]]` window.
    fn candidate_at(
        &self,
        j: usize,
        left: &PartitionSums,
        right: &PartitionSums,
        lambda: f64,
        best_error: f64,
    ) -> Option<Candidate> {
        let n = self.points.len();
        let (x_lo, _) = self.points[j];
        let (x_hi, y_hi) = self.points[j + 1];
        let desired = self.options.desired_frame_length;

        // Left segment: pinned to the desired frame length, except a
        // single-point partition which passes exactly through its point.
        let (s1, t1, mut e1) = if j == 0 {
            let (_, y0) = self.points[0];
            (y0, 0.0, 0.0)
        } else {
            (desired, 0.0, left.error_against(desired, 0.0))
        };
        if lambda > 0.0 {
            let r = y_hi - (s1 + t1 * x_hi);
            e1 += lambda * r * r;
        }

        // Right segment, with the boundary point's weight reduced by lambda.
        let mut right_sums = *right;
        if lambda > 0.0 {
            right_sums.remove(x_hi, y_hi, lambda);
        }
        let (s2, t2, e2) = if j == n - 2 && lambda == 0.0 {
            let (_, y_last) = self.points[n - 1];
            (y_last, 0.0, 0.0)
        } else {
            match self.options.profile {
                RegressionProfile::Slope => right_sums.least_squares()?,
                RegressionProfile::Flat => {
                    let (s, e) = right_sums.flat_fit()?;
                    (s, 0.0, e)
                }
            }
        };

        let error = e1 + e2;
        if error > best_error {
            return None;
        }

        let complexity = self.intersection(s1, t1, s2, t2, x_lo, x_hi)?;

        let window = (x_hi - x_lo).abs().max(1.0) * WINDOW_EPS;
        if complexity < x_lo - window || complexity > x_hi + window {
            return None;
        }

        Some(Candidate {
            segment1: Segment { s: s1, t: t1, n: j + 1, e: e1 },
            segment2: Segment { s: s2, t: t2, n: n - j - 1, e: e2 },
            complexity,
            error,
        })
    }

    /// Intersection x of the two candidate lines within `[x_lo, x_hi]`.
    ///
    /// Parallel lines are accepted only when they coincide; for the flat
    /// profile the step location is taken as the window midpoint.
    fn intersection(&self, s1: f64, t1: f64, s2: f64, t2: f64, x_lo: f64, x_hi: f64) -> Option<f64> {
        if self.options.profile == RegressionProfile::Flat {
            return Some(0.5 * (x_lo + x_hi));
        }
        if (t1 - t2).abs() > f64::EPSILON {
            return Some((s2 - s1) / (t1 - t2));
        }
        if (s1 - s2).abs() < 1e-9 {
            return Some(x_lo);
        }
        None
    }

    /// Continuous relaxation of the discrete split: search the fractional
    /// weight of the boundary point that minimizes total error, and accept
    /// the result under the same feasibility test. Golden-section over
    /// (0, 1); the error is smooth in lambda.
    fn lambda_candidate(
        &self,
        j: usize,
        left: &PartitionSums,
        right: &PartitionSums,
        best_error: f64,
    ) -> Option<Candidate> {
        const INV_PHI: f64 = 0.618_033_988_749_894_8;

        let error_of = |lambda: f64| -> f64 {
            self.candidate_at(j, left, right, lambda, f64::MAX)
                .map_or(f64::MAX, |c| c.error)
        };

        let mut lo = 0.0;
        let mut hi = 1.0;
        let mut a = hi - INV_PHI * (hi - lo);
        let mut b = lo + INV_PHI * (hi - lo);
        let mut fa = error_of(a);
        let mut fb = error_of(b);

        for _ in 0..48 {
            if fa < fb {
                hi = b;
                b = a;
                fb = fa;
                a = hi - INV_PHI * (hi - lo);
                fa = error_of(a);
            } else {
                lo = a;
                a = b;
                fa = fb;
                b = lo + INV_PHI * (hi - lo);
                fb = error_of(b);
            }
        }

        let lambda = 0.5 * (lo + hi);
        if lambda <= 0.0 || lambda >= 1.0 {
            return None;
        }
        self.candidate_at(j, left, right, lambda, best_error)
    }

    fn finish(&self, c: Candidate) -> Regression {
        Regression {
            stdev1: stdev(c.segment1.e, c.segment1.n),
            stdev2: stdev(c.segment2.e, c.segment2.n),
            segment1: c.segment1,
            segment2: c.segment2,
            complexity: c.complexity,
            profile: self.options.profile,
            error: c.error,
        }
    }

    /// No split admitted a feasible intersection. Keep the terminal split
    /// so callers still receive a usable (if low-confidence) pair, with the
    /// breakpoint at the maximum observed complexity.
    fn fallback(&self) -> Regression {
        let n = self.points.len();
        let desired = self.options.desired_frame_length;
        let mut left = PartitionSums::default();
        for &(x, y) in &self.points[..n - 1] {
            left.add(x, y, 1.0);
        }
        let e1 = left.error_against(desired, 0.0);
        let (x_last, y_last) = self.points[n - 1];

        Regression {
            segment1: Segment { s: desired, t: 0.0, n: n - 1, e: e1 },
            segment2: Segment::single_point(y_last),
            complexity: x_last,
            profile: self.options.profile,
            stdev1: stdev(e1, n - 1),
            stdev2: 0.0,
            error: e1,
        }
    }
}

fn stdev(e: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    (e / n as f64).sqrt()
}
