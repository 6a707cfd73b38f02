//! Result artifacts handed to the external results consumer.

use serde::{Deserialize, Serialize};

use crate::analysis::{Regression, RegressionProfile};
use crate::statistics::BootstrapResult;
use crate::types::{FrameType, Mark};

/// Per-sample series, column-wise like the live sample buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleSeries {
    /// Frame classification per sample.
    pub frame_type: Vec<FrameType>,
    /// Timestamps, rebased so the run starts at zero.
    pub time: Vec<f64>,
    /// Complexity per sample.
    pub complexity: Vec<i64>,
    /// Raw inter-frame deltas (-1.0 where absent).
    pub frame_length: Vec<f64>,
    /// Smoothed interval estimates (-1.0 where absent).
    pub smoothed_frame_length: Vec<f64>,
}

impl SampleSeries {
    /// Number of samples in the series.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// True when the series is empty.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// One fitted line over a closed x-range, described by its endpoints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SegmentDescriptor {
    /// Left endpoint x.
    pub x1: f64,
    /// Fitted y at the left endpoint.
    pub y1: f64,
    /// Right endpoint x.
    pub x2: f64,
    /// Fitted y at the right endpoint.
    pub y2: f64,
}

/// Regression artifacts for a single ramp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RampDescriptor {
    /// First (on-target) fitted segment.
    pub segment1: SegmentDescriptor,
    /// Second (degradation) fitted segment.
    pub segment2: SegmentDescriptor,
    /// Breakpoint where the segments intersect.
    pub complexity: f64,
    /// Constraint mode used for the fit.
    pub profile: RegressionProfile,
    /// First sample index of the ramp.
    pub start_index: usize,
    /// One past the last sample index of the ramp.
    pub end_index: usize,
}

impl RampDescriptor {
    /// Describe a fitted regression over `[min_x, max_x]`.
    pub fn from_regression(
        regression: &Regression,
        min_x: f64,
        max_x: f64,
        start_index: usize,
        end_index: usize,
    ) -> Self {
        let break_x = regression.complexity.clamp(min_x, max_x);
        Self {
            segment1: SegmentDescriptor {
                x1: min_x,
                y1: regression.segment1.value_at(min_x),
                x2: break_x,
                y2: regression.segment1.value_at(break_x),
            },
            segment2: SegmentDescriptor {
                x1: break_x,
                y1: regression.segment2.value_at(break_x),
                x2: max_x,
                y2: regression.segment2.value_at(max_x),
            },
            complexity: regression.complexity,
            profile: regression.profile,
            start_index,
            end_index,
        }
    }
}

/// Terminal output of a benchmark run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerResults {
    /// Per-sample series.
    pub samples: SampleSeries,
    /// Named checkpoints, rebased to the run start.
    pub marks: Vec<Mark>,
    /// Per-ramp regression descriptors (Ramp strategy only).
    pub ramps: Vec<RampDescriptor>,
    /// Breakeven-complexity score. For the Ramp strategy this is the
    /// bootstrap median of the final regression breakpoint; for Fixed and
    /// Adaptive it is the concern-weighted complexity score.
    pub score: Option<f64>,
    /// Bootstrap confidence interval around the score (Ramp only).
    pub bootstrap: Option<BootstrapResult>,
}
