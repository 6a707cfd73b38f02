//! Common types shared between the sampler, controllers, and results.

use serde::{Deserialize, Serialize};

/// Classification of a recorded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameType {
    /// The complexity changed since the previous frame.
    Mutation,
    /// The frame rendered the same complexity as the previous frame.
    Animation,
}

/// One per-frame observation.
///
/// Samples are stored column-wise inside the [`Sampler`]; this struct is the
/// row view used when recording and when iterating results.
///
/// [`Sampler`]: crate::sampler::Sampler
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Whether this frame mutated complexity.
    pub frame_type: FrameType,
    /// Frame callback timestamp in milliseconds.
    pub timestamp: f64,
    /// Workload size rendered this frame.
    pub complexity: i64,
    /// Raw inter-frame delta in milliseconds, or -1.0 for the first frame.
    pub frame_length: f64,
    /// Smoothed interval estimate in milliseconds, or -1.0 until the
    /// enclosing sampling interval closes.
    pub frame_length_estimate: f64,
}

/// Named checkpoints emitted into the sample stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkName {
    /// The benchmark run began.
    SamplingStart,
    /// The benchmark run ended.
    SamplingEnd,
    /// A tier probe concluded.
    TierComplete,
    /// A ramp concluded and produced a regression.
    RampComplete,
}

/// A named, timestamped checkpoint.
///
/// Marks are written once and never mutated, except for the single
/// time-origin shift applied when results are assembled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    /// What the checkpoint denotes.
    pub name: MarkName,
    /// Timestamp in milliseconds (rebased to the run start in results).
    pub time: f64,
    /// Index of the next sample at the time the mark was written.
    pub index: usize,
}

/// The rendering collaborator the controller steers.
///
/// The benchmark driver owns the actual scene; the controller only reads
/// the current workload size and requests changes to it.
pub trait Stage {
    /// Current workload size (particle count, shape count, tile count).
    fn complexity(&self) -> i64;

    /// Apply a workload change. Positive deltas add work, negative deltas
    /// remove it. Implementations may clamp at their own lower bound.
    fn tune(&mut self, delta: i64);
}
