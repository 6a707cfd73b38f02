//! Fixed-capacity column-wise recorder of per-frame observations.

use crate::types::{FrameType, Mark, MarkName, Sample};

/// Column-wise sample storage.
///
/// All columns are pre-sized from the expected run duration so recording a
/// frame never allocates. The owning controller is the only writer; there
/// is no concurrency control because none is needed.
#[derive(Debug, Clone)]
pub struct Sampler {
    frame_types: Vec<FrameType>,
    timestamps: Vec<f64>,
    complexities: Vec<i64>,
    frame_lengths: Vec<f64>,
    estimates: Vec<f64>,
    marks: Vec<Mark>,
    capacity: usize,
}

impl Sampler {
    /// Create a sampler with room for `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            frame_types: Vec::with_capacity(capacity),
            timestamps: Vec::with_capacity(capacity),
            complexities: Vec::with_capacity(capacity),
            frame_lengths: Vec::with_capacity(capacity),
            estimates: Vec::with_capacity(capacity),
            marks: Vec::new(),
            capacity,
        }
    }

    /// Append one row.
    ///
    /// # Panics
    ///
    /// Panics when capacity is exhausted. Capacity is sized from expected
    /// duration and frame rate, so hitting this is a configuration error
    /// that must fail loudly rather than silently drop samples.
    pub fn record(&mut self, sample: Sample) {
        assert!(
            self.timestamps.len() < self.capacity,
            "sampler capacity ({}) exhausted; test ran longer than provisioned",
            self.capacity
        );
        self.frame_types.push(sample.frame_type);
        self.timestamps.push(sample.timestamp);
        self.complexities.push(sample.complexity);
        self.frame_lengths.push(sample.frame_length);
        self.estimates.push(sample.frame_length_estimate);
    }

    /// Number of samples recorded so far; also the index of the next row.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Row view of the sample at `index`.
    pub fn sample_at(&self, index: usize) -> Sample {
        Sample {
            frame_type: self.frame_types[index],
            timestamp: self.timestamps[index],
            complexity: self.complexities[index],
            frame_length: self.frame_lengths[index],
            frame_length_estimate: self.estimates[index],
        }
    }

    /// Timestamp column.
    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    /// Complexity column.
    pub fn complexities(&self) -> &[i64] {
        &self.complexities
    }

    /// Raw frame-length column (-1.0 where absent).
    pub fn frame_lengths(&self) -> &[f64] {
        &self.frame_lengths
    }

    /// Smoothed estimate column (-1.0 where absent).
    pub fn estimates(&self) -> &[f64] {
        &self.estimates
    }

    /// Frame-type column.
    pub fn frame_types(&self) -> &[FrameType] {
        &self.frame_types
    }

    /// Overwrite the smoothed estimate for rows `start..end`.
    ///
    /// Called once per sampling interval after outlier filtering and
    /// Kalman smoothing produce the interval's estimate.
    pub fn backfill_estimates(&mut self, start: usize, end: usize, estimate: f64) {
        for slot in &mut self.estimates[start..end] {
            *slot = estimate;
        }
    }

    /// `(complexity, frame_length)` pairs for rows `start..end`, skipping
    /// rows without a raw frame length.
    pub fn regression_points(&self, start: usize, end: usize) -> Vec<(f64, f64)> {
        (start..end)
            .filter(|&i| self.frame_lengths[i] >= 0.0)
            .map(|i| (self.complexities[i] as f64, self.frame_lengths[i]))
            .collect()
    }

    /// Record a named checkpoint at the current index.
    pub fn add_mark(&mut self, name: MarkName, time: f64) {
        let index = self.len();
        self.marks.push(Mark { name, time, index });
    }

    /// Marks recorded so far.
    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    /// Shift every timestamp and mark so `origin` becomes time zero, and
    /// release unused capacity. Terminal operation before results are
    /// assembled; applied exactly once.
    pub fn rebase(&mut self, origin: f64) {
        for t in &mut self.timestamps {
            *t -= origin;
        }
        for mark in &mut self.marks {
            mark.time -= origin;
        }
        self.frame_types.shrink_to_fit();
        self.timestamps.shrink_to_fit();
        self.complexities.shrink_to_fit();
        self.frame_lengths.shrink_to_fit();
        self.estimates.shrink_to_fit();
    }
}
