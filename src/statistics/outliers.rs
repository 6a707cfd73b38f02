//! Interquartile-range outlier filtering for interval frame lengths.
//!
//! Compositor stalls and GC pauses show up as isolated multi-frame deltas
//! inside a sampling interval. Filtering them before averaging keeps those
//! artifacts out of the curve fit.

/// Remove IQR outliers from a set of frame lengths.
///
/// Keeps values within `[Q1 - 1.5*IQR, Q3 + 1.5*IQR]`, where the quartiles
/// are computed with linear interpolation over the sorted input. Input
/// order is preserved in the output. Filtering an outlier-free array
/// returns it unchanged; empty input returns empty.
pub fn filter_outliers(values: &[f64]) -> Vec<f64> {
    if values.len() < 4 {
        return values.to_vec();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q1 = percentile_sorted(&sorted, 0.25);
    let q3 = percentile_sorted(&sorted, 0.75);
    let iqr = q3 - q1;
    let low = q1 - 1.5 * iqr;
    let high = q3 + 1.5 * iqr;

    values
        .iter()
        .copied()
        .filter(|&v| v >= low && v <= high)
        .collect()
}

/// Linearly interpolated percentile of a sorted slice.
///
/// `p` is a fraction in [0, 1]. Empty input returns 0.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let h = p * (sorted.len() - 1) as f64;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}
