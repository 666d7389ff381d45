//! Guarded arithmetic shared by every rate and average computation.
//!
//! An empty group never produces NaN: its denominator is floored at 1, so
//! the group contributes a mean or rate of 0.

/// Denominator for a group of `count` records: `count`, or 1 when empty.
pub fn guarded_denominator(count: usize) -> f64 {
    count.max(1) as f64
}

/// Mean of a group given its sum and size. 0 for an empty group.
pub fn mean(sum: f64, count: usize) -> f64 {
    sum / guarded_denominator(count)
}

/// Fraction of `hits` within a group of `count`. 0 for an empty group.
pub fn rate(hits: usize, count: usize) -> f64 {
    hits as f64 / guarded_denominator(count)
}

/// `min(a, b) / max(a, b)`, in [0, 1] for non-negative inputs.
///
/// When both sides are 0 the groups are indistinguishable and the ratio is
/// 1.0. A single empty group (mean 0) against a populated one yields 0.0.
pub fn parity_ratio(a: f64, b: f64) -> f64 {
    let lo = a.min(b);
    let hi = a.max(b);
    if hi <= 0.0 {
        return 1.0;
    }
    (lo / hi).clamp(0.0, 1.0)
}
