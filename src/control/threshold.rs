//! Adaptive resume-threshold estimator.

/// Computes the emergency threshold gating premature resumption.
///
/// The threshold grows linearly with the fraction of suspended devices:
/// the more congested the household already is, the higher a device's
/// emergency must be before it may preempt others. With zero devices the
/// estimator returns `min` — nothing is suspended, so the gate stays at
/// its most permissive.
///
/// The result is clamped to `[min, max]` and is monotone non-decreasing
/// in the suspended fraction.
pub fn resume_threshold(suspended: usize, total: usize, min: f32, max: f32) -> f32 {
    debug_assert!(min <= max, "threshold bounds inverted");
    if total == 0 {
        return min;
    }
    let fraction = suspended as f32 / total as f32;
    (min + fraction * (max - min)).clamp(min, max)
}
