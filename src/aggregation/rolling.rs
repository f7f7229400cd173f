//! Rolling delivery metrics.

use crate::constants::aggregation::SECONDS_PER_MINUTE;

/// Minutes between a change's creation and `now`, never negative.
/// Future-dated changes and clock skew count as zero lead time.
pub fn lead_time_minutes(now: f64, created_at: f64) -> f64 {
    ((now - created_at) / SECONDS_PER_MINUTE).max(0.0)
}

/// Exponentially-weighted moving average: `previous * (1 - alpha) + observation * alpha`
pub fn ewma(previous: f64, observation: f64, alpha: f64) -> f64 {
    previous * (1.0 - alpha) + observation * alpha
}
