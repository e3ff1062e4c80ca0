//! Percent-change arithmetic over cumulative counters.
//!
//! Subgraph volume fields are lifetime totals, so period values are always
//! differences between two samples. Degenerate inputs (zero or missing
//! baseline) yield a 0% change rather than NaN/inf so dashboard consumers
//! never see non-finite numbers.

/// Percent change between `current` and `previous`.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    let change = ((current - previous) / previous) * 100.0;
    if change.is_finite() { change } else { 0.0 }
}

/// Change over the most recent period, plus the percent move of that period
/// against the one before it.
///
/// Takes a cumulative counter sampled now, one period ago and two periods ago.
/// Returns `(current_period_value, percent_change_vs_previous_period)`.
pub fn two_period_change(current: f64, one_back: f64, two_back: f64) -> (f64, f64) {
    let current_period = current - one_back;
    let previous_period = one_back - two_back;

    let percent = ((current_period - previous_period) / previous_period) * 100.0;
    if percent.is_finite() { (current_period, percent) } else { (current_period, 0.0) }
}
