//! Pure SM-2 style scoring functions.
//!
//! Outcome rating scale (1-5):
//! 5 - Perfect recall
//! 4 - Correct response after a hesitation
//! 3 - Correct response recalled with serious difficulty
//! 2 - Incorrect response; the correct one seemed easy to recall
//! 1 - Total failure
//!
//! Nothing in this module touches the clock or the store; the recorder
//! feeds in the card's current fields and writes the results back.

/// Easiness factor never drops below this floor; it keeps intervals from
/// degenerating toward zero growth.
pub const MIN_EASINESS_FACTOR: f64 = 1.3;

/// Practical EF ceiling used when normalizing for the retention estimate.
/// Sustained perfect recall converges a little above this.
const EASE_CEILING: f64 = 3.0;

/// Updates the easiness factor from a review outcome.
///
/// EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), floored at 1.3.
/// A perfect rating nudges EF up by 0.1; a total failure costs 0.54.
pub fn update_easiness_factor(current: f64, outcome_rating: u8) -> f64 {
    debug_assert!((1..=5).contains(&outcome_rating));
    let q = f64::from(outcome_rating);
    let next = current + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02));
    next.max(MIN_EASINESS_FACTOR)
}

/// A failing rating (< 3) restarts the learning curve; otherwise the
/// repetition count advances by one.
pub fn next_repetition_count(current: u32, outcome_rating: u8) -> u32 {
    debug_assert!((1..=5).contains(&outcome_rating));
    if outcome_rating < 3 {
        0
    } else {
        current + 1
    }
}

/// Interval in days until the next review, given the repetition count
/// *after* this outcome was applied.
///
/// The 1-day / 6-day bootstrap is the standard two-step ramp before
/// EF-scaled growth takes over.
pub fn next_interval_days(repetition_count: u32, easiness_factor: f64, previous_days: i64) -> i64 {
    match repetition_count {
        0 | 1 => 1,
        2 => 6,
        _ => (previous_days.max(1) as f64 * easiness_factor).round() as i64,
    }
}

/// Bounded 0-1 estimate of current retrievability.
///
/// Higher difficulty pushes the estimate down, a higher easiness factor
/// pulls it up. The exact curve is a modeling choice; only monotonicity
/// and the [0, 1] bound are contractual.
pub fn retention_estimate(difficulty: f64, easiness_factor: f64) -> f64 {
    let ease_term =
        ((easiness_factor - MIN_EASINESS_FACTOR) / (EASE_CEILING - MIN_EASINESS_FACTOR))
            .clamp(0.0, 1.0);
    let difficulty_term = ((5.0 - difficulty) / 4.0).clamp(0.0, 1.0);
    (0.2 + 0.55 * ease_term + 0.25 * difficulty_term).clamp(0.0, 1.0)
}

/// Blends previous mastery with the fresh retention estimate, weighted
/// toward recent performance. Saturates in [0, 1] and never increases on
/// a failing rating.
pub fn mastery_level(previous: f64, retention: f64, outcome_rating: u8) -> f64 {
    debug_assert!((1..=5).contains(&outcome_rating));
    let performance = retention * f64::from(outcome_rating) / 5.0;
    let blended = previous * 0.6 + performance * 0.4;
    let next = if outcome_rating < 3 {
        blended.min(previous)
    } else {
        blended
    };
    next.clamp(0.0, 1.0)
}
