//! Scoring module - line clear points, level and gravity cadence
//!
//! - One cleared row is worth one point.
//! - Simultaneous clears use a multiplier: 2 rows x1.5, 3 rows x2, 4 rows x3
//!   (multiplier times rows, floored).
//! - Level is derived from the cumulative score, never stored.
//! - Combo is tracked by the engine for display only and does not feed into points.

use crate::types::{
    BASE_DROP_MS, CLEAR_MULTIPLIER_HALVES, DROP_INTERVAL_MIN_MS, DROP_STEP_MS, POINTS_PER_LEVEL,
    SOFT_DROP_POINTS,
};

/// Points for clearing `rows` rows with one lock.
///
/// More than four rows (only reachable on hand-built boards) uses the x3 multiplier.
pub fn calculate_line_score(rows: usize) -> u32 {
    if rows == 0 {
        return 0;
    }
    let halves = CLEAR_MULTIPLIER_HALVES
        .get(rows)
        .copied()
        .unwrap_or(CLEAR_MULTIPLIER_HALVES[4]);
    (rows as u32).saturating_mul(halves) / 2
}

/// Points for a flagged soft drop of `cells` rows
pub fn calculate_drop_score(cells: u32) -> u32 {
    cells.saturating_mul(SOFT_DROP_POINTS)
}

/// Level for a cumulative score: `floor(score / 500) + 1`
pub fn calculate_level(score: u32) -> u32 {
    score / POINTS_PER_LEVEL + 1
}

/// Gravity interval for a level: `max(100, 800 - (level - 1) * 50)` ms
pub fn get_drop_interval_ms(level: u32) -> u32 {
    let speedup = level.saturating_sub(1).saturating_mul(DROP_STEP_MS);
    BASE_DROP_MS
        .saturating_sub(speedup)
        .max(DROP_INTERVAL_MIN_MS)
}
