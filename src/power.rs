//! Rowing power estimates.
//!
//! Uses the ergometer relation `watts = 2.80 / pace³` with pace in seconds
//! per meter, i.e. `2.80 · v³` with v in m/s.

use crate::pace::average_available;

/// Drag constant of the ergometer power relation
pub const ERG_POWER_CONSTANT: f64 = 2.80;

/// Power in watts at a steady `speed_mps`
pub fn power_from_speed(speed_mps: f64) -> f64 {
    if !speed_mps.is_finite() || speed_mps <= 0.0 {
        return 0.0;
    }
    ERG_POWER_CONSTANT * speed_mps.powi(3)
}

/// Power at the session's average speed.
///
/// `None` under the same conditions that make pace unavailable.
pub fn average_power(elapsed_seconds: f64, meters: f64) -> Option<f64> {
    if !average_available(elapsed_seconds, meters) {
        return None;
    }
    Some(power_from_speed(meters / elapsed_seconds))
}
