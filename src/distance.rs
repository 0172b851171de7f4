/// Default calibration factor from speed-time product to meters.
///
/// Hand-tuned on one rig; approximate and not physically derived.
pub const DEFAULT_DISTANCE_SCALE: f64 = 0.18;

/// Cumulative distance, non-decreasing between resets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceAccumulator {
    cumulative_meters: f64,
}

impl DistanceAccumulator {
    pub fn new() -> Self {
        Self {
            cumulative_meters: 0.0,
        }
    }

    /// Add `speed · dt · scale` and return the new total.
    ///
    /// Negative or non-finite increments are ignored.
    pub fn accumulate(&mut self, speed: f64, dt_seconds: f64, scale: f64) -> f64 {
        let increment = speed * dt_seconds * scale;
        if increment.is_finite() && increment > 0.0 {
            self.cumulative_meters += increment;
        }
        self.cumulative_meters
    }

    pub fn meters(&self) -> f64 {
        self.cumulative_meters
    }

    pub fn reset(&mut self) {
        self.cumulative_meters = 0.0;
    }
}
