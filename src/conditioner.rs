//! Per-axis signal conditioning.
//!
//! Each horizontal axis runs through an exponential low-pass filter and then
//! a deadband that snaps near-zero readings to exactly zero, so residual
//! sensor noise never reaches the integrator as a slow bias.

use crate::models::Acceleration;

/// Conditioning parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditionerConfig {
    /// Weight of the previous filtered value, in [0, 1).
    /// 0 disables smoothing; values near 1 smooth heavily.
    pub low_pass_alpha: f64,

    /// Magnitude in m/s² below which filtered output is forced to 0
    pub deadband: f64,
}

impl Default for ConditionerConfig {
    fn default() -> Self {
        Self {
            low_pass_alpha: 0.85,
            deadband: 0.08,
        }
    }
}

/// Exponential low-pass filter for a single axis.
///
/// The first reading seeds the filter directly, so a constant input is
/// passed through unchanged instead of ramping up from zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LowPassFilter {
    value: Option<f64>,
}

impl LowPassFilter {
    pub fn new() -> Self {
        Self { value: None }
    }

    /// `lp = α·lp + (1-α)·raw`
    pub fn update(&mut self, raw: f64, alpha: f64) -> f64 {
        let next = match self.value {
            Some(previous) => alpha * previous + (1.0 - alpha) * raw,
            None => raw,
        };
        self.value = Some(next);
        next
    }

    /// Current filtered value, 0 before the first reading
    pub fn value(&self) -> f64 {
        self.value.unwrap_or(0.0)
    }
}

/// Snap `value` to 0 when its magnitude is under `threshold`
#[inline]
pub fn apply_deadband(value: f64, threshold: f64) -> f64 {
    if value.abs() < threshold {
        0.0
    } else {
        value
    }
}

/// Low-pass + deadband over the x and y axes
#[derive(Debug, Clone)]
pub struct SignalConditioner {
    config: ConditionerConfig,
    x: LowPassFilter,
    y: LowPassFilter,
}

impl SignalConditioner {
    pub fn new(config: ConditionerConfig) -> Self {
        Self {
            config,
            x: LowPassFilter::new(),
            y: LowPassFilter::new(),
        }
    }

    /// Condition one reading, returning `(ax', ay')`.
    ///
    /// Must be called once per sample in arrival order.
    pub fn condition(&mut self, acceleration: &Acceleration) -> (f64, f64) {
        let alpha = self.config.low_pass_alpha;
        let lx = self.x.update(acceleration.x, alpha);
        let ly = self.y.update(acceleration.y, alpha);

        (
            apply_deadband(lx, self.config.deadband),
            apply_deadband(ly, self.config.deadband),
        )
    }

    /// Raw filter state `(lp_x, lp_y)` before the deadband
    pub fn low_pass_values(&self) -> (f64, f64) {
        (self.x.value(), self.y.value())
    }

    pub fn config(&self) -> &ConditionerConfig {
        &self.config
    }
}
