//! Acceleration to velocity integration with drift control.
//!
//! Velocity is integrated with a forward Euler step and then damped every
//! step. Damping also decays genuine constant velocity; for a cyclical stroke
//! that is the accepted price of keeping residual bias from growing without
//! bound. Stillness detection (ZUPT) zeroes velocity outright once the
//! conditioned acceleration has stayed quiet for long enough.

/// Integration parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegratorConfig {
    /// Per-step multiplicative velocity decay, in (0, 1)
    pub damp: f64,

    /// Acceleration magnitude (m/s²) under which a sample counts as still
    pub still_epsilon: f64,

    /// Quiet time in milliseconds before velocity is forced to zero
    pub still_ms: f64,

    /// Speed (m/s) under which the reported speed is 0
    pub min_speed: f64,

    /// Largest accepted gap between samples, in seconds
    pub max_gap_seconds: f64,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            damp: 0.92,
            still_epsilon: 0.06,
            still_ms: 180.0,
            min_speed: 0.12,
            max_gap_seconds: 0.25,
        }
    }
}

/// Mutable integration state for one session
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IntegratorState {
    pub vx: f64,
    pub vy: f64,
    pub still_accum_ms: f64,
}

/// 2D velocity integrator
#[derive(Debug, Clone)]
pub struct VelocityIntegrator {
    config: IntegratorConfig,
    state: IntegratorState,
    zero_velocity_updates: u64,
}

impl VelocityIntegrator {
    pub fn new(config: IntegratorConfig) -> Self {
        Self {
            config,
            state: IntegratorState::default(),
            zero_velocity_updates: 0,
        }
    }

    /// Whether a time step may be integrated
    pub fn accepts(&self, dt_seconds: f64) -> bool {
        dt_seconds.is_finite() && dt_seconds > 0.0 && dt_seconds <= self.config.max_gap_seconds
    }

    /// Integrate one conditioned sample and return the reported speed.
    ///
    /// Returns `None` without touching any state when `dt_seconds` is not
    /// positive or exceeds `max_gap_seconds`.
    pub fn integrate(&mut self, ax: f64, ay: f64, dt_seconds: f64) -> Option<f64> {
        if !self.accepts(dt_seconds) {
            return None;
        }

        let damp = self.config.damp;
        let state = &mut self.state;

        state.vx = (state.vx + ax * dt_seconds) * damp;
        state.vy = (state.vy + ay * dt_seconds) * damp;

        // No partial credit: any motion restarts the quiet window.
        if ax.hypot(ay) < self.config.still_epsilon {
            state.still_accum_ms += dt_seconds * 1000.0;
            if state.still_accum_ms >= self.config.still_ms {
                state.vx = 0.0;
                state.vy = 0.0;
                state.still_accum_ms = 0.0;
                self.zero_velocity_updates += 1;
            }
        } else {
            state.still_accum_ms = 0.0;
        }

        Some(self.reported_speed())
    }

    /// Speed after the floor; the underlying velocity is left as is
    pub fn reported_speed(&self) -> f64 {
        let speed = self.state.vx.hypot(self.state.vy);
        if speed < self.config.min_speed {
            0.0
        } else {
            speed
        }
    }

    pub fn velocity(&self) -> (f64, f64) {
        (self.state.vx, self.state.vy)
    }

    pub fn state(&self) -> &IntegratorState {
        &self.state
    }

    /// Number of times stillness forced velocity to zero
    pub fn zero_velocity_updates(&self) -> u64 {
        self.zero_velocity_updates
    }

    pub fn reset(&mut self) {
        self.state = IntegratorState::default();
        self.zero_velocity_updates = 0;
    }
}
