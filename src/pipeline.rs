//! Motion-to-distance estimation pipeline.
//!
//! Each sample flows through conditioning, velocity integration and distance
//! accumulation in lockstep:
//!
//! 1. **Conditioning**: low-pass + deadband on the horizontal axes
//! 2. **Time gate**: `dt` from the previous sample; non-positive or
//!    oversized steps are dropped and the reference re-anchored
//! 3. **Integration**: damped Euler velocity with stillness resets
//! 4. **Distance**: speed · dt · scale added to the running total
//!
//! The pipeline owns all per-session estimator state and performs no IO;
//! a fresh pipeline is built for every session.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::conditioner::{ConditionerConfig, SignalConditioner};
use crate::distance::{DistanceAccumulator, DEFAULT_DISTANCE_SCALE};
use crate::error::{Result, TrackerError};
use crate::integrator::{IntegratorConfig, VelocityIntegrator};
use crate::models::Sample;

/// Tunable estimator options.
///
/// Every constant of the pipeline lives here so each sensor rig can carry its
/// own calibration without code changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Low-pass smoothing factor, in [0, 1). Higher is smoother.
    pub low_pass_alpha: f64,

    /// Conditioned acceleration below this (m/s²) is treated as 0
    pub deadband: f64,

    /// Per-step velocity decay, in (0, 1)
    pub damp: f64,

    /// Acceleration magnitude (m/s²) counted as stillness
    pub still_epsilon: f64,

    /// Quiet time (ms) before velocity is zeroed
    pub still_ms: f64,

    /// Reported speed floor (m/s)
    pub min_speed: f64,

    /// Largest accepted gap between samples (s)
    pub max_gap_seconds: f64,

    /// Calibration from integrated speed to meters
    pub distance_scale: f64,

    /// Sampling interval requested from the sensor (ms)
    pub sample_interval_ms: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        let conditioner = ConditionerConfig::default();
        let integrator = IntegratorConfig::default();
        Self {
            low_pass_alpha: conditioner.low_pass_alpha,
            deadband: conditioner.deadband,
            damp: integrator.damp,
            still_epsilon: integrator.still_epsilon,
            still_ms: integrator.still_ms,
            min_speed: integrator.min_speed,
            max_gap_seconds: integrator.max_gap_seconds,
            distance_scale: DEFAULT_DISTANCE_SCALE,
            sample_interval_ms: 50,
        }
    }
}

impl TrackerConfig {
    pub fn conditioner(&self) -> ConditionerConfig {
        ConditionerConfig {
            low_pass_alpha: self.low_pass_alpha,
            deadband: self.deadband,
        }
    }

    pub fn integrator(&self) -> IntegratorConfig {
        IntegratorConfig {
            damp: self.damp,
            still_epsilon: self.still_epsilon,
            still_ms: self.still_ms,
            min_speed: self.min_speed,
            max_gap_seconds: self.max_gap_seconds,
        }
    }

    /// Check that every option is inside its usable range
    pub fn validate(&self) -> Result<()> {
        let invalid = |name: &str, value: f64, expected: &str| -> Result<()> {
            Err(TrackerError::Configuration(format!(
                "tracker.{} = {} (expected {})",
                name, value, expected
            )))
        };

        if !(0.0..1.0).contains(&self.low_pass_alpha) {
            return invalid("low_pass_alpha", self.low_pass_alpha, "0 <= value < 1");
        }
        if !(self.damp > 0.0 && self.damp < 1.0) {
            return invalid("damp", self.damp, "0 < value < 1");
        }
        for (name, value) in [
            ("deadband", self.deadband),
            ("still_epsilon", self.still_epsilon),
            ("min_speed", self.min_speed),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return invalid(name, value, "a finite value >= 0");
            }
        }
        for (name, value) in [
            ("still_ms", self.still_ms),
            ("max_gap_seconds", self.max_gap_seconds),
            ("distance_scale", self.distance_scale),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return invalid(name, value, "a finite value > 0");
            }
        }
        if self.sample_interval_ms == 0 {
            return invalid("sample_interval_ms", 0.0, "value > 0");
        }
        Ok(())
    }
}

/// Why a sample was not integrated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Timestamp did not advance past the previous sample
    NonPositiveStep,
    /// Timestamp jumped further than `max_gap_seconds`
    GapExceeded,
}

/// Values derived from one integrated sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutput {
    pub dt_seconds: f64,
    /// Conditioned horizontal acceleration
    pub ax: f64,
    pub ay: f64,
    /// `hypot(ax', ay', az)` with the raw vertical axis
    pub accel_magnitude: f64,
    /// Reported speed after the floor
    pub speed: f64,
    pub distance_meters: f64,
}

/// Result of feeding one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// First sample of a run; only sets the time reference
    Anchored,
    /// Sample rejected by the time gate; the reference moved to it
    Dropped(DropReason),
    Integrated(StepOutput),
}

/// Counters for field diagnosis of the sample stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    pub samples_seen: u64,
    pub samples_integrated: u64,
    pub anchors: u64,
    pub dropped_non_positive: u64,
    pub dropped_gap: u64,
}

impl PipelineDiagnostics {
    pub fn dropped(&self) -> u64 {
        self.dropped_non_positive + self.dropped_gap
    }
}

/// Per-session estimation state
#[derive(Debug, Clone)]
pub struct MotionPipeline {
    config: TrackerConfig,
    conditioner: SignalConditioner,
    integrator: VelocityIntegrator,
    distance: DistanceAccumulator,
    last_timestamp_ms: Option<i64>,
    last_output: Option<StepOutput>,
    diagnostics: PipelineDiagnostics,
}

impl MotionPipeline {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            conditioner: SignalConditioner::new(config.conditioner()),
            integrator: VelocityIntegrator::new(config.integrator()),
            distance: DistanceAccumulator::new(),
            config,
            last_timestamp_ms: None,
            last_output: None,
            diagnostics: PipelineDiagnostics::default(),
        }
    }

    /// Feed one sample. Samples must arrive in non-decreasing timestamp order.
    pub fn step(&mut self, sample: &Sample) -> StepOutcome {
        self.diagnostics.samples_seen += 1;

        let (ax, ay) = self.conditioner.condition(&sample.acceleration);

        let previous = self.last_timestamp_ms.replace(sample.timestamp_ms);
        let Some(previous) = previous else {
            self.diagnostics.anchors += 1;
            return StepOutcome::Anchored;
        };

        // saturates on absurd jumps so the gate drops them
        let dt_seconds = sample.timestamp_ms.saturating_sub(previous) as f64 / 1000.0;
        let Some(speed) = self.integrator.integrate(ax, ay, dt_seconds) else {
            let reason = if dt_seconds <= 0.0 {
                self.diagnostics.dropped_non_positive += 1;
                DropReason::NonPositiveStep
            } else {
                self.diagnostics.dropped_gap += 1;
                DropReason::GapExceeded
            };
            debug!(
                timestamp_ms = sample.timestamp_ms,
                dt_seconds,
                ?reason,
                dropped = self.diagnostics.dropped(),
                "Sample dropped by time gate"
            );
            return StepOutcome::Dropped(reason);
        };

        let distance_meters =
            self.distance
                .accumulate(speed, dt_seconds, self.config.distance_scale);
        self.diagnostics.samples_integrated += 1;

        let output = StepOutput {
            dt_seconds,
            ax,
            ay,
            accel_magnitude: (ax * ax + ay * ay + sample.acceleration.z.powi(2)).sqrt(),
            speed,
            distance_meters,
        };
        self.last_output = Some(output);
        StepOutcome::Integrated(output)
    }

    /// Forget the time reference so the next sample anchors a new run.
    ///
    /// Estimator state is kept; used when the stream resumes after a pause.
    pub fn reanchor(&mut self) {
        self.last_timestamp_ms = None;
    }

    pub fn distance_meters(&self) -> f64 {
        self.distance.meters()
    }

    /// Underlying (unfloored) velocity
    pub fn velocity(&self) -> (f64, f64) {
        self.integrator.velocity()
    }

    pub fn speed(&self) -> f64 {
        self.integrator.reported_speed()
    }

    pub fn last_output(&self) -> Option<&StepOutput> {
        self.last_output.as_ref()
    }

    pub fn diagnostics(&self) -> &PipelineDiagnostics {
        &self.diagnostics
    }

    pub fn zero_velocity_updates(&self) -> u64 {
        self.integrator.zero_velocity_updates()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(pipeline: &mut MotionPipeline, start_ms: i64, step_ms: i64, count: usize, ax: f64) {
        for i in 0..count {
            pipeline.step(&Sample::new(start_ms + i as i64 * step_ms, ax, 0.0, 0.0));
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(TrackerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_out_of_range_values() {
        let config = TrackerConfig {
            damp: 1.0,
            ..TrackerConfig::default()
        };
        assert!(matches!(config.validate(), Err(TrackerError::Configuration(_))));

        let config = TrackerConfig {
            low_pass_alpha: -0.1,
            ..TrackerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TrackerConfig {
            distance_scale: 0.0,
            ..TrackerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_first_sample_anchors() {
        let mut pipeline = MotionPipeline::new(TrackerConfig::default());
        let outcome = pipeline.step(&Sample::new(1000, 5.0, 0.0, 0.0));
        assert_eq!(outcome, StepOutcome::Anchored);
        assert_eq!(pipeline.velocity(), (0.0, 0.0));
        assert_eq!(pipeline.diagnostics().anchors, 1);
    }

    #[test]
    fn test_gap_is_dropped_and_reanchored() {
        let mut pipeline = MotionPipeline::new(TrackerConfig::default());
        feed(&mut pipeline, 0, 50, 10, 2.0);
        let velocity = pipeline.velocity();
        let distance = pipeline.distance_meters();

        let outcome = pipeline.step(&Sample::new(450 + 500, 2.0, 0.0, 0.0));
        assert_eq!(outcome, StepOutcome::Dropped(DropReason::GapExceeded));
        assert_eq!(pipeline.velocity(), velocity);
        assert_eq!(pipeline.distance_meters(), distance);

        // reference moved to the dropped sample, so the next regular step integrates
        let outcome = pipeline.step(&Sample::new(1000, 2.0, 0.0, 0.0));
        assert!(matches!(outcome, StepOutcome::Integrated(out) if (out.dt_seconds - 0.05).abs() < 1e-12));
    }

    #[test]
    fn test_duplicate_timestamp_is_counted() {
        let mut pipeline = MotionPipeline::new(TrackerConfig::default());
        pipeline.step(&Sample::new(100, 1.0, 0.0, 0.0));
        let outcome = pipeline.step(&Sample::new(100, 1.0, 0.0, 0.0));
        assert_eq!(outcome, StepOutcome::Dropped(DropReason::NonPositiveStep));
        pipeline.step(&Sample::new(90, 1.0, 0.0, 0.0));
        assert_eq!(pipeline.diagnostics().dropped_non_positive, 2);
        assert_eq!(pipeline.diagnostics().dropped(), 2);
    }

    #[test]
    fn test_extreme_timestamps_are_dropped() {
        let mut pipeline = MotionPipeline::new(TrackerConfig::default());
        pipeline.step(&Sample::new(i64::MIN, 1.0, 0.0, 0.0));
        let outcome = pipeline.step(&Sample::new(i64::MAX, 1.0, 0.0, 0.0));
        assert_eq!(outcome, StepOutcome::Dropped(DropReason::GapExceeded));

        let outcome = pipeline.step(&Sample::new(i64::MIN, 1.0, 0.0, 0.0));
        assert_eq!(outcome, StepOutcome::Dropped(DropReason::NonPositiveStep));
        assert_eq!(pipeline.velocity(), (0.0, 0.0));
        assert_eq!(pipeline.distance_meters(), 0.0);
    }

    #[test]
    fn test_stillness_converges_to_zero() {
        let mut pipeline = MotionPipeline::new(TrackerConfig::default());
        feed(&mut pipeline, 0, 50, 30, 2.0);
        assert!(pipeline.speed() > 0.0);

        // low-pass needs a few samples to decay under the deadband before the quiet window counts
        feed(&mut pipeline, 1500, 50, 60, 0.0);
        assert_eq!(pipeline.velocity(), (0.0, 0.0));

        let distance = pipeline.distance_meters();
        feed(&mut pipeline, 4500, 50, 20, 0.0);
        assert_eq!(pipeline.distance_meters(), distance);
    }

    #[test]
    fn test_accel_magnitude_uses_raw_vertical_axis() {
        let mut pipeline = MotionPipeline::new(TrackerConfig::default());
        pipeline.step(&Sample::new(0, 3.0, 4.0, 12.0));
        let StepOutcome::Integrated(out) = pipeline.step(&Sample::new(50, 3.0, 4.0, 12.0)) else {
            panic!("expected integration");
        };
        assert!((out.accel_magnitude - 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_reanchor_skips_pause_gap() {
        let mut pipeline = MotionPipeline::new(TrackerConfig::default());
        feed(&mut pipeline, 0, 50, 5, 1.0);
        pipeline.reanchor();
        assert_eq!(pipeline.step(&Sample::new(60_000, 1.0, 0.0, 0.0)), StepOutcome::Anchored);
        assert_eq!(pipeline.diagnostics().dropped(), 0);
    }
}
