//! Tracking session controller.
//!
//! Owns the injected sample source and time source, and for the active
//! session the pipeline, clock and chart series. Everything runs on the
//! caller's thread: samples queued by the source are drained in arrival
//! order by `pump`, typically from the periodic display tick.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use std::sync::mpsc::Receiver;
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::{ClockState, SessionClock, TimeSource};
use crate::error::{Result, SessionError};
use crate::models::{MetricsSnapshot, Sample, SourceKind, WorkoutRecord};
use crate::pace::split_per_500m;
use crate::pipeline::{MotionPipeline, PipelineDiagnostics, StepOutcome, TrackerConfig};
use crate::power::{average_power, power_from_speed};
use crate::series::RollingSeries;
use crate::source::SampleSource;
use crate::storage::WorkoutStore;

/// Session-level options
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub tracker: TrackerConfig,

    /// Number of recent values kept for each chart
    pub series_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            series_capacity: 64,
        }
    }
}

/// State that exists only while a session is active
struct ActiveSession {
    id: Uuid,
    user_id: String,
    started_at: DateTime<Utc>,
    stream: Receiver<Sample>,
    pipeline: MotionPipeline,
    clock: SessionClock,
    accel_series: RollingSeries<f64>,
    power_series: RollingSeries<f64>,
    accel_magnitude: f64,
}

/// Drives one tracking session at a time
pub struct SessionController<S, T> {
    source: S,
    time: T,
    options: SessionOptions,
    active: Option<ActiveSession>,
}

impl<S: SampleSource, T: TimeSource> SessionController<S, T> {
    pub fn new(source: S, time: T, options: SessionOptions) -> Self {
        Self {
            source,
            time,
            options,
            active: None,
        }
    }

    /// Acquire the source, subscribe, and start the clock.
    ///
    /// Fails if a session is already active; the first one must be stopped.
    pub fn start_session(&mut self, user_id: &str) -> Result<Uuid> {
        if let Some(active) = &self.active {
            return Err(SessionError::AlreadyActive {
                session_id: active.id,
            }
            .into());
        }

        self.source.request_access()?;
        let stream = self
            .source
            .subscribe(self.options.tracker.sample_interval_ms)?;

        let now = self.time.now_ms();
        let mut clock = SessionClock::new();
        clock.start(now);

        let capacity = self.options.series_capacity;
        let session = ActiveSession {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            started_at: self.time.now_utc(),
            stream,
            pipeline: MotionPipeline::new(self.options.tracker),
            clock,
            accel_series: RollingSeries::filled(capacity, 0.0),
            power_series: RollingSeries::filled(capacity, 0.0),
            accel_magnitude: 0.0,
        };
        let id = session.id;

        info!(
            session_id = %id,
            user_id,
            source = %self.source.kind(),
            "Session started"
        );
        self.active = Some(session);
        Ok(id)
    }

    pub fn pause(&mut self) -> Result<()> {
        let now = self.time.now_ms();
        let session = self.active.as_mut().ok_or(SessionError::NotActive)?;
        if session.clock.is_running() {
            // integrate what arrived before the pause
            Self::drain(session);
            session.clock.pause(now);
            info!(session_id = %session.id, "Session paused");
        }
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        let now = self.time.now_ms();
        let session = self.active.as_mut().ok_or(SessionError::NotActive)?;
        if !session.clock.is_running() {
            // discard whatever queued up while paused
            let discarded = session.stream.try_iter().count();
            session.pipeline.reanchor();
            session.clock.start(now);
            info!(session_id = %session.id, discarded, "Session resumed");
        }
        Ok(())
    }

    /// Pause when running, resume when paused
    pub fn toggle(&mut self) -> Result<()> {
        if self.is_running() {
            self.pause()
        } else {
            self.resume()
        }
    }

    /// Drain queued samples through the pipeline; returns how many were fed
    pub fn pump(&mut self) -> usize {
        match self.active.as_mut() {
            Some(session) if session.clock.is_running() => Self::drain(session),
            Some(session) => {
                session.stream.try_iter().count();
                0
            }
            None => 0,
        }
    }

    /// Feed one sample directly, bypassing the subscription
    pub fn ingest(&mut self, sample: &Sample) -> Option<StepOutcome> {
        let session = self.active.as_mut()?;
        if !session.clock.is_running() {
            return None;
        }
        Some(Self::feed(session, sample))
    }

    /// Periodic display refresh: pump, then snapshot
    pub fn tick(&mut self) -> Option<MetricsSnapshot> {
        self.pump();
        self.snapshot()
    }

    /// Current egress values for the presenter
    pub fn snapshot(&self) -> Option<MetricsSnapshot> {
        let session = self.active.as_ref()?;
        let elapsed_ms = session.clock.elapsed_ms(self.time.now_ms());
        let elapsed_seconds = elapsed_ms as f64 / 1000.0;
        let distance_meters = session.pipeline.distance_meters();
        let speed_mps = session.pipeline.speed();

        Some(MetricsSnapshot {
            running: session.clock.is_running(),
            elapsed_ms,
            distance_meters,
            speed_mps,
            accel_magnitude: session.accel_magnitude,
            pace: split_per_500m(elapsed_seconds, distance_meters),
            power_watts: power_from_speed(speed_mps),
            average_power_watts: average_power(elapsed_seconds, distance_meters),
            dropped_samples: session.pipeline.diagnostics().dropped(),
            accel_history: session.accel_series.to_vec(),
            power_history: session.power_series.to_vec(),
        })
    }

    /// Tear the session down and return its workout record.
    ///
    /// Detaches the stream, folds the clock, and discards all estimator
    /// state; the next session starts from scratch.
    pub fn stop_session(&mut self) -> Result<WorkoutRecord> {
        let now = self.time.now_ms();
        let mut session = self.active.take().ok_or(SessionError::NotActive)?;

        if session.clock.is_running() {
            Self::drain(&mut session);
        }
        self.source.unsubscribe();
        session.clock.pause(now);

        let duration_ms = session.clock.elapsed_ms(now);
        let distance = session.pipeline.distance_meters();
        let diagnostics = *session.pipeline.diagnostics();
        let record = WorkoutRecord {
            session_id: session.id,
            user_id: session.user_id.clone(),
            source: self.source.kind(),
            started_at: session.started_at,
            ended_at: self.time.now_utc(),
            duration_ms,
            total_distance_m: round_tenths(distance),
            average_power_w: average_power(duration_ms as f64 / 1000.0, distance)
                .map(round_tenths),
            dropped_samples: diagnostics.dropped(),
        };

        info!(
            session_id = %record.session_id,
            duration_ms,
            distance_m = %record.total_distance_m,
            samples = diagnostics.samples_seen,
            dropped = diagnostics.dropped(),
            zero_velocity_updates = session.pipeline.zero_velocity_updates(),
            "Session stopped"
        );
        Ok(record)
    }

    /// Stop the session and hand its record to `store`
    pub fn stop_and_store(&mut self, store: &mut dyn WorkoutStore) -> Result<WorkoutRecord> {
        let record = self.stop_session()?;
        store.save(&record)?;
        Ok(record)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .map(|session| session.clock.is_running())
            .unwrap_or(false)
    }

    pub fn clock_state(&self) -> ClockState {
        self.active
            .as_ref()
            .map(|session| session.clock.state())
            .unwrap_or(ClockState::Stopped)
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.active.as_ref().map(|session| session.id)
    }

    pub fn diagnostics(&self) -> Option<PipelineDiagnostics> {
        self.active
            .as_ref()
            .map(|session| *session.pipeline.diagnostics())
    }

    /// Underlying velocity of the active session
    pub fn velocity(&self) -> Option<(f64, f64)> {
        self.active.as_ref().map(|session| session.pipeline.velocity())
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source.kind()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn time(&self) -> &T {
        &self.time
    }

    fn drain(session: &mut ActiveSession) -> usize {
        let mut fed = 0;
        while let Ok(sample) = session.stream.try_recv() {
            Self::feed(session, &sample);
            fed += 1;
        }
        if fed > 0 {
            debug!(session_id = %session.id, fed, "Drained samples");
        }
        fed
    }

    fn feed(session: &mut ActiveSession, sample: &Sample) -> StepOutcome {
        let outcome = session.pipeline.step(sample);
        if let StepOutcome::Integrated(output) = outcome {
            session.accel_magnitude = output.accel_magnitude;
            session.accel_series.push(output.accel_magnitude);
            session.power_series.push(power_from_speed(output.speed));
        }
        outcome
    }
}

fn round_tenths(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .unwrap_or(Decimal::ZERO)
        .round_dp(1)
}
