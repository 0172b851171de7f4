//! Session timing.
//!
//! `SessionClock` is a pure state machine over wall-clock readings supplied
//! by the caller; `TimeSource` is where those readings come from.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Millisecond wall clock
pub trait TimeSource {
    fn now_ms(&self) -> i64;

    fn now_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.now_ms()).unwrap_or_default()
    }
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Manually advanced clock, shared between clones.
///
/// Used for replaying recordings and in tests.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    now: Arc<AtomicI64>,
}

impl ManualTimeSource {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Clock lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Running,
    Paused,
}

/// Elapsed-time tracker with pause/resume.
///
/// Reported elapsed time is `accumulated + (now - run_start)` while running
/// and `accumulated` otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionClock {
    accumulated_ms: i64,
    run_start_ms: Option<i64>,
    state: ClockState,
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            accumulated_ms: 0,
            run_start_ms: None,
            state: ClockState::Stopped,
        }
    }

    /// Start or resume; no-op while already running
    pub fn start(&mut self, now_ms: i64) {
        if self.is_running() {
            return;
        }
        self.run_start_ms = Some(now_ms);
        self.state = ClockState::Running;
    }

    /// Fold the current run into the accumulated total; no-op unless running
    pub fn pause(&mut self, now_ms: i64) {
        if let Some(run_start) = self.run_start_ms.take() {
            self.accumulated_ms = self
                .accumulated_ms
                .saturating_add(now_ms.saturating_sub(run_start).max(0));
            self.state = ClockState::Paused;
        }
    }

    pub fn elapsed_ms(&self, now_ms: i64) -> u64 {
        let running = self
            .run_start_ms
            .map(|run_start| now_ms.saturating_sub(run_start).max(0))
            .unwrap_or(0);
        self.accumulated_ms.saturating_add(running).max(0) as u64
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_resume_excludes_gap() {
        let mut clock = SessionClock::new();
        clock.start(0);
        clock.pause(1000);
        clock.start(1500);
        assert_eq!(clock.elapsed_ms(2500), 2000);
    }

    #[test]
    fn test_elapsed_is_frozen_while_paused() {
        let mut clock = SessionClock::new();
        clock.start(10_000);
        clock.pause(13_000);
        assert_eq!(clock.state(), ClockState::Paused);
        assert_eq!(clock.elapsed_ms(13_000), 3000);
        assert_eq!(clock.elapsed_ms(99_000), 3000);
    }

    #[test]
    fn test_repeated_start_and_pause_are_noops() {
        let mut clock = SessionClock::new();
        clock.pause(500);
        assert_eq!(clock.state(), ClockState::Stopped);

        clock.start(1000);
        clock.start(1800);
        assert_eq!(clock.elapsed_ms(2000), 1000);

        clock.pause(2000);
        clock.pause(2600);
        assert_eq!(clock.elapsed_ms(3000), 1000);
    }

    #[test]
    fn test_extreme_readings_saturate() {
        let mut clock = SessionClock::new();
        clock.start(i64::MIN);
        assert_eq!(clock.elapsed_ms(i64::MAX), i64::MAX as u64);
        clock.pause(i64::MAX);
        clock.start(i64::MIN);
        assert_eq!(clock.elapsed_ms(i64::MAX), i64::MAX as u64);

        let mut backwards = SessionClock::new();
        backwards.start(i64::MAX);
        assert_eq!(backwards.elapsed_ms(i64::MIN), 0);
    }

    #[test]
    fn test_stopped_clock_reads_zero() {
        let clock = SessionClock::new();
        assert_eq!(clock.elapsed_ms(123_456), 0);
    }

    #[test]
    fn test_manual_time_source_is_shared() {
        let time = ManualTimeSource::new(100);
        let other = time.clone();
        other.advance(50);
        assert_eq!(time.now_ms(), 150);
        time.set(1_700_000_000_000);
        assert_eq!(other.now_utc().timestamp_millis(), 1_700_000_000_000);
    }
}
