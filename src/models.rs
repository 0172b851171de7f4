use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Three-axis acceleration in m/s²
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Acceleration {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Acceleration {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Build from possibly missing axis readings; missing or non-finite axes become 0
    pub fn from_partial(x: Option<f64>, y: Option<f64>, z: Option<f64>) -> Self {
        Self {
            x: finite_or_zero(x),
            y: finite_or_zero(y),
            z: finite_or_zero(z),
        }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// A single timestamped accelerometer reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Milliseconds on the producer's clock
    pub timestamp_ms: i64,

    /// Acceleration on each axis
    pub acceleration: Acceleration,
}

impl Sample {
    pub fn new(timestamp_ms: i64, ax: f64, ay: f64, az: f64) -> Self {
        Self {
            timestamp_ms,
            acceleration: Acceleration::from_partial(Some(ax), Some(ay), Some(az)),
        }
    }

    pub fn from_acceleration(timestamp_ms: i64, acceleration: Acceleration) -> Self {
        Self {
            timestamp_ms,
            acceleration,
        }
    }
}

/// Which kind of producer delivers samples for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// On-device motion sensor
    MotionSensor,
    /// External BLE peripheral
    Peripheral,
    /// Recorded sample log
    Replay,
}

impl SourceKind {
    pub fn description(&self) -> &'static str {
        match self {
            SourceKind::MotionSensor => "motion sensor",
            SourceKind::Peripheral => "Bluetooth sensor",
            SourceKind::Replay => "recorded session",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::MotionSensor => write!(f, "motion_sensor"),
            SourceKind::Peripheral => write!(f, "peripheral"),
            SourceKind::Replay => write!(f, "replay"),
        }
    }
}

/// Split time per 500 meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pace {
    /// Seconds needed to cover 500 m at the session's average speed
    Split { seconds_per_500m: f64 },
    /// Not enough distance or time to derive a pace
    Unavailable,
}

impl Pace {
    pub fn seconds_per_500m(&self) -> Option<f64> {
        match self {
            Pace::Split { seconds_per_500m } => Some(*seconds_per_500m),
            Pace::Unavailable => None,
        }
    }
}

/// Live values read by the presenter on every display tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Whether the session clock is running
    pub running: bool,

    /// Elapsed session time excluding pauses
    pub elapsed_ms: u64,

    /// Cumulative estimated distance
    pub distance_meters: f64,

    /// Reported speed after the speed floor
    pub speed_mps: f64,

    /// Magnitude of the latest conditioned acceleration
    pub accel_magnitude: f64,

    /// Split per 500 m
    pub pace: Pace,

    /// Instantaneous power from the latest speed
    pub power_watts: f64,

    /// Average power over the session so far
    pub average_power_watts: Option<f64>,

    /// Samples discarded by the timestamp gate
    pub dropped_samples: u64,

    /// Recent acceleration magnitudes, oldest first
    pub accel_history: Vec<f64>,

    /// Recent instantaneous power values, oldest first
    pub power_history: Vec<f64>,
}

/// Completed workout handed off to storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    /// Unique session identifier
    pub session_id: Uuid,

    /// Owner of the workout
    pub user_id: String,

    /// Producer that fed the session
    pub source: SourceKind,

    /// Wall-clock session start
    pub started_at: DateTime<Utc>,

    /// Wall-clock session end
    pub ended_at: DateTime<Utc>,

    /// Active (unpaused) duration in milliseconds
    pub duration_ms: u64,

    /// Total distance in meters, rounded to 0.1 m
    pub total_distance_m: Decimal,

    /// Average power in watts, rounded to 0.1 W
    pub average_power_w: Option<Decimal>,

    /// Samples discarded by the timestamp gate
    pub dropped_samples: u64,
}

impl WorkoutRecord {
    pub fn duration_seconds(&self) -> u64 {
        self.duration_ms / 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_acceleration_defaults_to_zero() {
        let accel = Acceleration::from_partial(Some(1.5), None, Some(f64::NAN));
        assert_eq!(accel, Acceleration::new(1.5, 0.0, 0.0));
    }

    #[test]
    fn test_sample_sanitizes_non_finite_axes() {
        let sample = Sample::new(10, f64::INFINITY, 0.3, -0.2);
        assert_eq!(sample.acceleration.x, 0.0);
        assert_eq!(sample.acceleration.y, 0.3);
    }

    #[test]
    fn test_pace_serialization_is_tagged() {
        let json = serde_json::to_string(&Pace::Unavailable).unwrap();
        assert_eq!(json, r#"{"kind":"unavailable"}"#);
        assert_eq!(Pace::Split { seconds_per_500m: 125.0 }.seconds_per_500m(), Some(125.0));
    }
}
