//! Rowing distance estimation from raw accelerometer samples.
//!
//! Samples from the device's motion sensor or an external BLE peripheral run
//! through a per-sample pipeline (filter, deadband, damped integration,
//! stillness resets) that produces speed, distance, pace and power for a
//! pausable session.

pub mod clock;
pub mod conditioner;
pub mod config;
pub mod distance;
pub mod error;
pub mod integrator;
pub mod logging;
pub mod models;
pub mod pace;
pub mod pipeline;
pub mod power;
pub mod progress;
pub mod series;
pub mod session;
pub mod source;
pub mod storage;

// Re-export commonly used types for convenience
pub use models::*;
pub use clock::{ClockState, ManualTimeSource, SessionClock, SystemTimeSource, TimeSource};
pub use config::AppConfig;
pub use error::{Result, TrackerError};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use pipeline::{MotionPipeline, PipelineDiagnostics, StepOutcome, TrackerConfig};
pub use session::{SessionController, SessionOptions};
pub use source::{MotionSensorSource, PeripheralSource, ReplaySource, SampleSource};
pub use storage::{JsonLinesStore, MemoryStore, WorkoutStore};
