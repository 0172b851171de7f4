//! Sample producers.
//!
//! A `SampleSource` is the explicit connection handle a session owns: it
//! performs the access handshake and hands back a channel that yields samples
//! in arrival order. Hardware drivers stay behind the `MotionSensorDriver`
//! and `PeripheralLink` traits so the estimator can be exercised without any
//! sensor attached.

use std::sync::mpsc::Receiver;

use crate::error::SourceError;
use crate::models::{Sample, SourceKind};

pub mod motion;
pub mod peripheral;
pub mod replay;
pub mod wire;

pub use motion::{MotionReading, MotionSensorDriver, MotionSensorSource, ReadingHandler};
pub use peripheral::{NotificationHandler, PeripheralLink, PeripheralSettings, PeripheralSource};
pub use replay::ReplaySource;

/// Subscription-style producer of accelerometer samples
pub trait SampleSource {
    /// Which kind of producer this is
    fn kind(&self) -> SourceKind;

    /// Obtain access to the sensor (permission grant or connect + discover)
    fn request_access(&mut self) -> Result<(), SourceError>;

    /// Start delivering samples at roughly `interval_ms`
    fn subscribe(&mut self, interval_ms: u32) -> Result<Receiver<Sample>, SourceError>;

    /// Stop delivery and detach from the sensor
    fn unsubscribe(&mut self);
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn kind(&self) -> SourceKind {
        (**self).kind()
    }

    fn request_access(&mut self) -> Result<(), SourceError> {
        (**self).request_access()
    }

    fn subscribe(&mut self, interval_ms: u32) -> Result<Receiver<Sample>, SourceError> {
        (**self).subscribe(interval_ms)
    }

    fn unsubscribe(&mut self) {
        (**self).unsubscribe()
    }
}
