use std::sync::mpsc::{self, Receiver};

use tracing::{debug, info};

use super::SampleSource;
use crate::clock::TimeSource;
use crate::error::SourceError;
use crate::models::{Acceleration, Sample, SourceKind};

/// Raw reading as reported by an on-device motion sensor.
///
/// Platforms report axes as optional fields; anything missing becomes 0.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionReading {
    pub timestamp_ms: Option<i64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

/// Callback receiving readings from the sensor driver
pub type ReadingHandler = Box<dyn FnMut(MotionReading) + Send>;

/// Platform motion sensor driver
pub trait MotionSensorDriver {
    /// Ask for sensor access; `Ok(false)` means the user declined
    fn request_permission(&mut self) -> Result<bool, SourceError>;

    fn set_update_interval(&mut self, interval_ms: u32);

    /// Begin pushing readings to `on_reading`
    fn start(&mut self, on_reading: ReadingHandler) -> Result<(), SourceError>;

    fn stop(&mut self);
}

/// Sample source backed by the on-device accelerometer
pub struct MotionSensorSource<D, T> {
    driver: D,
    time: T,
    granted: bool,
    subscribed: bool,
}

impl<D, T> MotionSensorSource<D, T>
where
    D: MotionSensorDriver,
    T: TimeSource + Clone + Send + 'static,
{
    pub fn new(driver: D, time: T) -> Self {
        Self {
            driver,
            time,
            granted: false,
            subscribed: false,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

impl<D, T> SampleSource for MotionSensorSource<D, T>
where
    D: MotionSensorDriver,
    T: TimeSource + Clone + Send + 'static,
{
    fn kind(&self) -> SourceKind {
        SourceKind::MotionSensor
    }

    fn request_access(&mut self) -> Result<(), SourceError> {
        if self.granted {
            return Ok(());
        }
        if !self.driver.request_permission()? {
            return Err(SourceError::PermissionDenied {
                source_kind: SourceKind::MotionSensor,
            });
        }
        self.granted = true;
        info!("Motion sensor access granted");
        Ok(())
    }

    fn subscribe(&mut self, interval_ms: u32) -> Result<Receiver<Sample>, SourceError> {
        if !self.granted {
            return Err(SourceError::NotConnected);
        }
        if self.subscribed {
            self.unsubscribe();
        }

        let (sender, receiver) = mpsc::channel();
        let time = self.time.clone();

        self.driver.set_update_interval(interval_ms);
        self.driver.start(Box::new(move |reading: MotionReading| {
            let timestamp_ms = reading.timestamp_ms.unwrap_or_else(|| time.now_ms());
            let acceleration = Acceleration::from_partial(reading.x, reading.y, reading.z);
            // receiver gone means the session was torn down
            let _ = sender.send(Sample::from_acceleration(timestamp_ms, acceleration));
        }))?;
        self.subscribed = true;

        debug!(interval_ms, "Subscribed to motion sensor");
        Ok(receiver)
    }

    fn unsubscribe(&mut self) {
        if self.subscribed {
            self.driver.stop();
            self.subscribed = false;
            debug!("Motion sensor subscription removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualTimeSource;

    #[derive(Default)]
    struct FakeDriver {
        grant: bool,
        interval_ms: Option<u32>,
        handler: Option<ReadingHandler>,
        stops: usize,
    }

    impl MotionSensorDriver for FakeDriver {
        fn request_permission(&mut self) -> Result<bool, SourceError> {
            Ok(self.grant)
        }

        fn set_update_interval(&mut self, interval_ms: u32) {
            self.interval_ms = Some(interval_ms);
        }

        fn start(&mut self, on_reading: ReadingHandler) -> Result<(), SourceError> {
            self.handler = Some(on_reading);
            Ok(())
        }

        fn stop(&mut self) {
            self.handler = None;
            self.stops += 1;
        }
    }

    impl FakeDriver {
        fn emit(&mut self, reading: MotionReading) {
            if let Some(handler) = self.handler.as_mut() {
                handler(reading);
            }
        }
    }

    #[test]
    fn test_permission_denied() {
        let mut source = MotionSensorSource::new(FakeDriver::default(), ManualTimeSource::new(0));
        let err = source.request_access().unwrap_err();
        assert!(matches!(err, SourceError::PermissionDenied { source_kind: SourceKind::MotionSensor }));
        assert!(matches!(source.subscribe(50), Err(SourceError::NotConnected)));
    }

    #[test]
    fn test_readings_become_samples() {
        let time = ManualTimeSource::new(5_000);
        let driver = FakeDriver {
            grant: true,
            ..FakeDriver::default()
        };
        let mut source = MotionSensorSource::new(driver, time.clone());
        source.request_access().unwrap();
        let receiver = source.subscribe(50).unwrap();
        assert_eq!(source.driver().interval_ms, Some(50));

        source.driver_mut().emit(MotionReading {
            timestamp_ms: Some(1_000),
            x: Some(0.4),
            y: None,
            z: Some(9.8),
        });
        source.driver_mut().emit(MotionReading {
            timestamp_ms: None,
            x: Some(f64::NAN),
            y: Some(0.2),
            z: None,
        });

        let samples: Vec<Sample> = receiver.try_iter().collect();
        assert_eq!(samples[0], Sample::new(1_000, 0.4, 0.0, 9.8));
        assert_eq!(samples[1], Sample::new(5_000, 0.0, 0.2, 0.0));

        source.unsubscribe();
        source.unsubscribe();
        assert_eq!(source.driver().stops, 1);
    }
}
