use std::sync::mpsc::{self, Receiver};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::wire::decode_payload;
use super::SampleSource;
use crate::clock::TimeSource;
use crate::error::SourceError;
use crate::models::{Sample, SourceKind};

/// Which peripheral to connect to and which characteristic carries samples
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeripheralSettings {
    /// Advertised device name to look for while scanning
    pub device_name: String,

    /// Service exposing the acceleration characteristic
    pub service_uuid: String,

    /// Notifying characteristic with the base64 `"x,y,z"` payload
    pub characteristic_uuid: String,
}

impl Default for PeripheralSettings {
    fn default() -> Self {
        Self {
            device_name: "Nano33BLE".to_string(),
            service_uuid: "180F".to_string(),
            characteristic_uuid: "2A19".to_string(),
        }
    }
}

/// Callback receiving raw (base64) characteristic values
pub type NotificationHandler = Box<dyn FnMut(&str) + Send>;

/// BLE central operations used by the peripheral source.
///
/// One link is one explicit connection handle; nothing is shared globally.
pub trait PeripheralLink {
    /// Scan until a device advertising `device_name` is found, then stop scanning
    fn scan(&mut self, device_name: &str) -> Result<(), SourceError>;

    fn connect(&mut self) -> Result<(), SourceError>;

    /// Discover all services and characteristics, as `(service, characteristic)` pairs
    fn discover(&mut self) -> Result<Vec<(String, String)>, SourceError>;

    /// Subscribe to notifications of `characteristic` on `service`
    fn monitor(
        &mut self,
        service: &str,
        characteristic: &str,
        on_value: NotificationHandler,
    ) -> Result<(), SourceError>;

    /// Cancel notifications and drop the connection
    fn disconnect(&mut self);
}

/// Sample source backed by an external BLE peripheral.
///
/// Payloads carry no timestamp, so samples are stamped on arrival.
pub struct PeripheralSource<L, T> {
    link: L,
    time: T,
    settings: PeripheralSettings,
    discovered: Vec<(String, String)>,
    connected: bool,
}

impl<L, T> PeripheralSource<L, T>
where
    L: PeripheralLink,
    T: TimeSource + Clone + Send + 'static,
{
    pub fn new(link: L, time: T, settings: PeripheralSettings) -> Self {
        Self {
            link,
            time,
            settings,
            discovered: Vec::new(),
            connected: false,
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn settings(&self) -> &PeripheralSettings {
        &self.settings
    }

    /// UUIDs compare case-insensitively, as peripherals report either case
    fn exposes_sample_characteristic(&self) -> bool {
        self.discovered.iter().any(|(service, characteristic)| {
            service.eq_ignore_ascii_case(&self.settings.service_uuid)
                && characteristic.eq_ignore_ascii_case(&self.settings.characteristic_uuid)
        })
    }
}

impl<L, T> SampleSource for PeripheralSource<L, T>
where
    L: PeripheralLink,
    T: TimeSource + Clone + Send + 'static,
{
    fn kind(&self) -> SourceKind {
        SourceKind::Peripheral
    }

    fn request_access(&mut self) -> Result<(), SourceError> {
        if self.connected {
            return Ok(());
        }
        self.link.scan(&self.settings.device_name)?;
        self.link.connect()?;
        match self.link.discover() {
            Ok(discovered) => self.discovered = discovered,
            Err(e) => {
                self.link.disconnect();
                return Err(e);
            }
        }
        self.connected = true;
        info!(device = %self.settings.device_name, "Connected to peripheral");
        Ok(())
    }

    fn subscribe(&mut self, interval_ms: u32) -> Result<Receiver<Sample>, SourceError> {
        if !self.connected {
            return Err(SourceError::NotConnected);
        }
        if !self.exposes_sample_characteristic() {
            return Err(SourceError::CharacteristicUnavailable {
                service: self.settings.service_uuid.clone(),
                characteristic: self.settings.characteristic_uuid.clone(),
            });
        }

        let (sender, receiver) = mpsc::channel();
        let time = self.time.clone();

        self.link.monitor(
            &self.settings.service_uuid,
            &self.settings.characteristic_uuid,
            Box::new(move |value: &str| match decode_payload(value) {
                Ok(acceleration) => {
                    let _ = sender.send(Sample::from_acceleration(time.now_ms(), acceleration));
                }
                Err(e) => warn!(error = %e, "Dropping undecodable peripheral payload"),
            }),
        )?;

        // the peripheral notifies at its own firmware rate
        debug!(
            interval_ms,
            service = %self.settings.service_uuid,
            characteristic = %self.settings.characteristic_uuid,
            "Monitoring peripheral characteristic"
        );
        Ok(receiver)
    }

    fn unsubscribe(&mut self) {
        if self.connected {
            self.link.disconnect();
            self.connected = false;
            self.discovered.clear();
            debug!(device = %self.settings.device_name, "Peripheral disconnected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualTimeSource;
    use crate::models::Acceleration;
    use crate::source::wire::encode_payload;

    #[derive(Default)]
    struct FakeLink {
        advertised: Option<String>,
        characteristics: Vec<(String, String)>,
        monitored: Option<(String, String)>,
        handler: Option<NotificationHandler>,
        disconnects: usize,
    }

    impl PeripheralLink for FakeLink {
        fn scan(&mut self, device_name: &str) -> Result<(), SourceError> {
            match &self.advertised {
                Some(name) if name == device_name => Ok(()),
                _ => Err(SourceError::DeviceNotFound {
                    name: device_name.to_string(),
                }),
            }
        }

        fn connect(&mut self) -> Result<(), SourceError> {
            Ok(())
        }

        fn discover(&mut self) -> Result<Vec<(String, String)>, SourceError> {
            Ok(self.characteristics.clone())
        }

        fn monitor(
            &mut self,
            service: &str,
            characteristic: &str,
            on_value: NotificationHandler,
        ) -> Result<(), SourceError> {
            self.monitored = Some((service.to_string(), characteristic.to_string()));
            self.handler = Some(on_value);
            Ok(())
        }

        fn disconnect(&mut self) {
            self.handler = None;
            self.disconnects += 1;
        }
    }

    #[test]
    fn test_missing_device() {
        let mut source = PeripheralSource::new(
            FakeLink::default(),
            ManualTimeSource::new(0),
            PeripheralSettings::default(),
        );
        let err = source.request_access().unwrap_err();
        assert!(matches!(err, SourceError::DeviceNotFound { name } if name == "Nano33BLE"));
    }

    #[test]
    fn test_missing_characteristic() {
        let link = FakeLink {
            advertised: Some("Nano33BLE".to_string()),
            characteristics: vec![("180F".to_string(), "2A1A".to_string())],
            ..FakeLink::default()
        };
        let mut source = PeripheralSource::new(link, ManualTimeSource::new(0), PeripheralSettings::default());
        source.request_access().unwrap();

        let err = source.subscribe(50).unwrap_err();
        assert!(matches!(
            err,
            SourceError::CharacteristicUnavailable { service, characteristic }
                if service == "180F" && characteristic == "2A19"
        ));
        assert!(source.link().monitored.is_none());
    }

    #[test]
    fn test_notifications_are_decoded_and_stamped() {
        let time = ManualTimeSource::new(2_000);
        let link = FakeLink {
            advertised: Some("Nano33BLE".to_string()),
            characteristics: vec![("180f".to_string(), "2a19".to_string())],
            ..FakeLink::default()
        };
        let mut source = PeripheralSource::new(link, time.clone(), PeripheralSettings::default());
        source.request_access().unwrap();
        let receiver = source.subscribe(50).unwrap();
        assert_eq!(
            source.link().monitored,
            Some(("180F".to_string(), "2A19".to_string()))
        );

        let handler = source.link_mut().handler.as_mut().unwrap();
        handler(&encode_payload(&Acceleration::new(0.5, -0.25, 9.75)));
        time.advance(50);
        handler("%%%");
        time.advance(50);
        handler("MS4w");

        let samples: Vec<Sample> = receiver.try_iter().collect();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0], Sample::new(2_000, 0.5, -0.25, 9.75));
        assert_eq!(samples[1], Sample::new(2_100, 1.0, 0.0, 0.0));

        source.unsubscribe();
        assert_eq!(source.link().disconnects, 1);
    }
}
