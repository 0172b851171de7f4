use std::collections::VecDeque;
use std::io::Read;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};

use serde::Deserialize;
use tracing::debug;

use super::SampleSource;
use crate::error::{Result, SourceError, TrackerError};
use crate::models::{Acceleration, Sample, SourceKind};

/// One row of a recorded sample log: `timestamp_ms,ax,ay,az`
#[derive(Debug, Deserialize)]
struct ReplayRow {
    timestamp_ms: i64,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    ax: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    ay: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    az: Option<f64>,
}

/// Plays back a recorded session as if it came from a live sensor.
///
/// Samples are pushed into the subscription one at a time with
/// [`ReplaySource::emit_next`], so the caller controls the pace.
#[derive(Debug, Default)]
pub struct ReplaySource {
    pending: VecDeque<Sample>,
    sender: Option<Sender<Sample>>,
}

impl ReplaySource {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self {
            pending: samples.into(),
            sender: None,
        }
    }

    /// Load a CSV recording with a `timestamp_ms,ax,ay,az` header.
    ///
    /// Empty or unparsable axis cells become 0.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut samples = Vec::new();
        for (index, row) in csv_reader.deserialize::<ReplayRow>().enumerate() {
            let row = row.map_err(|e| {
                TrackerError::Serialization(format!("recording row {}: {}", index + 1, e))
            })?;
            samples.push(Sample::from_acceleration(
                row.timestamp_ms,
                Acceleration::from_partial(row.ax, row.ay, row.az),
            ));
        }
        Ok(Self::new(samples))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let source = Self::from_reader(file)?;
        debug!(
            path = %path.as_ref().display(),
            samples = source.remaining(),
            "Loaded recording"
        );
        Ok(source)
    }

    /// Deliver the next recorded sample to the subscriber
    pub fn emit_next(&mut self) -> Option<Sample> {
        let sender = self.sender.as_ref()?;
        let sample = self.pending.pop_front()?;
        let _ = sender.send(sample);
        Some(sample)
    }

    /// Timestamp of the next sample without delivering it
    pub fn peek_timestamp(&self) -> Option<i64> {
        self.pending.front().map(|sample| sample.timestamp_ms)
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl SampleSource for ReplaySource {
    fn kind(&self) -> SourceKind {
        SourceKind::Replay
    }

    fn request_access(&mut self) -> std::result::Result<(), SourceError> {
        Ok(())
    }

    fn subscribe(&mut self, _interval_ms: u32) -> std::result::Result<Receiver<Sample>, SourceError> {
        let (sender, receiver) = mpsc::channel();
        self.sender = Some(sender);
        Ok(receiver)
    }

    fn unsubscribe(&mut self) {
        self.sender = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORDING: &str = "\
timestamp_ms,ax,ay,az
0,0.10,0.00,9.81
50,0.35,,9.79
100,oops,0.05,9.80
";

    #[test]
    fn test_parse_recording() {
        let mut source = ReplaySource::from_reader(RECORDING.as_bytes()).unwrap();
        assert_eq!(source.remaining(), 3);
        assert_eq!(source.peek_timestamp(), Some(0));

        // nothing is delivered before subscribing
        assert_eq!(source.emit_next(), None);

        let receiver = source.subscribe(50).unwrap();
        while source.emit_next().is_some() {}

        let samples: Vec<Sample> = receiver.try_iter().collect();
        assert_eq!(samples[1], Sample::new(50, 0.35, 0.0, 9.79));
        assert_eq!(samples[2], Sample::new(100, 0.0, 0.05, 9.80));
    }

    #[test]
    fn test_bad_timestamp_is_an_error() {
        let err = ReplaySource::from_reader("timestamp_ms,ax,ay,az\nsoon,1,2,3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, TrackerError::Serialization(msg) if msg.contains("row 1")));
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut source = ReplaySource::new(vec![Sample::new(0, 1.0, 0.0, 0.0)]);
        let _receiver = source.subscribe(50).unwrap();
        source.unsubscribe();
        assert_eq!(source.emit_next(), None);
        assert_eq!(source.remaining(), 1);
    }
}
