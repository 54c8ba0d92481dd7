//! Test transports

use std::future::pending;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use contracts::{codec, Reading, Transport, TransportError};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Published(Reading),
    Failed(i64),
    Closed,
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

/// Records every call; optionally fails or stalls publishes for one sensor
pub struct RecordingTransport {
    events: EventLog,
    fail_sensor: Option<i64>,
    stall_sensor: Option<i64>,
}

impl RecordingTransport {
    pub fn new() -> (Self, EventLog) {
        Self::build(None, None)
    }

    pub fn failing_for(sensor_id: i64) -> (Self, EventLog) {
        Self::build(Some(sensor_id), None)
    }

    pub fn stalling_for(sensor_id: i64) -> (Self, EventLog) {
        Self::build(None, Some(sensor_id))
    }

    fn build(fail_sensor: Option<i64>, stall_sensor: Option<i64>) -> (Self, EventLog) {
        let events = EventLog::default();
        let transport = Self {
            events: Arc::clone(&events),
            fail_sensor,
            stall_sensor,
        };
        (transport, events)
    }

    pub fn published(events: &EventLog) -> Vec<Reading> {
        events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Event::Published(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn publish(&self, message: Bytes) -> Result<(), TransportError> {
        let reading = codec::decode(&message)
            .map_err(|e| TransportError::publish("recording", e.to_string()))?;

        if self.stall_sensor == Some(reading.sensor_id) {
            pending::<()>().await;
        }

        let mut events = self.events.lock().unwrap();
        assert!(!events.contains(&Event::Closed), "publish after close");
        if self.fail_sensor == Some(reading.sensor_id) {
            events.push(Event::Failed(reading.sensor_id));
            return Err(TransportError::publish("recording", "injected failure"));
        }
        events.push(Event::Published(reading));
        Ok(())
    }

    async fn close(self) -> Result<(), TransportError> {
        self.events.lock().unwrap().push(Event::Closed);
        Ok(())
    }
}
