//! Wire codec for transport messages
//!
//! UTF-8 JSON object:
//! `{"sensor_id", "timestamp", "value", "metadata": {"location": {"lat", "lng"}, "unit", "type", "description"}}`

use bytes::Bytes;

use crate::{DecodeError, Reading};

/// Serialize a reading into a transport message
pub fn encode(reading: &Reading) -> Result<Bytes, serde_json::Error> {
    serde_json::to_vec(reading).map(Bytes::from)
}

/// Decode and validate a transport message
///
/// # Errors
/// Non-UTF-8 payloads, malformed JSON, missing or mistyped fields and
/// non-finite values. The error keeps the raw payload for logging.
pub fn decode(payload: &[u8]) -> Result<Reading, DecodeError> {
    if std::str::from_utf8(payload).is_err() {
        return Err(DecodeError::new("payload is not valid UTF-8", payload, None));
    }

    let reading: Reading = serde_json::from_slice(payload)
        .map_err(|e| DecodeError::new(e.to_string(), payload, Some(e)))?;

    if !reading.value.is_finite() {
        return Err(DecodeError::new("value must be finite", payload, None));
    }

    Ok(reading)
}
