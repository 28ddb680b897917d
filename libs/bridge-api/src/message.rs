use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;

/// A single ingress message. The bridge only looks at `topic` and the
/// payload length; `payload` is opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    /// Arrival time stamped by the bridge, never by the publisher.
    pub received_at: SystemTime,
    pub payload: Bytes,
}

impl Message {
    pub fn new(topic: impl Into<String>, received_at: SystemTime, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            received_at,
            payload: payload.into(),
        }
    }

    /// Stamp a freshly received message with the current wall-clock time.
    pub fn received_now(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self::new(topic, SystemTime::now(), payload)
    }

    /// Arrival time in whole unix seconds (the index precision).
    pub fn unix_time(&self) -> i64 {
        unix_seconds(self.received_at)
    }
}

/// Seconds since the unix epoch; times before the epoch come out negative.
pub fn unix_seconds(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn unix_time_truncates_to_seconds() {
        let at = UNIX_EPOCH + Duration::from_millis(1_700_000_000_999);
        let msg = Message::new("sensors/a", at, &b"AA"[..]);
        assert_eq!(msg.unix_time(), 1_700_000_000);
    }

    #[test]
    fn before_epoch_is_negative() {
        let at = UNIX_EPOCH - Duration::from_secs(5);
        assert_eq!(unix_seconds(at), -5);
    }
}
