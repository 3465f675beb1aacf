//! The event envelope: the unit handed to the transport.
//!
//! An [`EventEnvelope`] pairs a validated payload with its topic, an
//! optional partitioning key, and a producer-assigned timestamp. It is
//! created by the publisher and immutable from then on; the transport only
//! reads it.

use chrono::Utc;

use crate::catalog::TopicId;
use crate::schema::ValidatedPayload;

/// One event, ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEnvelope {
    topic: TopicId,
    key: Option<String>,
    payload: ValidatedPayload,
    timestamp_ms: i64,
}

impl EventEnvelope {
    /// Creates an envelope stamped with the current UTC time.
    #[must_use]
    pub fn new(topic: TopicId, key: Option<String>, payload: ValidatedPayload) -> Self {
        Self::at(topic, key, payload, Utc::now().timestamp_millis())
    }

    /// Creates an envelope with an explicit timestamp (epoch milliseconds).
    #[must_use]
    pub fn at(
        topic: TopicId,
        key: Option<String>,
        payload: ValidatedPayload,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            topic,
            key,
            payload,
            timestamp_ms,
        }
    }

    /// Returns the destination topic.
    #[must_use]
    pub fn topic(&self) -> TopicId {
        self.topic
    }

    /// Returns the partitioning key, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Returns the validated payload.
    #[must_use]
    pub fn payload(&self) -> &ValidatedPayload {
        &self.payload
    }

    /// Returns the producer-assigned send time (epoch milliseconds).
    #[must_use]
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// Serializes the payload to its UTF-8 JSON wire form.
    #[must_use]
    pub fn payload_bytes(&self) -> Vec<u8> {
        // A validated payload is a JSON object; serialization cannot fail.
        serde_json::to_vec(self.payload.as_value()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::registry::SchemaRegistry;

    fn validated() -> ValidatedPayload {
        let registry = SchemaRegistry::with_catalog();
        registry
            .validate(
                TopicId::PhotoDelete,
                &json!({"photoId": "p1", "userId": "u1"}),
            )
            .unwrap()
    }

    #[test]
    fn test_new_stamps_current_time() {
        let before = Utc::now().timestamp_millis();
        let envelope = EventEnvelope::new(TopicId::PhotoDelete, None, validated());
        let after = Utc::now().timestamp_millis();
        assert!(envelope.timestamp_ms() >= before && envelope.timestamp_ms() <= after);
    }

    #[test]
    fn test_at_uses_explicit_timestamp() {
        let envelope =
            EventEnvelope::at(TopicId::PhotoDelete, Some("p1".into()), validated(), 1_700_000);
        assert_eq!(envelope.timestamp_ms(), 1_700_000);
        assert_eq!(envelope.key(), Some("p1"));
        assert_eq!(envelope.topic(), TopicId::PhotoDelete);
    }

    #[test]
    fn test_payload_bytes_round_trip() {
        let envelope = EventEnvelope::new(TopicId::PhotoDelete, None, validated());
        let value: serde_json::Value = serde_json::from_slice(&envelope.payload_bytes()).unwrap();
        assert_eq!(value, json!({"photoId": "p1", "userId": "u1"}));
    }
}
