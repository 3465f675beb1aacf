//! The transport seam: publishing primitives behind an object-safe trait.
//!
//! [`Transport`] is what the dispatcher depends on. The Kafka adapter
//! implements it for production; [`InMemoryTransport`] implements it for
//! tests and development, recording every publish and optionally injecting
//! failures per topic.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::warn;

use productcenter_events::{EventEnvelope, TopicId};

use crate::error::{BusError, BusResult};

/// Outcome of fanning one payload across several topics.
///
/// Fan-out is not all-or-nothing: each topic publish is independent, and a
/// partial failure is reported rather than swallowed.
#[derive(Debug, Default)]
pub struct FanoutReport {
    /// Topics whose publish was confirmed.
    pub succeeded: Vec<TopicId>,
    /// Topics whose publish failed, with the failure.
    pub failed: Vec<(TopicId, BusError)>,
}

impl FanoutReport {
    /// Returns `true` if every topic publish succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Merges another report into this one.
    pub fn merge(&mut self, other: FanoutReport) {
        self.succeeded.extend(other.succeeded);
        self.failed.extend(other.failed);
    }
}

/// Publishing primitives of the underlying pub/sub transport.
///
/// `publish` must not return before the broker has acknowledged receipt.
/// Neither method retries; retry policy belongs to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publishes raw bytes to a named topic.
    ///
    /// The topic is a plain string so failure sinks (dead-letter topics)
    /// outside the catalogue can be addressed.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Publish` on broker rejection or timeout.
    async fn publish_raw(
        &self,
        topic: &str,
        key: Option<&str>,
        payload: &[u8],
        timestamp_ms: i64,
    ) -> BusResult<()>;

    /// Publishes one envelope, waiting for broker acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Publish` on broker rejection or timeout.
    async fn publish(&self, envelope: &EventEnvelope) -> BusResult<()> {
        self.publish_raw(
            envelope.topic().as_str(),
            envelope.key(),
            &envelope.payload_bytes(),
            envelope.timestamp_ms(),
        )
        .await
    }

    /// Publishes each envelope independently, collecting per-topic results.
    async fn publish_fanout(&self, envelopes: Vec<EventEnvelope>) -> FanoutReport {
        let mut report = FanoutReport::default();
        for envelope in envelopes {
            let topic = envelope.topic();
            match self.publish(&envelope).await {
                Ok(()) => report.succeeded.push(topic),
                Err(err) => {
                    warn!(topic = %topic, error = %err, "fanout publish failed");
                    report.failed.push((topic, err));
                }
            }
        }
        report
    }
}

/// One record accepted by [`InMemoryTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedRecord {
    /// Destination topic name.
    pub topic: String,
    /// Partitioning key, if any.
    pub key: Option<String>,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
    /// Producer-assigned timestamp.
    pub timestamp_ms: i64,
}

impl PublishedRecord {
    /// Decodes the payload as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the payload is not valid JSON; intended for assertions in
    /// tests.
    #[must_use]
    pub fn payload_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.payload).expect("payload should be JSON")
    }
}

/// In-memory transport for tests and development.
///
/// Records every publish in order. Topics marked with
/// [`InMemoryTransport::fail_topic`] reject publishes, which exercises the
/// partial-failure paths without a broker.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    records: Mutex<Vec<PublishedRecord>>,
    failing: Mutex<HashSet<String>>,
}

impl InMemoryTransport {
    /// Creates an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every publish to `topic` fail from now on.
    pub fn fail_topic(&self, topic: impl Into<String>) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(topic.into());
    }

    /// Returns all records accepted so far, in publish order.
    #[must_use]
    pub fn records(&self) -> Vec<PublishedRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of accepted publishes.
    #[must_use]
    pub fn publish_count(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn publish_raw(
        &self,
        topic: &str,
        key: Option<&str>,
        payload: &[u8],
        timestamp_ms: i64,
    ) -> BusResult<()> {
        let failing = self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(topic);
        if failing {
            return Err(BusError::Publish {
                topic: topic.to_string(),
                reason: "injected failure".into(),
            });
        }
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PublishedRecord {
                topic: topic.to_string(),
                key: key.map(ToString::to_string),
                payload: payload.to_vec(),
                timestamp_ms,
            });
        Ok(())
    }
}
