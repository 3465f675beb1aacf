//! Failure policy and the dead-letter path.
//!
//! The dispatcher's default on a poisoned message is log-and-skip, which
//! keeps the loop alive but risks silent loss. Operators can opt into
//! [`FailurePolicy::DeadLetter`]: the dispatcher then hands a
//! [`DeadLetterRecord`] to a bounded channel and the async
//! [`DeadLetterWriter`] publishes it to `<source-topic><suffix>`. The
//! channel send never blocks the consume loop; if the writer cannot keep
//! up, records are dropped with a warning and counted, not queued without
//! bound.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dispatch::DeliveryMetadata;
use crate::transport::Transport;

/// What the dispatcher does with a message that fails.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Warn-log the failure, count it, and continue with the next message.
    #[default]
    LogAndSkip,
    /// Additionally publish a failure record to the topic's dead-letter
    /// sibling.
    DeadLetter(DeadLetterConfig),
}

/// Configuration for dead-letter routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetterConfig {
    /// Suffix appended to the source topic name.
    pub topic_suffix: String,
    /// Raw payloads larger than this are truncated in the record.
    pub max_payload_bytes: usize,
    /// Capacity of the channel between dispatcher and writer.
    pub channel_capacity: usize,
}

impl Default for DeadLetterConfig {
    fn default() -> Self {
        Self {
            topic_suffix: ".dlq".into(),
            max_payload_bytes: 65_536,
            channel_capacity: 1_024,
        }
    }
}

/// Why a message was dead-lettered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The payload was not valid JSON.
    MalformedPayload,
    /// The payload did not satisfy the topic schema.
    SchemaViolation,
    /// The registered handler returned an error.
    HandlerFailure,
}

/// A failed message, as published on the dead-letter topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterRecord {
    /// Topic the message arrived on.
    pub source_topic: String,
    /// Failure category.
    pub kind: FailureKind,
    /// Failure description.
    pub error: String,
    /// Raw payload, lossily decoded and possibly truncated.
    pub payload: String,
    /// Message key, if any.
    pub key: Option<String>,
    /// Source partition.
    pub partition: i32,
    /// Source offset within the partition.
    pub offset: i64,
    /// When the failure was detected (epoch milliseconds).
    pub timestamp_ms: i64,
}

/// Dispatcher-side half of the dead-letter channel.
#[derive(Debug)]
pub(crate) struct DeadLetterSender {
    tx: mpsc::Sender<DeadLetterRecord>,
    max_payload_bytes: usize,
}

impl DeadLetterSender {
    /// Builds a record and enqueues it without blocking.
    ///
    /// Returns `true` if the record was accepted by the channel.
    pub(crate) fn send(
        &self,
        kind: FailureKind,
        source_topic: &str,
        error: &str,
        payload: &[u8],
        meta: &DeliveryMetadata,
    ) -> bool {
        let truncated = &payload[..payload.len().min(self.max_payload_bytes)];
        let record = DeadLetterRecord {
            source_topic: source_topic.to_string(),
            kind,
            error: error.to_string(),
            payload: String::from_utf8_lossy(truncated).into_owned(),
            key: meta.key.clone(),
            partition: meta.partition,
            offset: meta.offset,
            timestamp_ms: Utc::now().timestamp_millis(),
        };
        match self.tx.try_send(record) {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    topic = source_topic,
                    "dead letter channel full, dropping failure record"
                );
                false
            }
        }
    }
}

/// Async task that drains the dead-letter channel into the transport.
///
/// Publish failures are logged and never escalated; the consume loop is
/// not allowed to depend on the health of the dead-letter path.
pub struct DeadLetterWriter {
    rx: mpsc::Receiver<DeadLetterRecord>,
    transport: Arc<dyn Transport>,
    topic_suffix: String,
}

impl DeadLetterWriter {
    pub(crate) fn new(
        rx: mpsc::Receiver<DeadLetterRecord>,
        transport: Arc<dyn Transport>,
        topic_suffix: String,
    ) -> Self {
        Self {
            rx,
            transport,
            topic_suffix,
        }
    }

    /// Runs until the dispatcher side of the channel is dropped.
    pub async fn run(mut self) {
        while let Some(record) = self.rx.recv().await {
            let topic = format!("{}{}", record.source_topic, self.topic_suffix);
            let bytes = serde_json::to_vec(&record).unwrap_or_default();
            if let Err(err) = self
                .transport
                .publish_raw(&topic, record.key.as_deref(), &bytes, record.timestamp_ms)
                .await
            {
                warn!(topic = %topic, error = %err, "failed to publish dead letter record");
            }
        }
        debug!("dead letter channel closed, writer stopping");
    }
}

/// Creates the channel pair for a dead-letter configuration.
pub(crate) fn dead_letter_channel(
    config: &DeadLetterConfig,
    transport: Arc<dyn Transport>,
) -> (DeadLetterSender, DeadLetterWriter) {
    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let sender = DeadLetterSender {
        tx,
        max_payload_bytes: config.max_payload_bytes,
    };
    let writer = DeadLetterWriter::new(rx, transport, config.topic_suffix.clone());
    (sender, writer)
}
