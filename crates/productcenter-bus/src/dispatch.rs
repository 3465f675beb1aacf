//! The dispatcher: validate-before-send publishing and the per-message
//! consume path.
//!
//! Outbound, [`Dispatcher::publish_event`] fails closed: a payload that
//! does not validate never reaches the transport. Inbound,
//! [`Dispatcher::dispatch_bytes`] walks one message through
//! `Received -> Validating -> HandlerInvoked` and captures every failure
//! as a [`DeliveryOutcome`]; nothing a message contains can terminate the
//! consume loop.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use productcenter_events::{
    DomainEvent, EventEnvelope, SchemaRegistry, TopicId, ValidatedPayload,
};

use crate::dlq::{dead_letter_channel, DeadLetterSender, DeadLetterWriter, FailureKind, FailurePolicy};
use crate::error::{BusError, BusResult, HandlerError};
use crate::metrics::{DispatchMetrics, DispatchMetricsSnapshot};
use crate::transport::{FanoutReport, Transport};

/// Transport-level facts about one delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeliveryMetadata {
    /// Source partition.
    pub partition: i32,
    /// Offset within the partition.
    pub offset: i64,
    /// Broker or producer timestamp, if the transport carried one.
    pub timestamp_ms: Option<i64>,
    /// Message key, if any.
    pub key: Option<String>,
}

/// Terminal state of one inbound message.
///
/// Surfaced to the caller and aggregated in
/// [`DispatchMetrics`](crate::metrics::DispatchMetrics); never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The handler ran and succeeded.
    Processed,
    /// The handler ran and failed; the message was skipped.
    HandlerFailed,
    /// The payload failed decoding or validation; the message was skipped.
    ValidationFailed,
}

/// A consumer-side processing function for one topic.
///
/// Handlers are synchronous from the dispatcher's point of view; any I/O a
/// handler performs is its own concern. Failure is reported as a value and
/// must not unwind across this boundary.
pub trait EventHandler: Send + Sync {
    /// Processes one validated message.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] if the message could not be processed; the
    /// dispatcher logs it and continues with the next message.
    fn handle(
        &self,
        topic: TopicId,
        payload: &ValidatedPayload,
        meta: &DeliveryMetadata,
    ) -> Result<(), HandlerError>;
}

impl<F> EventHandler for F
where
    F: Fn(TopicId, &ValidatedPayload, &DeliveryMetadata) -> Result<(), HandlerError>
        + Send
        + Sync,
{
    fn handle(
        &self,
        topic: TopicId,
        payload: &ValidatedPayload,
        meta: &DeliveryMetadata,
    ) -> Result<(), HandlerError> {
        self(topic, payload, meta)
    }
}

/// Routes events between callers, the schema registry, and the transport.
///
/// Holds the handler table (at most one handler per topic, registered
/// during setup and never swapped at runtime) and the failure policy for
/// the inbound path.
pub struct Dispatcher {
    registry: Arc<SchemaRegistry>,
    transport: Arc<dyn Transport>,
    handlers: HashMap<TopicId, Box<dyn EventHandler>>,
    metrics: Arc<DispatchMetrics>,
    dead_letters: Option<DeadLetterSender>,
}

impl Dispatcher {
    /// Creates a dispatcher with the default log-and-skip failure policy.
    #[must_use]
    pub fn new(registry: Arc<SchemaRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
            handlers: HashMap::new(),
            metrics: Arc::new(DispatchMetrics::new()),
            dead_letters: None,
        }
    }

    /// Creates a dispatcher with an explicit failure policy.
    ///
    /// For [`FailurePolicy::DeadLetter`] the returned [`DeadLetterWriter`]
    /// must be spawned (`tokio::spawn(writer.run())`) for records to reach
    /// the dead-letter topics; for [`FailurePolicy::LogAndSkip`] it is
    /// `None`.
    #[must_use]
    pub fn with_policy(
        registry: Arc<SchemaRegistry>,
        transport: Arc<dyn Transport>,
        policy: FailurePolicy,
    ) -> (Self, Option<DeadLetterWriter>) {
        let mut dispatcher = Self::new(registry, Arc::clone(&transport));
        match policy {
            FailurePolicy::LogAndSkip => (dispatcher, None),
            FailurePolicy::DeadLetter(config) => {
                let (sender, writer) = dead_letter_channel(&config, transport);
                dispatcher.dead_letters = Some(sender);
                (dispatcher, Some(writer))
            }
        }
    }

    /// Registers the handler for a topic.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::DuplicateHandler`] if the topic already has one;
    /// handlers live for the process lifetime and are never replaced.
    pub fn register_handler(
        &mut self,
        topic: TopicId,
        handler: impl EventHandler + 'static,
    ) -> BusResult<()> {
        if self.handlers.contains_key(&topic) {
            return Err(BusError::DuplicateHandler(topic));
        }
        self.handlers.insert(topic, Box::new(handler));
        Ok(())
    }

    /// Returns the topics with a registered handler, in catalogue order.
    ///
    /// Subscription setup uses this to join the consumer group for exactly
    /// the handled set.
    #[must_use]
    pub fn handled_topics(&self) -> Vec<TopicId> {
        let mut topics: Vec<TopicId> = self.handlers.keys().copied().collect();
        topics.sort_unstable();
        topics
    }

    /// Returns a snapshot of the dispatch metrics.
    #[must_use]
    pub fn metrics(&self) -> DispatchMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Validates a payload and publishes it to its topic.
    ///
    /// Validation runs first and fails closed: an invalid payload returns
    /// the schema error without any network call.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Schema` on contract violations and
    /// `BusError::Publish`/`BusError::NotConnected` on transport failures.
    pub async fn publish_event(
        &self,
        topic: TopicId,
        payload: &Value,
        key: Option<String>,
    ) -> BusResult<()> {
        let validated = self.registry.validate(topic, payload).map_err(|err| {
            self.metrics
                .publish_rejected_total
                .fetch_add(1, Ordering::Relaxed);
            warn!(topic = %topic, error = %err, "payload rejected before publish");
            err
        })?;

        let envelope = EventEnvelope::new(topic, key, validated);
        match self.transport.publish(&envelope).await {
            Ok(()) => {
                self.metrics.published_total.fetch_add(1, Ordering::Relaxed);
                debug!(topic = %topic, "event published");
                Ok(())
            }
            Err(err) => {
                self.metrics
                    .publish_failed_total
                    .fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    /// Publishes a typed event on its own topic.
    ///
    /// # Errors
    ///
    /// Same contract as [`Dispatcher::publish_event`].
    pub async fn publish_typed<E: DomainEvent>(
        &self,
        event: &E,
        key: Option<String>,
    ) -> BusResult<()> {
        self.publish_event(E::TOPIC, &event.payload(), key).await
    }

    /// Fans one payload to several topics, each publish independent.
    ///
    /// The payload is validated against every target topic's schema;
    /// topics it does not satisfy fail without a network call. Partial
    /// failure is reported, never swallowed.
    pub async fn publish_event_to_topics(
        &self,
        topics: &[TopicId],
        payload: &Value,
        key: Option<String>,
    ) -> FanoutReport {
        let mut report = FanoutReport::default();
        let mut envelopes = Vec::with_capacity(topics.len());

        for &topic in topics {
            match self.registry.validate(topic, payload) {
                Ok(validated) => {
                    envelopes.push(EventEnvelope::new(topic, key.clone(), validated));
                }
                Err(err) => {
                    self.metrics
                        .publish_rejected_total
                        .fetch_add(1, Ordering::Relaxed);
                    warn!(topic = %topic, error = %err, "fanout payload rejected before publish");
                    report.failed.push((topic, err.into()));
                }
            }
        }

        let sent = self.transport.publish_fanout(envelopes).await;
        self.metrics
            .published_total
            .fetch_add(sent.succeeded.len() as u64, Ordering::Relaxed);
        self.metrics
            .publish_failed_total
            .fetch_add(sent.failed.len() as u64, Ordering::Relaxed);
        report.merge(sent);
        report
    }

    /// Walks one inbound message through the dispatch state machine.
    ///
    /// Returns the terminal [`DeliveryOutcome`], or `None` if the message
    /// was dropped before validation: a topic outside the catalogue, or no
    /// registered handler. Dropping is deliberate forward compatibility;
    /// producers may introduce topics this consumer does not know yet.
    pub fn dispatch_bytes(
        &self,
        topic_name: &str,
        payload: &[u8],
        meta: &DeliveryMetadata,
    ) -> Option<DeliveryOutcome> {
        let Ok(topic) = topic_name.parse::<TopicId>() else {
            warn!(topic = topic_name, "dropping message on topic outside the catalogue");
            self.metrics.dropped_total.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        let Some(handler) = self.handlers.get(&topic) else {
            warn!(topic = %topic, "no handler registered, dropping message");
            self.metrics.dropped_total.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        let value: Value = match serde_json::from_slice(payload) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    topic = %topic,
                    offset = meta.offset,
                    error = %err,
                    "payload is not valid JSON, skipping message"
                );
                self.metrics
                    .validation_failed_total
                    .fetch_add(1, Ordering::Relaxed);
                self.dead_letter(
                    FailureKind::MalformedPayload,
                    topic_name,
                    &err.to_string(),
                    payload,
                    meta,
                );
                return Some(DeliveryOutcome::ValidationFailed);
            }
        };

        let validated = match self.registry.validate(topic, &value) {
            Ok(validated) => validated,
            Err(err) => {
                warn!(
                    topic = %topic,
                    offset = meta.offset,
                    error = %err,
                    "payload failed validation, skipping message"
                );
                self.metrics
                    .validation_failed_total
                    .fetch_add(1, Ordering::Relaxed);
                self.dead_letter(
                    FailureKind::SchemaViolation,
                    topic_name,
                    &err.to_string(),
                    payload,
                    meta,
                );
                return Some(DeliveryOutcome::ValidationFailed);
            }
        };

        match handler.handle(topic, &validated, meta) {
            Ok(()) => {
                self.metrics.processed_total.fetch_add(1, Ordering::Relaxed);
                debug!(topic = %topic, offset = meta.offset, "message processed");
                Some(DeliveryOutcome::Processed)
            }
            Err(err) => {
                warn!(
                    topic = %topic,
                    offset = meta.offset,
                    error = %err,
                    "handler failed, skipping message"
                );
                self.metrics
                    .handler_failed_total
                    .fetch_add(1, Ordering::Relaxed);
                self.dead_letter(
                    FailureKind::HandlerFailure,
                    topic_name,
                    err.message(),
                    payload,
                    meta,
                );
                Some(DeliveryOutcome::HandlerFailed)
            }
        }
    }

    fn dead_letter(
        &self,
        kind: FailureKind,
        topic_name: &str,
        error: &str,
        payload: &[u8],
        meta: &DeliveryMetadata,
    ) {
        if let Some(ref sender) = self.dead_letters {
            if sender.send(kind, topic_name, error, payload, meta) {
                self.metrics
                    .dead_lettered_total
                    .fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(feature = "kafka")]
impl Dispatcher {
    /// Runs the consume loop against a connected Kafka transport.
    ///
    /// Messages are dispatched one at a time, in the order the transport
    /// yields them (per-partition ordering only). Per-message failures are
    /// contained by [`Dispatcher::dispatch_bytes`]; consumer-level errors
    /// are logged and the loop keeps polling. The loop stops when the
    /// shutdown signal fires; a handler already running finishes first.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::NotConnected`] if the transport has not been
    /// connected.
    pub async fn run(
        &self,
        transport: &crate::kafka::KafkaTransport,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> BusResult<()> {
        use rdkafka::message::Message;
        use tracing::info;

        let consumer = transport.consumer()?;
        info!("dispatch loop started");

        loop {
            let received = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                msg = consumer.recv() => msg,
            };
            match received {
                Ok(msg) => {
                    let Some(payload) = msg.payload() else {
                        debug!(topic = msg.topic(), "skipping message with empty payload");
                        continue;
                    };
                    let meta = DeliveryMetadata {
                        partition: msg.partition(),
                        offset: msg.offset(),
                        timestamp_ms: msg.timestamp().to_millis(),
                        key: msg
                            .key()
                            .map(|key| String::from_utf8_lossy(key).into_owned()),
                    };
                    self.dispatch_bytes(msg.topic(), payload, &meta);
                }
                Err(err) => {
                    warn!(error = %err, "kafka consumer error");
                }
            }
        }

        info!("dispatch loop stopped");
        Ok(())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handlers", &self.handled_topics())
            .field("dead_letter", &self.dead_letters.is_some())
            .finish_non_exhaustive()
    }
}
