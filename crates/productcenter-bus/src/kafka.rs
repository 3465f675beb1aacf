//! Kafka implementation of the transport adapter.
//!
//! [`KafkaTransport`] owns the long-lived rdkafka clients: one
//! `FutureProducer` for confirmed sends and one `StreamConsumer` joined to
//! the platform consumer group. `connect` verifies broker reachability with
//! a bounded retry budget before the transport is considered up;
//! `disconnect` drains in-flight sends best-effort. Subscription always
//! starts from the current offsets; the bus never replays topic history.

use std::sync::{Arc, PoisonError, RwLock};

use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use tracing::{debug, info, warn};

use async_trait::async_trait;

use productcenter_events::TopicId;

use crate::config::BusConfig;
use crate::error::{BusError, BusResult};
use crate::transport::Transport;

/// Producer flush bound during disconnect.
const FLUSH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

struct Connections {
    producer: FutureProducer,
    consumer: Arc<StreamConsumer>,
}

/// The Kafka-backed transport adapter.
///
/// Safe for concurrent use: rdkafka clients serialize access internally,
/// so publishes from multiple tasks share the producer without extra
/// locking here.
pub struct KafkaTransport {
    config: BusConfig,
    state: RwLock<Option<Connections>>,
}

impl KafkaTransport {
    /// Creates an unconnected transport. No sockets are opened until
    /// [`KafkaTransport::connect`].
    #[must_use]
    pub fn new(config: BusConfig) -> Self {
        Self {
            config,
            state: RwLock::new(None),
        }
    }

    /// Returns the configuration this transport was built with.
    #[must_use]
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Establishes the producer and consumer sessions.
    ///
    /// Broker reachability is probed with a metadata fetch, retried up to
    /// the configured budget (exponential backoff from the initial value,
    /// each attempt bounded by the connection timeout). Idempotent: calling
    /// on a connected transport is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Connection`] if the clients cannot be built or
    /// the brokers stay unreachable after the whole budget.
    pub async fn connect(&self) -> BusResult<()> {
        if self.read_state(|state| state.is_some()) {
            debug!("kafka transport already connected");
            return Ok(());
        }
        self.config.validate()?;

        let producer: FutureProducer = self
            .config
            .to_producer_client_config()
            .create()
            .map_err(|err| BusError::Connection(format!("failed to create producer: {err}")))?;
        let consumer: StreamConsumer = self
            .config
            .to_consumer_client_config()
            .create()
            .map_err(|err| BusError::Connection(format!("failed to create consumer: {err}")))?;

        self.await_brokers(&producer).await?;

        let mut guard = self
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() {
            *guard = Some(Connections {
                producer,
                consumer: Arc::new(consumer),
            });
            info!(
                brokers = %self.config.brokers,
                client_id = %self.config.client_id,
                "kafka transport connected"
            );
        }
        Ok(())
    }

    /// Probes broker metadata until it succeeds or the budget runs out.
    async fn await_brokers(&self, producer: &FutureProducer) -> BusResult<()> {
        let attempts = self.config.retry.attempts;
        let timeout = self.config.connection_timeout;
        let mut backoff = self.config.retry.initial_backoff;

        for attempt in 1..=attempts {
            let client = producer.clone();
            // fetch_metadata blocks; keep it off the async runtime threads.
            let probe = tokio::task::spawn_blocking(move || {
                client
                    .client()
                    .fetch_metadata(None, timeout)
                    .map(|metadata| metadata.brokers().len())
            })
            .await
            .map_err(|err| BusError::Connection(format!("metadata probe task failed: {err}")))?;

            match probe {
                Ok(brokers) => {
                    debug!(attempt, brokers, "broker metadata fetched");
                    return Ok(());
                }
                Err(err) if attempt == attempts => {
                    return Err(BusError::Connection(format!(
                        "brokers unreachable after {attempts} attempts: {err}"
                    )));
                }
                Err(err) => {
                    warn!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "broker probe failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }

        // attempts >= 1 is enforced by BusConfig::validate.
        Err(BusError::Connection("empty retry budget".into()))
    }

    /// Drains in-flight sends and closes both sessions.
    ///
    /// Best-effort: teardown failures are logged, never returned. Calling
    /// on a disconnected transport is a no-op.
    pub async fn disconnect(&self) {
        let connections = self
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(connections) = connections else {
            return;
        };

        let producer = connections.producer;
        let flushed =
            tokio::task::spawn_blocking(move || producer.flush(Timeout::After(FLUSH_TIMEOUT)))
                .await;
        match flushed {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "failed to flush producer during disconnect"),
            Err(err) => warn!(error = %err, "producer flush task failed during disconnect"),
        }

        connections.consumer.unsubscribe();
        info!("kafka transport disconnected");
    }

    /// Joins the consumer group for the given topic set.
    ///
    /// Consumption starts from the current offset of each partition; there
    /// is no replay of historical messages.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::NotConnected`] before `connect`, or
    /// [`BusError::Subscribe`] if the broker rejects the subscription.
    pub fn subscribe(&self, topics: &[TopicId]) -> BusResult<()> {
        let consumer = self.consumer()?;
        let names: Vec<&str> = topics.iter().map(|topic| topic.as_str()).collect();
        consumer
            .subscribe(&names)
            .map_err(|err| BusError::Subscribe(err.to_string()))?;
        info!(
            topics = ?names,
            group_id = %self.config.group_id,
            "joined consumer group"
        );
        Ok(())
    }

    /// Returns the connected consumer for the dispatch loop.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::NotConnected`] before `connect`.
    pub fn consumer(&self) -> BusResult<Arc<StreamConsumer>> {
        self.read_state(|state| state.as_ref().map(|c| Arc::clone(&c.consumer)))
            .ok_or(BusError::NotConnected)
    }

    fn producer(&self) -> BusResult<FutureProducer> {
        self.read_state(|state| state.as_ref().map(|c| c.producer.clone()))
            .ok_or(BusError::NotConnected)
    }

    fn read_state<T>(&self, f: impl FnOnce(&Option<Connections>) -> T) -> T {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }
}

#[async_trait]
impl Transport for KafkaTransport {
    async fn publish_raw(
        &self,
        topic: &str,
        key: Option<&str>,
        payload: &[u8],
        timestamp_ms: i64,
    ) -> BusResult<()> {
        let producer = self.producer()?;

        let mut record: FutureRecord<'_, str, [u8]> = FutureRecord::to(topic)
            .payload(payload)
            .timestamp(timestamp_ms);
        if let Some(key) = key {
            record = record.key(key);
        }

        // Wait for the broker acknowledgement; no retry at this layer.
        match producer
            .send(record, Timeout::After(self.config.connection_timeout))
            .await
        {
            Ok((partition, offset)) => {
                debug!(topic, partition, offset, "publish confirmed");
                Ok(())
            }
            Err((err, _unsent)) => Err(BusError::Publish {
                topic: topic.to_string(),
                reason: err.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for KafkaTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaTransport")
            .field("brokers", &self.config.brokers)
            .field("group_id", &self.config.group_id)
            .field("connected", &self.read_state(Option::is_some))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_does_not_connect() {
        let transport = KafkaTransport::new(BusConfig::default());
        assert!(transport.consumer().is_err());
    }

    #[test]
    fn test_subscribe_requires_connection() {
        let transport = KafkaTransport::new(BusConfig::default());
        let err = transport.subscribe(&[TopicId::PhotoUpload]).unwrap_err();
        assert!(matches!(err, BusError::NotConnected));
    }

    #[tokio::test]
    async fn test_publish_requires_connection() {
        let transport = KafkaTransport::new(BusConfig::default());
        let err = transport
            .publish_raw("photo.upload", None, b"{}", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, BusError::NotConnected));
    }

    #[tokio::test]
    async fn test_disconnect_when_not_connected_is_a_no_op() {
        let transport = KafkaTransport::new(BusConfig::default());
        transport.disconnect().await;
        assert!(transport.consumer().is_err());
    }

    #[test]
    fn test_debug_output() {
        let transport = KafkaTransport::new(BusConfig::default());
        let debug = format!("{transport:?}");
        assert!(debug.contains("KafkaTransport"));
        assert!(debug.contains("productcenter-group"));
    }
}
