//! # `ProductCenter` Bus
//!
//! The runtime half of the `ProductCenter` event bus: broker configuration,
//! the Kafka transport adapter, and the dispatcher that routes validated
//! events between producers, topics, and handlers with at-least-once
//! delivery and per-message error isolation.
//!
//! The contract half (topics, schemas, envelopes) lives in
//! `productcenter-events`.
//!
//! # Wiring
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use productcenter_bus::config::BusConfig;
//! use productcenter_bus::dispatch::Dispatcher;
//! use productcenter_bus::kafka::KafkaTransport;
//! use productcenter_events::SchemaRegistry;
//!
//! # async fn wire() -> Result<(), productcenter_bus::error::BusError> {
//! let registry = Arc::new(SchemaRegistry::with_catalog());
//! let transport = Arc::new(KafkaTransport::new(BusConfig::from_env()?));
//! transport.connect().await?;
//!
//! let dispatcher = Dispatcher::new(registry, transport.clone());
//! transport.subscribe(&dispatcher.handled_topics())?;
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! dispatcher.run(&transport, shutdown_rx).await?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

/// Bus configuration from the process environment
pub mod config;

/// Dispatcher, handler table, and the consume loop
pub mod dispatch;

/// Failure policy and the dead-letter path
pub mod dlq;

/// Error types for the bus runtime
pub mod error;

/// Kafka transport adapter
#[cfg(feature = "kafka")]
pub mod kafka;

/// Dispatch metrics
pub mod metrics;

/// Transport trait and the in-memory test transport
pub mod transport;

pub use config::BusConfig;
pub use dispatch::{DeliveryMetadata, DeliveryOutcome, Dispatcher, EventHandler};
pub use dlq::{DeadLetterConfig, DeadLetterWriter, FailurePolicy};
pub use error::{BusError, BusResult, HandlerError};
pub use metrics::{DispatchMetrics, DispatchMetricsSnapshot};
pub use transport::{FanoutReport, InMemoryTransport, Transport};

#[cfg(feature = "kafka")]
pub use kafka::KafkaTransport;
