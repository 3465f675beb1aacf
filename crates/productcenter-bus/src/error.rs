//! Error types for the event bus runtime.
//!
//! [`BusError`] covers the transport and dispatch layers; contract
//! violations bubble up from `productcenter-events` unchanged via
//! `BusError::Schema`. Handler failures are a separate type on purpose:
//! they are captured as values inside the consume loop and never propagate
//! as `BusError`.

use thiserror::Error;

use productcenter_events::{SchemaError, TopicId};

/// Result alias for bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// Errors from the transport adapter and dispatcher.
#[derive(Debug, Error)]
pub enum BusError {
    /// The broker could not be reached or the clients could not be built.
    /// Fatal at startup; retried with bounded backoff inside `connect`.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A single send was rejected or timed out. Surfaced to the caller;
    /// retry policy belongs there, not here.
    #[error("publish to '{topic}' failed: {reason}")]
    Publish {
        /// Destination topic name.
        topic: String,
        /// Broker-reported reason.
        reason: String,
    },

    /// Joining the consumer group for a topic set failed.
    #[error("subscribe failed: {0}")]
    Subscribe(String),

    /// The bus configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A handler is already registered for this topic.
    #[error("handler already registered for topic '{0}'")]
    DuplicateHandler(TopicId),

    /// The transport has not been connected yet.
    #[error("transport is not connected")]
    NotConnected,

    /// Payload contract violation, surfaced before any network call.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// A consumer-side processing failure, returned by event handlers.
///
/// Handlers report failure as a value; the dispatcher logs it, records the
/// outcome, and moves on. Nothing a handler returns can stop the loop.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HandlerError {
    /// Creates a handler error from a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a handler error wrapping an underlying cause.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_converts() {
        let err: BusError = SchemaError::UnknownTopic("x".into()).into();
        assert!(matches!(err, BusError::Schema(_)));
        assert_eq!(err.to_string(), "unknown topic: 'x'");
    }

    #[test]
    fn test_publish_error_display() {
        let err = BusError::Publish {
            topic: "photo.upload".into(),
            reason: "broker timed out".into(),
        };
        assert_eq!(
            err.to_string(),
            "publish to 'photo.upload' failed: broker timed out"
        );
    }

    #[test]
    fn test_handler_error_carries_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = HandlerError::with_source("could not persist annotation", io);
        assert_eq!(err.message(), "could not persist annotation");
        assert!(std::error::Error::source(&err).is_some());
    }
}
