//! # `ProductCenter` Events
//!
//! The typed event contract of the `ProductCenter` platform: a closed
//! catalogue of domain topics, a structural schema per topic, and the
//! validation machinery that stands between producers and the wire.
//!
//! Everything in this crate is pure and synchronous. Validating the same
//! payload twice yields the same result; the transport and dispatch layers
//! live in `productcenter-bus`.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

/// Topic catalogue - the closed namespace of domain topics
pub mod catalog;

/// Event envelope - the unit handed to the transport
pub mod envelope;

/// Error types for schema operations
pub mod error;

/// Typed event payloads, one per topic
pub mod events;

/// Schema registry - topic to schema mapping, built once at startup
pub mod registry;

/// Schema definition types and the recursive validator
pub mod schema;

pub use catalog::TopicId;
pub use envelope::EventEnvelope;
pub use error::{SchemaError, SchemaResult};
pub use events::DomainEvent;
pub use registry::SchemaRegistry;
pub use schema::{EventSchema, FieldKind, FieldSpec, ValidatedPayload};
