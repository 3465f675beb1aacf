//! Schema error types.
//!
//! Provides [`SchemaError`] for registration and validation failures, plus a
//! convenience [`SchemaResult`] alias. Validation errors always identify the
//! offending field by its dotted path (e.g. `updates.title`).

use thiserror::Error;

use crate::catalog::TopicId;

/// Result alias for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur during schema registration or payload validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The topic is not part of the catalogue, or no schema is registered
    /// for it.
    #[error("unknown topic: '{0}'")]
    UnknownTopic(String),

    /// A schema is already registered for this topic.
    #[error("schema already registered for topic '{0}'")]
    DuplicateSchema(TopicId),

    /// The payload is not valid UTF-8 JSON, or its top level is not an
    /// object.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The payload does not satisfy the topic's structural contract.
    #[error("schema violation at '{path}': {problem}")]
    Violation {
        /// Dotted path of the offending field (`""` for the payload root).
        path: String,
        /// What was wrong with it.
        problem: String,
    },
}

impl SchemaError {
    /// Builds a [`SchemaError::Violation`] for the given field path.
    pub fn violation(path: impl Into<String>, problem: impl Into<String>) -> Self {
        Self::Violation {
            path: path.into(),
            problem: problem.into(),
        }
    }
}
