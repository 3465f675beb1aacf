//! The schema registry: one validated contract per topic.
//!
//! [`SchemaRegistry`] is an explicit object constructed once at process
//! start ([`SchemaRegistry::with_catalog`]) and passed by reference to the
//! dispatcher; there is no global state. Registration is closed after
//! startup and validation is purely functional, so the registry can be
//! shared freely across tasks.

use std::collections::HashMap;

use serde_json::Value;

use crate::catalog::TopicId;
use crate::error::{SchemaError, SchemaResult};
use crate::schema::{EventSchema, FieldKind, ValidatedPayload};

/// Maps every topic to the structural contract its payloads must satisfy.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<TopicId, EventSchema>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the registry for the full topic catalogue.
    ///
    /// Coverage is total by construction: `schema_for` matches exhaustively
    /// over [`TopicId`], so adding a topic without a schema fails to
    /// compile.
    #[must_use]
    pub fn with_catalog() -> Self {
        let mut registry = Self::new();
        for topic in TopicId::ALL {
            // Cannot collide: TopicId::ALL is duplicate-free.
            let _ = registry.register(topic, schema_for(topic));
        }
        registry
    }

    /// Registers a schema for a topic.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateSchema`] if the topic already has
    /// one. Schemas are immutable after registration; there is no
    /// replacement operation.
    pub fn register(&mut self, topic: TopicId, schema: EventSchema) -> SchemaResult<()> {
        if self.schemas.contains_key(&topic) {
            return Err(SchemaError::DuplicateSchema(topic));
        }
        self.schemas.insert(topic, schema);
        Ok(())
    }

    /// Validates a payload against the topic's schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownTopic`] if no schema is registered for
    /// the topic, or the schema's own violation errors.
    pub fn validate(&self, topic: TopicId, payload: &Value) -> SchemaResult<ValidatedPayload> {
        let schema = self
            .schemas
            .get(&topic)
            .ok_or_else(|| SchemaError::UnknownTopic(topic.to_string()))?;
        schema.validate(payload)?;
        Ok(ValidatedPayload::new(payload.clone()))
    }

    /// Returns the schema registered for a topic, if any.
    #[must_use]
    pub fn get(&self, topic: TopicId) -> Option<&EventSchema> {
        self.schemas.get(&topic)
    }

    /// Returns the number of registered schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Returns `true` if no schemas are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Returns `true` if every catalogue topic has a schema.
    #[must_use]
    pub fn covers_catalog(&self) -> bool {
        TopicId::ALL
            .iter()
            .all(|topic| self.schemas.contains_key(topic))
    }
}

/// The structural contract for one topic, transcribed from the platform's
/// event definitions.
fn schema_for(topic: TopicId) -> EventSchema {
    use FieldKind::{Email, Enum, Integer, Map, Text};

    let name = topic.as_str();
    match topic {
        TopicId::PhotoUpload => EventSchema::new(name)
            .field("photoId", Text)
            .field("userId", Text)
            .field("projectId", Text)
            .field("fileName", Text)
            .field("fileSize", Integer)
            .field("mimeType", Text)
            .optional("metadata", Map),
        TopicId::PhotoProcess => EventSchema::new(name)
            .field("photoId", Text)
            .field("status", Enum(&["processing", "completed", "failed"]))
            .optional("metadata", Map),
        TopicId::PhotoUpdate => EventSchema::new(name).field("photoId", Text).field(
            "updates",
            FieldKind::update(vec![
                ("title", Text),
                ("description", Text),
                ("metadata", Map),
            ]),
        ),
        TopicId::PhotoDelete => EventSchema::new(name)
            .field("photoId", Text)
            .field("userId", Text),
        TopicId::ThreadCreate => EventSchema::new(name)
            .field("threadId", Text)
            .field("photoId", Text)
            .field("userId", Text)
            .field("content", Text)
            .optional("metadata", Map),
        TopicId::ThreadComment => EventSchema::new(name)
            .field("threadId", Text)
            .field("commentId", Text)
            .field("userId", Text)
            .field("content", Text)
            .optional("metadata", Map),
        TopicId::ThreadUpdate => EventSchema::new(name).field("threadId", Text).field(
            "updates",
            FieldKind::update(vec![("content", Text), ("metadata", Map)]),
        ),
        TopicId::ThreadDelete => EventSchema::new(name)
            .field("threadId", Text)
            .field("userId", Text),
        TopicId::ProjectCreate => EventSchema::new(name)
            .field("projectId", Text)
            .field("name", Text)
            .optional("description", Text)
            .field("userId", Text)
            .optional("metadata", Map),
        TopicId::ProjectUpdate => EventSchema::new(name).field("projectId", Text).field(
            "updates",
            FieldKind::update(vec![
                ("name", Text),
                ("description", Text),
                ("metadata", Map),
            ]),
        ),
        TopicId::ProjectDelete => EventSchema::new(name)
            .field("projectId", Text)
            .field("userId", Text),
        TopicId::UserCreate => EventSchema::new(name)
            .field("userId", Text)
            .field("email", Email)
            .field("name", Text)
            .field("department", Text)
            .optional("metadata", Map),
        TopicId::UserUpdate => EventSchema::new(name).field("userId", Text).field(
            "updates",
            FieldKind::update(vec![
                ("name", Text),
                ("department", Text),
                ("metadata", Map),
            ]),
        ),
        TopicId::UserDelete => EventSchema::new(name).field("userId", Text),
        TopicId::MlProcess => EventSchema::new(name)
            .field("photoId", Text)
            .field("modelType", Enum(&["ocr", "image_processing"]))
            .optional("parameters", Map),
        TopicId::MlResult => EventSchema::new(name)
            .field("photoId", Text)
            .field("modelType", Enum(&["ocr", "image_processing"]))
            .field("results", Map)
            .optional("metadata", Map),
        TopicId::MlError => EventSchema::new(name)
            .field("photoId", Text)
            .field("modelType", Enum(&["ocr", "image_processing"]))
            .field("error", Text)
            .optional("metadata", Map),
        TopicId::ErpSync => EventSchema::new(name)
            .field("partNumber", Text)
            .field("action", Enum(&["create", "update", "delete"]))
            .field("data", Map),
        TopicId::ErpUpdate => EventSchema::new(name)
            .field("partNumber", Text)
            .field("updates", Map),
        TopicId::CadSync => EventSchema::new(name)
            .field("cadId", Text)
            .field("action", Enum(&["create", "update", "delete"]))
            .field("data", Map),
        TopicId::CadUpdate => EventSchema::new(name)
            .field("cadId", Text)
            .field("updates", Map),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_catalog_registry_covers_every_topic() {
        let registry = SchemaRegistry::with_catalog();
        assert_eq!(registry.len(), TopicId::ALL.len());
        assert!(registry.covers_catalog());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = SchemaRegistry::with_catalog();
        let err = registry
            .register(TopicId::PhotoUpload, EventSchema::new("photo.upload"))
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateSchema(TopicId::PhotoUpload));
        // Original schema untouched.
        assert!(!registry.get(TopicId::PhotoUpload).unwrap().fields().is_empty());
    }

    #[test]
    fn test_empty_registry_reports_unknown_topic() {
        let registry = SchemaRegistry::new();
        let err = registry
            .validate(TopicId::PhotoUpload, &json!({}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownTopic(_)));
    }

    #[test]
    fn test_photo_upload_happy_path() {
        let registry = SchemaRegistry::with_catalog();
        let payload = json!({
            "photoId": "p1",
            "userId": "u1",
            "projectId": "proj1",
            "fileName": "a.png",
            "fileSize": 1024,
            "mimeType": "image/png",
        });
        let validated = registry.validate(TopicId::PhotoUpload, &payload).unwrap();
        assert_eq!(validated.get("photoId"), Some(&json!("p1")));
    }

    #[test]
    fn test_every_topic_rejects_payload_missing_a_required_field() {
        let registry = SchemaRegistry::with_catalog();
        for topic in TopicId::ALL {
            let err = registry.validate(topic, &json!({})).unwrap_err();
            assert!(
                matches!(err, SchemaError::Violation { ref problem, .. }
                    if problem == "missing required field"),
                "{topic}: expected a missing-field violation, got {err}"
            );
        }
    }

    #[test]
    fn test_every_topic_accepts_its_well_formed_payload() {
        let registry = SchemaRegistry::with_catalog();
        for topic in TopicId::ALL {
            let payload = well_formed(topic);
            assert!(
                registry.validate(topic, &payload).is_ok(),
                "{topic}: rejected {payload}"
            );
        }
    }

    #[test]
    fn test_user_create_rejects_bad_email() {
        let registry = SchemaRegistry::with_catalog();
        let payload = json!({
            "userId": "u1",
            "email": "not-an-email",
            "name": "A",
            "department": "D",
        });
        let err = registry.validate(TopicId::UserCreate, &payload).unwrap_err();
        assert!(matches!(err, SchemaError::Violation { ref path, .. } if path == "email"));
    }

    #[test]
    fn test_ml_process_rejects_unknown_model() {
        let registry = SchemaRegistry::with_catalog();
        let payload = json!({"photoId": "p1", "modelType": "classification"});
        let err = registry.validate(TopicId::MlProcess, &payload).unwrap_err();
        assert!(matches!(err, SchemaError::Violation { ref path, .. } if path == "modelType"));
    }

    #[test]
    fn test_erp_sync_requires_data_map() {
        let registry = SchemaRegistry::with_catalog();
        let payload = json!({"partNumber": "PN-1", "action": "update"});
        let err = registry.validate(TopicId::ErpSync, &payload).unwrap_err();
        assert!(matches!(err, SchemaError::Violation { ref path, .. } if path == "data"));
    }

    #[test]
    fn test_update_events_accept_empty_updates() {
        let registry = SchemaRegistry::with_catalog();
        let payload = json!({"photoId": "p1", "updates": {}});
        assert!(registry.validate(TopicId::PhotoUpdate, &payload).is_ok());
    }

    #[test]
    fn test_validation_does_not_mutate_registry() {
        let registry = SchemaRegistry::with_catalog();
        let payload = json!({"photoId": "p1", "userId": "u1"});
        let first = registry.validate(TopicId::PhotoDelete, &payload);
        let second = registry.validate(TopicId::PhotoDelete, &payload);
        assert_eq!(first, second);
        assert_eq!(registry.len(), TopicId::ALL.len());
    }

    /// A minimal well-formed payload per topic, mirroring the producers.
    fn well_formed(topic: TopicId) -> serde_json::Value {
        match topic {
            TopicId::PhotoUpload => json!({
                "photoId": "p1", "userId": "u1", "projectId": "proj1",
                "fileName": "a.png", "fileSize": 1024, "mimeType": "image/png",
            }),
            TopicId::PhotoProcess => json!({"photoId": "p1", "status": "processing"}),
            TopicId::PhotoUpdate => json!({"photoId": "p1", "updates": {"title": "t"}}),
            TopicId::PhotoDelete => json!({"photoId": "p1", "userId": "u1"}),
            TopicId::ThreadCreate => json!({
                "threadId": "t1", "photoId": "p1", "userId": "u1", "content": "hi",
            }),
            TopicId::ThreadComment => json!({
                "threadId": "t1", "commentId": "c1", "userId": "u1", "content": "hi",
            }),
            TopicId::ThreadUpdate => json!({"threadId": "t1", "updates": {"content": "edited"}}),
            TopicId::ThreadDelete => json!({"threadId": "t1", "userId": "u1"}),
            TopicId::ProjectCreate => json!({"projectId": "proj1", "name": "N", "userId": "u1"}),
            TopicId::ProjectUpdate => json!({"projectId": "proj1", "updates": {"name": "M"}}),
            TopicId::ProjectDelete => json!({"projectId": "proj1", "userId": "u1"}),
            TopicId::UserCreate => json!({
                "userId": "u1", "email": "a@example.com", "name": "A", "department": "D",
            }),
            TopicId::UserUpdate => json!({"userId": "u1", "updates": {"department": "E"}}),
            TopicId::UserDelete => json!({"userId": "u1"}),
            TopicId::MlProcess => json!({"photoId": "p1", "modelType": "ocr"}),
            TopicId::MlResult => json!({
                "photoId": "p1", "modelType": "image_processing", "results": {"width": 640},
            }),
            TopicId::MlError => json!({"photoId": "p1", "modelType": "ocr", "error": "boom"}),
            TopicId::ErpSync => json!({
                "partNumber": "PN-1", "action": "create", "data": {"rev": "B"},
            }),
            TopicId::ErpUpdate => json!({"partNumber": "PN-1", "updates": {"rev": "C"}}),
            TopicId::CadSync => json!({
                "cadId": "cad-1", "action": "update", "data": {"sheet": 2},
            }),
            TopicId::CadUpdate => json!({"cadId": "cad-1", "updates": {"sheet": 3}}),
        }
    }
}
