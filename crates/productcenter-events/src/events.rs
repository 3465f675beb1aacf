//! Typed event payloads, one per catalogue topic.
//!
//! These mirror the wire schemas field-for-field and serialize to exactly
//! the JSON the [`SchemaRegistry`](crate::registry::SchemaRegistry)
//! accepts. They are a producer convenience; the registry remains the
//! source of truth and still validates every publish.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::TopicId;

/// An open key/value map (`metadata`, `parameters`, `results`, `data`).
pub type Metadata = serde_json::Map<String, Value>;

/// A payload type bound to its catalogue topic.
pub trait DomainEvent: Serialize {
    /// The topic this event is published on.
    const TOPIC: TopicId;

    /// Serializes the event to its JSON payload.
    fn payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

macro_rules! domain_events {
    ($($event:ident => $topic:ident;)+) => {
        $(
            impl DomainEvent for $event {
                const TOPIC: TopicId = TopicId::$topic;
            }
        )+
    };
}

/// Photo processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoStatus {
    /// Processing has started.
    Processing,
    /// Processing finished successfully.
    Completed,
    /// Processing failed.
    Failed,
}

/// ML model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Optical character recognition.
    Ocr,
    /// Image enhancement and measurement.
    ImageProcessing,
}

/// Upstream record action for ERP/CAD sync events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    /// The record was created upstream.
    Create,
    /// The record was changed upstream.
    Update,
    /// The record was removed upstream.
    Delete,
}

/// A photo finished uploading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUpload {
    /// Platform photo identifier.
    pub photo_id: String,
    /// Uploading user.
    pub user_id: String,
    /// Owning project.
    pub project_id: String,
    /// Original file name.
    pub file_name: String,
    /// File size in bytes.
    pub file_size: u64,
    /// MIME type of the upload.
    pub mime_type: String,
    /// Free-form producer metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Photo processing status changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoProcess {
    /// Platform photo identifier.
    pub photo_id: String,
    /// New processing status.
    pub status: PhotoStatus,
    /// Free-form producer metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Partial update to a photo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUpdates {
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Replacement metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Photo fields were edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUpdate {
    /// Platform photo identifier.
    pub photo_id: String,
    /// The changed fields; empty means no-op.
    pub updates: PhotoUpdates,
}

/// A photo was removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoDelete {
    /// Platform photo identifier.
    pub photo_id: String,
    /// Deleting user.
    pub user_id: String,
}

/// An annotation thread was opened on a photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadCreate {
    /// Thread identifier.
    pub thread_id: String,
    /// Annotated photo.
    pub photo_id: String,
    /// Authoring user.
    pub user_id: String,
    /// Opening message.
    pub content: String,
    /// Free-form producer metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// A comment was added to a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadComment {
    /// Thread identifier.
    pub thread_id: String,
    /// Comment identifier.
    pub comment_id: String,
    /// Authoring user.
    pub user_id: String,
    /// Comment body.
    pub content: String,
    /// Free-form producer metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Partial update to a thread.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadUpdates {
    /// New content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Replacement metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Thread fields were edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadUpdate {
    /// Thread identifier.
    pub thread_id: String,
    /// The changed fields; empty means no-op.
    pub updates: ThreadUpdates,
}

/// A thread was removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadDelete {
    /// Thread identifier.
    pub thread_id: String,
    /// Deleting user.
    pub user_id: String,
}

/// A project was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCreate {
    /// Project identifier.
    pub project_id: String,
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Creating user.
    pub user_id: String,
    /// Free-form producer metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Partial update to a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdates {
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Replacement metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Project fields were edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdate {
    /// Project identifier.
    pub project_id: String,
    /// The changed fields; empty means no-op.
    pub updates: ProjectUpdates,
}

/// A project was removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDelete {
    /// Project identifier.
    pub project_id: String,
    /// Deleting user.
    pub user_id: String,
}

/// A user account was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreate {
    /// User identifier.
    pub user_id: String,
    /// Account email address.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Organizational department.
    pub department: String,
    /// Free-form producer metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Partial update to a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdates {
    /// New display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New department.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    /// Replacement metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// User fields were edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    /// User identifier.
    pub user_id: String,
    /// The changed fields; empty means no-op.
    pub updates: UserUpdates,
}

/// A user account was removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDelete {
    /// User identifier.
    pub user_id: String,
}

/// A photo was queued for an ML model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MlProcess {
    /// Photo to process.
    pub photo_id: String,
    /// Which model to run.
    pub model_type: ModelKind,
    /// Model parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Metadata>,
}

/// An ML model produced results for a photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MlResult {
    /// Processed photo.
    pub photo_id: String,
    /// Which model ran.
    pub model_type: ModelKind,
    /// Model output, shape defined by the model.
    pub results: Metadata,
    /// Free-form producer metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// An ML model failed on a photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MlError {
    /// Photo being processed.
    pub photo_id: String,
    /// Which model failed.
    pub model_type: ModelKind,
    /// Failure description.
    pub error: String,
    /// Free-form producer metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// An ERP part record changed upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErpSync {
    /// ERP part number.
    pub part_number: String,
    /// What happened upstream.
    pub action: SyncAction,
    /// The normalized part record.
    pub data: Metadata,
}

/// Partial updates for an ERP part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErpUpdate {
    /// ERP part number.
    pub part_number: String,
    /// The changed fields.
    pub updates: Metadata,
}

/// A CAD drawing record changed upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CadSync {
    /// CAD drawing identifier.
    pub cad_id: String,
    /// What happened upstream.
    pub action: SyncAction,
    /// The normalized drawing record.
    pub data: Metadata,
}

/// Partial updates for a CAD drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CadUpdate {
    /// CAD drawing identifier.
    pub cad_id: String,
    /// The changed fields.
    pub updates: Metadata,
}

domain_events! {
    PhotoUpload => PhotoUpload;
    PhotoProcess => PhotoProcess;
    PhotoUpdate => PhotoUpdate;
    PhotoDelete => PhotoDelete;
    ThreadCreate => ThreadCreate;
    ThreadComment => ThreadComment;
    ThreadUpdate => ThreadUpdate;
    ThreadDelete => ThreadDelete;
    ProjectCreate => ProjectCreate;
    ProjectUpdate => ProjectUpdate;
    ProjectDelete => ProjectDelete;
    UserCreate => UserCreate;
    UserUpdate => UserUpdate;
    UserDelete => UserDelete;
    MlProcess => MlProcess;
    MlResult => MlResult;
    MlError => MlError;
    ErpSync => ErpSync;
    ErpUpdate => ErpUpdate;
    CadSync => CadSync;
    CadUpdate => CadUpdate;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::registry::SchemaRegistry;

    #[test]
    fn test_photo_upload_serializes_to_wire_shape() {
        let event = PhotoUpload {
            photo_id: "p1".into(),
            user_id: "u1".into(),
            project_id: "proj1".into(),
            file_name: "a.png".into(),
            file_size: 1024,
            mime_type: "image/png".into(),
            metadata: None,
        };
        assert_eq!(
            event.payload(),
            json!({
                "photoId": "p1",
                "userId": "u1",
                "projectId": "proj1",
                "fileName": "a.png",
                "fileSize": 1024,
                "mimeType": "image/png",
            })
        );
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_value(ModelKind::ImageProcessing).unwrap(),
            json!("image_processing")
        );
        assert_eq!(
            serde_json::to_value(PhotoStatus::Processing).unwrap(),
            json!("processing")
        );
        assert_eq!(
            serde_json::to_value(SyncAction::Delete).unwrap(),
            json!("delete")
        );
    }

    #[test]
    fn test_empty_updates_serialize_to_empty_object() {
        let event = PhotoUpdate {
            photo_id: "p1".into(),
            updates: PhotoUpdates::default(),
        };
        assert_eq!(event.payload(), json!({"photoId": "p1", "updates": {}}));
    }

    #[test]
    fn test_typed_events_pass_their_own_schemas() {
        let registry = SchemaRegistry::with_catalog();

        let upload = PhotoUpload {
            photo_id: "p1".into(),
            user_id: "u1".into(),
            project_id: "proj1".into(),
            file_name: "a.png".into(),
            file_size: 1024,
            mime_type: "image/png".into(),
            metadata: Some(Metadata::new()),
        };
        assert!(registry.validate(PhotoUpload::TOPIC, &upload.payload()).is_ok());

        let result = MlResult {
            photo_id: "p1".into(),
            model_type: ModelKind::Ocr,
            results: Metadata::new(),
            metadata: None,
        };
        assert!(registry.validate(MlResult::TOPIC, &result.payload()).is_ok());

        let sync = ErpSync {
            part_number: "PN-1".into(),
            action: SyncAction::Update,
            data: Metadata::new(),
        };
        assert!(registry.validate(ErpSync::TOPIC, &sync.payload()).is_ok());

        let update = UserUpdate {
            user_id: "u1".into(),
            updates: UserUpdates {
                department: Some("QA".into()),
                ..UserUpdates::default()
            },
        };
        assert!(registry.validate(UserUpdate::TOPIC, &update.payload()).is_ok());
    }

    #[test]
    fn test_deserialize_round_trip() {
        let json = json!({
            "threadId": "t1",
            "commentId": "c1",
            "userId": "u1",
            "content": "looks off near the weld",
        });
        let event: ThreadComment = serde_json::from_value(json).unwrap();
        assert_eq!(event.thread_id, "t1");
        assert!(event.metadata.is_none());
    }
}
