//! The topic catalogue: a closed, hierarchical namespace of domain topics.
//!
//! [`TopicId`] enumerates every topic the platform publishes or consumes,
//! grouped by domain (`photo`, `thread`, `project`, `user`, `ml`,
//! `integration.erp`, `integration.cad`). The wire name is the dotted form
//! (`photo.upload`); the enum is the only way to name a topic in code, so an
//! unregistered publish cannot be expressed.

use std::fmt;
use std::str::FromStr;

use crate::error::SchemaError;

/// A topic in the catalogue.
///
/// The set is closed: new topics are added here and nowhere else. Every
/// variant has exactly one schema in [`SchemaRegistry::with_catalog`]
/// (`registry.rs` pairs them in one exhaustive match).
///
/// [`SchemaRegistry::with_catalog`]: crate::registry::SchemaRegistry::with_catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TopicId {
    /// A photo finished uploading.
    PhotoUpload,
    /// Photo processing status changed.
    PhotoProcess,
    /// Photo fields were edited.
    PhotoUpdate,
    /// A photo was removed.
    PhotoDelete,
    /// An annotation thread was opened on a photo.
    ThreadCreate,
    /// A comment was added to a thread.
    ThreadComment,
    /// Thread fields were edited.
    ThreadUpdate,
    /// A thread was removed.
    ThreadDelete,
    /// A project was created.
    ProjectCreate,
    /// Project fields were edited.
    ProjectUpdate,
    /// A project was removed.
    ProjectDelete,
    /// A user account was created.
    UserCreate,
    /// User fields were edited.
    UserUpdate,
    /// A user account was removed.
    UserDelete,
    /// A photo was queued for an ML model.
    MlProcess,
    /// An ML model produced results for a photo.
    MlResult,
    /// An ML model failed on a photo.
    MlError,
    /// An ERP part record changed upstream.
    ErpSync,
    /// Partial updates for an ERP part.
    ErpUpdate,
    /// A CAD drawing record changed upstream.
    CadSync,
    /// Partial updates for a CAD drawing.
    CadUpdate,
}

impl TopicId {
    /// The full catalogue, flattened into one ordered, duplicate-free slice.
    ///
    /// Used by subscription setup to bulk-subscribe and by the registry to
    /// assert full schema coverage.
    pub const ALL: [TopicId; 21] = [
        TopicId::PhotoUpload,
        TopicId::PhotoProcess,
        TopicId::PhotoUpdate,
        TopicId::PhotoDelete,
        TopicId::ThreadCreate,
        TopicId::ThreadComment,
        TopicId::ThreadUpdate,
        TopicId::ThreadDelete,
        TopicId::ProjectCreate,
        TopicId::ProjectUpdate,
        TopicId::ProjectDelete,
        TopicId::UserCreate,
        TopicId::UserUpdate,
        TopicId::UserDelete,
        TopicId::MlProcess,
        TopicId::MlResult,
        TopicId::MlError,
        TopicId::ErpSync,
        TopicId::ErpUpdate,
        TopicId::CadSync,
        TopicId::CadUpdate,
    ];

    /// Returns the dotted wire name of the topic.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TopicId::PhotoUpload => "photo.upload",
            TopicId::PhotoProcess => "photo.process",
            TopicId::PhotoUpdate => "photo.update",
            TopicId::PhotoDelete => "photo.delete",
            TopicId::ThreadCreate => "thread.create",
            TopicId::ThreadComment => "thread.comment",
            TopicId::ThreadUpdate => "thread.update",
            TopicId::ThreadDelete => "thread.delete",
            TopicId::ProjectCreate => "project.create",
            TopicId::ProjectUpdate => "project.update",
            TopicId::ProjectDelete => "project.delete",
            TopicId::UserCreate => "user.create",
            TopicId::UserUpdate => "user.update",
            TopicId::UserDelete => "user.delete",
            TopicId::MlProcess => "ml.process",
            TopicId::MlResult => "ml.result",
            TopicId::MlError => "ml.error",
            TopicId::ErpSync => "integration.erp.sync",
            TopicId::ErpUpdate => "integration.erp.update",
            TopicId::CadSync => "integration.cad.sync",
            TopicId::CadUpdate => "integration.cad.update",
        }
    }

    /// Returns the domain segment of the topic name.
    ///
    /// Integration topics keep their subsystem (`integration.erp`,
    /// `integration.cad`); everything else is the first dotted segment.
    #[must_use]
    pub const fn domain(self) -> &'static str {
        match self {
            TopicId::PhotoUpload
            | TopicId::PhotoProcess
            | TopicId::PhotoUpdate
            | TopicId::PhotoDelete => "photo",
            TopicId::ThreadCreate
            | TopicId::ThreadComment
            | TopicId::ThreadUpdate
            | TopicId::ThreadDelete => "thread",
            TopicId::ProjectCreate | TopicId::ProjectUpdate | TopicId::ProjectDelete => "project",
            TopicId::UserCreate | TopicId::UserUpdate | TopicId::UserDelete => "user",
            TopicId::MlProcess | TopicId::MlResult | TopicId::MlError => "ml",
            TopicId::ErpSync | TopicId::ErpUpdate => "integration.erp",
            TopicId::CadSync | TopicId::CadUpdate => "integration.cad",
        }
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopicId {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TopicId::ALL
            .iter()
            .copied()
            .find(|topic| topic.as_str() == s)
            .ok_or_else(|| SchemaError::UnknownTopic(s.to_string()))
    }
}

impl serde::Serialize for TopicId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for TopicId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name: String = serde::Deserialize::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_catalogue_has_no_duplicates() {
        let unique: HashSet<&str> = TopicId::ALL.iter().map(|t| t.as_str()).collect();
        assert_eq!(unique.len(), TopicId::ALL.len());
    }

    #[test]
    fn test_round_trip_through_from_str() {
        for topic in TopicId::ALL {
            assert_eq!(topic.as_str().parse::<TopicId>().unwrap(), topic);
        }
    }

    #[test]
    fn test_unknown_name_rejected() {
        let err = "photo.rotate".parse::<TopicId>().unwrap_err();
        assert!(matches!(err, SchemaError::UnknownTopic(ref name) if name == "photo.rotate"));
    }

    #[test]
    fn test_integration_domains_keep_subsystem() {
        assert_eq!(TopicId::ErpSync.domain(), "integration.erp");
        assert_eq!(TopicId::CadUpdate.domain(), "integration.cad");
        assert_eq!(TopicId::PhotoUpload.domain(), "photo");
    }

    #[test]
    fn test_serde_uses_wire_name() {
        let json = serde_json::to_string(&TopicId::ThreadComment).unwrap();
        assert_eq!(json, "\"thread.comment\"");
        let back: TopicId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TopicId::ThreadComment);
    }

    #[test]
    fn test_serde_rejects_unknown_name() {
        let result: Result<TopicId, _> = serde_json::from_str("\"photo.rotate\"");
        assert!(result.is_err());
    }
}
