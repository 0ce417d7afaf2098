//! Entity models and binary descriptors.

use serde::Serialize;

use crate::model::ContentModel;

/// The model built for a content item.
///
/// A stub (expansion budget exhausted) carries only the identity; every
/// other field is absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityModel {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentModel>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ContentModel>,

    /// Present only for binary-bearing items outside the reference library.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_content: Option<BinaryDescriptor>,

    /// The source `class` attribute of an image embedded in rich text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_classes: Option<String>,
}

impl EntityModel {
    /// Identity-only placeholder, used when the expansion budget is
    /// exhausted.
    pub fn stub(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            schema_id: None,
            content: None,
            metadata: None,
            binary_content: None,
            html_classes: None,
        }
    }
}

/// Binary metadata for a binary-bearing entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryDescriptor {
    /// Durable URL assigned by the host's binary registration.
    pub url: String,
    pub file_name: String,
    pub file_size: u64,
    pub mime_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_has_identity_only() {
        let stub = EntityModel::stub("42");
        assert_eq!(stub.id, "42");
        assert!(stub.schema_id.is_none());
        assert!(stub.content.is_none());
        assert!(stub.metadata.is_none());
        assert!(stub.binary_content.is_none());
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let json = serde_json::to_string(&EntityModel::stub("42")).unwrap();
        assert_eq!(json, r#"{"id":"42"}"#);
    }
}
