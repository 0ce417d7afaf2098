//! Keyword models for taxonomy entries.

use serde::Serialize;

use crate::model::ContentModel;

/// The model built for a taxonomy entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordModel {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    pub taxonomy_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ContentModel>,
}

impl KeywordModel {
    /// Identity-only placeholder, used when the expansion budget is
    /// exhausted. Keyword stubs keep the owning-taxonomy id alongside the
    /// identity.
    pub fn stub(id: impl Into<String>, taxonomy_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            description: None,
            key: None,
            taxonomy_id: taxonomy_id.into(),
            schema_id: None,
            metadata: None,
        }
    }
}
