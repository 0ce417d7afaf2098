//! The injected item repository interface.
//!
//! The builder never fetches anything itself: resolving a reference token to
//! an item and assigning durable URLs to binaries are capabilities supplied
//! by the host through [`ItemSource`]. Hosts with item kinds beyond content
//! items and taxonomy entries report those as unresolved; the builder
//! degrades them to the raw token exactly like a dangling reference.

use crate::error::Result;
use crate::fields::FieldTree;

/// Mime type marking reference-library stub items. Their binary descriptor
/// is assigned by a later pipeline stage, never by this builder.
pub const REFERENCE_LIBRARY_MIME: &str = "application/x-reference-library";

/// An item resolved from a reference token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Content(ContentItem),
    Keyword(KeywordItem),
}

/// A content item as supplied by the host repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    /// Short identifier used in the produced model.
    pub id: String,
    /// Stable identity token, carried by link-end markers in rich text.
    pub uri: String,
    pub schema_id: Option<String>,
    pub content: FieldTree,
    pub metadata: FieldTree,
    pub binary: Option<BinaryData>,
}

impl ContentItem {
    /// Reference-library stub items carry a marker mime type; their binary
    /// descriptor is deferred to a later pipeline stage.
    pub fn is_reference_library(&self) -> bool {
        matches!(&self.binary, Some(binary) if binary.mime_type == REFERENCE_LIBRARY_MIME)
    }
}

/// A taxonomy entry as supplied by the host repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordItem {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub key: Option<String>,
    pub taxonomy_id: String,
    pub schema_id: Option<String>,
    pub metadata: FieldTree,
}

/// Binary content attached to a content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryData {
    pub file_name: String,
    pub size: u64,
    pub mime_type: String,
}

/// Capabilities the builder requires from the host repository.
pub trait ItemSource {
    /// Distinguish internal reference tokens from arbitrary external URLs.
    fn is_reference_token(&self, token: &str) -> bool;

    /// Resolve a reference token to an item. Unresolvable tokens and items
    /// of unsupported kinds both return `None`.
    fn resolve(&self, token: &str) -> Option<Item>;

    /// Assign or obtain a durable URL for a binary-bearing item. Idempotent
    /// for repeated calls with the same item within a build.
    fn register_binary(&self, item: &ContentItem) -> Result<String>;
}

/// Build-time settings, read-only after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderSettings {
    /// How many hops of reference-following are materialized as full models
    /// before degrading to stubs. Negative means unlimited; combined with a
    /// cyclic reference graph that recurses without bound.
    pub expand_link_depth: i32,
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            expand_link_depth: 1,
        }
    }
}
