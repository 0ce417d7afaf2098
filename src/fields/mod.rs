//! The input field tree.
//!
//! This module contains:
//! - [`FieldTree`]: the ordered sequence of named fields an item carries
//! - [`FieldNode`] and [`FieldBody`]: one field and its classified content
//! - XML ingestion for field trees stored as serialized XML
//!
//! A field tree is read-only input to the model builder. Its nodes are
//! classified exactly once, when the tree is constructed: a node is a
//! reference, inline markup, a nested group, or scalar text, and the builder
//! dispatches on that tag instead of re-probing node shapes during the walk.

mod xml;

pub(crate) use xml::XHTML_NS;

use crate::error::Result;

/// An ordered sequence of named fields (the content or metadata side of an
/// item). An empty tree means "no content", never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTree {
    pub fields: Vec<FieldNode>,
}

impl FieldTree {
    /// Create an empty field tree.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Get the text content of the first field with the given name.
    ///
    /// Returns `None` when the field is absent or not a scalar text field.
    pub fn text_field(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|f| f.name == name).and_then(|f| match &f.body {
            FieldBody::Text(text) => Some(text.as_str()),
            _ => None,
        })
    }

    /// Parse a field tree from a serialized XML root element.
    ///
    /// The children of the root element become the fields, in document order.
    /// Classification rules:
    /// - an element with an XLink `href` attribute is a [`FieldBody::Reference`]
    /// - an element with a child element in the XHTML namespace is
    ///   [`FieldBody::Markup`] (its inner markup re-serialized verbatim)
    /// - an element with child elements is a [`FieldBody::Group`]
    /// - anything else is [`FieldBody::Text`] holding the character data
    pub fn from_xml(xml: &str) -> Result<Self> {
        xml::parse_field_tree(xml)
    }
}

/// One named field in a [`FieldTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNode {
    pub name: String,
    pub body: FieldBody,
}

impl FieldNode {
    /// Scalar text field. Numbers and dates stay text; consumers interpret
    /// values by schema.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: FieldBody::Text(value.into()),
        }
    }

    /// Reference field holding a reference token (internal identifier or
    /// external URL).
    pub fn reference(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: FieldBody::Reference(token.into()),
        }
    }

    /// Rich-text field holding inline markup.
    pub fn markup(name: impl Into<String>, markup: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: FieldBody::Markup(markup.into()),
        }
    }

    /// Nested group field.
    pub fn group(name: impl Into<String>, fields: Vec<FieldNode>) -> Self {
        Self {
            name: name.into(),
            body: FieldBody::Group(FieldTree { fields }),
        }
    }
}

/// The classified content of a field node.
///
/// Determined once at construction time; the builder never re-inspects the
/// underlying representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldBody {
    /// A reference token pointing at another item or at an external URL.
    Reference(String),
    /// Inline rich-text markup.
    Markup(String),
    /// Nested fields.
    Group(FieldTree),
    /// Scalar text content.
    Text(String),
}
