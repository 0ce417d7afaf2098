//! The normalized field mapping and its value types.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::model::{EntityModel, KeywordModel, RichText};

/// Insertion-ordered mapping from field name to field value.
///
/// Backed by an append-only vector so that document order survives into the
/// serialized output; a field name appears at most once. Repeated sibling
/// fields are collapsed into a single [`FieldValue::List`] entry before
/// insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentModel {
    fields: Vec<(String, FieldValue)>,
}

impl ContentModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field. An existing field with the same name is replaced in
    /// place, keeping its position; the previous value is returned.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        let name = name.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(std::mem::replace(&mut slot.1, value))
        } else {
            self.fields.push((name, value));
            None
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Iterate field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }
}

impl IntoIterator for ContentModel {
    type Item = (String, FieldValue);
    type IntoIter = std::vec::IntoIter<(String, FieldValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl Serialize for ContentModel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// One field value in a [`ContentModel`].
///
/// Scalars stay text (no type coercion; downstream consumers interpret by
/// schema). Lists come from runs of repeated sibling fields and are
/// homogeneous by construction, though mixed realized types degrade
/// gracefully to a list of each element's own variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Entity(Box<EntityModel>),
    Keyword(Box<KeywordModel>),
    Nested(ContentModel),
    RichText(RichText),
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Get the text content, if this is a scalar text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Get the entity model, if this value holds one.
    pub fn as_entity(&self) -> Option<&EntityModel> {
        match self {
            FieldValue::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    /// Get the keyword model, if this value holds one.
    pub fn as_keyword(&self) -> Option<&KeywordModel> {
        match self {
            FieldValue::Keyword(keyword) => Some(keyword),
            _ => None,
        }
    }

    /// Get the list elements, if this value is a list.
    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(values) => Some(values),
            _ => None,
        }
    }
}
