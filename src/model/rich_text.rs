//! Rich-text blocks.
//!
//! Markup cannot hold typed sub-models inline, so binary references are
//! hoisted out of the markup while their position is preserved: the block
//! becomes an ordered sequence of fragments, each either a run of markup or
//! an embedded entity model. Concatenating the fragments in order
//! reconstructs the document order exactly.

use serde::Serialize;

use crate::model::EntityModel;

/// An ordered sequence of rich-text fragments.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RichText {
    pub fragments: Vec<Fragment>,
}

impl RichText {
    /// Iterate the embedded entity models in document order.
    pub fn embedded_entities(&self) -> impl Iterator<Item = &EntityModel> {
        self.fragments.iter().filter_map(|fragment| match fragment {
            Fragment::Entity(entity) => Some(entity.as_ref()),
            Fragment::Markup(_) => None,
        })
    }
}

/// One fragment of a rich-text block.
///
/// Entity fragments never contain raw markup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Fragment {
    Markup(String),
    Entity(Box<EntityModel>),
}

impl Fragment {
    /// Get the markup, if this is a markup fragment.
    pub fn as_markup(&self) -> Option<&str> {
        match self {
            Fragment::Markup(markup) => Some(markup),
            _ => None,
        }
    }

    /// Get the embedded entity, if this is an entity fragment.
    pub fn as_entity(&self) -> Option<&EntityModel> {
        match self {
            Fragment::Entity(entity) => Some(entity),
            _ => None,
        }
    }
}
