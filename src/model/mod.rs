//! The produced content model.
//!
//! This module contains:
//! - [`ContentModel`] and [`FieldValue`]: the normalized field mapping
//! - [`EntityModel`], [`KeywordModel`], [`BinaryDescriptor`]: item models
//! - [`RichText`] and [`Fragment`]: rich-text blocks with hoisted entities
//! - [`ItemModel`]: the result of a top-level build
//!
//! Every model value is created fresh per build invocation and owned by the
//! caller; nothing is cached or shared between builds.

mod content;
mod entity;
mod keyword;
mod rich_text;

pub use content::{ContentModel, FieldValue};
pub use entity::{BinaryDescriptor, EntityModel};
pub use keyword::KeywordModel;
pub use rich_text::{Fragment, RichText};

use serde::Serialize;

/// The model built for a top-level item: a content item becomes an entity
/// model, a taxonomy entry becomes a keyword model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ItemModel {
    Entity(EntityModel),
    Keyword(KeywordModel),
}

impl ItemModel {
    /// Get the entity model, if this is one.
    pub fn as_entity(&self) -> Option<&EntityModel> {
        match self {
            ItemModel::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    /// Get the keyword model, if this is one.
    pub fn as_keyword(&self) -> Option<&KeywordModel> {
        match self {
            ItemModel::Keyword(keyword) => Some(keyword),
            _ => None,
        }
    }
}
