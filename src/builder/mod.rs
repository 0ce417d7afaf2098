//! The model builder.
//!
//! Building a model for an item walks its field tree: sibling fields are
//! grouped into ordered entries, each field value is classified (reference,
//! rich text, nested group, or scalar), references are expanded recursively
//! within a depth budget, and rich-text markup is rewritten with media
//! references hoisted out of line. The same pipeline runs for content,
//! metadata, and keyword metadata at every nesting level.

mod metadata;
mod rich_text;

pub use metadata::{merge_fields, region_mvc_data, strip_module_name, MvcData};

use tracing::debug;

use crate::error::{Error, Result};
use crate::fields::{FieldBody, FieldNode, FieldTree};
use crate::model::{
    BinaryDescriptor, ContentModel, EntityModel, FieldValue, ItemModel, KeywordModel,
};
use crate::source::{BuilderSettings, ContentItem, Item, ItemSource, KeywordItem};

/// Builds content models from field trees.
///
/// Holds only a reference to the injected item source and the build-time
/// settings, both read-only after construction; a builder is stateless
/// across builds and can be shared or recreated per item.
pub struct ModelBuilder<'a, S: ItemSource> {
    source: &'a S,
    settings: BuilderSettings,
}

impl<'a, S: ItemSource> ModelBuilder<'a, S> {
    pub fn new(source: &'a S, settings: BuilderSettings) -> Self {
        Self { source, settings }
    }

    pub fn settings(&self) -> &BuilderSettings {
        &self.settings
    }

    /// Build the model for a top-level item, starting from the configured
    /// expansion depth.
    pub fn build_model(&self, item: &Item) -> Result<ItemModel> {
        match item {
            Item::Content(content) => Ok(ItemModel::Entity(
                self.build_entity_model(content, self.settings.expand_link_depth)?,
            )),
            Item::Keyword(keyword) => Ok(ItemModel::Keyword(
                self.build_keyword_model(keyword, self.settings.expand_link_depth)?,
            )),
        }
    }

    /// Build the full model for a content item.
    pub fn build_entity_model(
        &self,
        item: &ContentItem,
        expand_link_levels: i32,
    ) -> Result<EntityModel> {
        let mut result = EntityModel {
            id: item.id.clone(),
            schema_id: item.schema_id.clone(),
            content: self.build_content_model(&item.content, expand_link_levels)?,
            metadata: self.build_content_model(&item.metadata, expand_link_levels)?,
            binary_content: None,
            html_classes: None,
        };

        // Reference-library stub items are skipped here; a later pipeline
        // stage assigns their binary descriptor.
        if !item.is_reference_library() {
            result.binary_content = self.binary_descriptor(item)?;
        }

        Ok(result)
    }

    fn binary_descriptor(&self, item: &ContentItem) -> Result<Option<BinaryDescriptor>> {
        let Some(binary) = &item.binary else {
            return Ok(None);
        };

        Ok(Some(BinaryDescriptor {
            url: self.source.register_binary(item)?,
            file_name: binary.file_name.clone(),
            file_size: binary.size,
            mime_type: binary.mime_type.clone(),
        }))
    }

    /// Build the full model for a taxonomy entry.
    ///
    /// The metadata tree runs through the same pipeline with the budget as
    /// received: a keyword reached through a link was already charged one
    /// hop, and its metadata links keep decrementing from there.
    pub fn build_keyword_model(
        &self,
        keyword: &KeywordItem,
        expand_link_levels: i32,
    ) -> Result<KeywordModel> {
        Ok(KeywordModel {
            id: keyword.id.clone(),
            title: Some(keyword.title.clone()),
            description: keyword.description.clone(),
            key: keyword.key.clone(),
            taxonomy_id: keyword.taxonomy_id.clone(),
            schema_id: keyword.schema_id.clone(),
            metadata: self.build_content_model(&keyword.metadata, expand_link_levels)?,
        })
    }

    /// Group a field tree into a content model.
    ///
    /// Consecutive same-named siblings collapse into one entry: a run of one
    /// stays a bare value, a longer run becomes a list in original order.
    /// Returns `None` for an empty tree.
    pub fn build_content_model(
        &self,
        tree: &FieldTree,
        expand_link_levels: i32,
    ) -> Result<Option<ContentModel>> {
        let mut model = ContentModel::new();
        let mut run: Option<(&str, Vec<FieldValue>)> = None;

        for node in &tree.fields {
            match &mut run {
                Some((name, values)) if *name == node.name => {
                    values.push(self.field_value(node, expand_link_levels)?);
                }
                _ => {
                    if let Some((name, values)) = run.take() {
                        insert_run(&mut model, name, values)?;
                    }
                    run = Some((
                        node.name.as_str(),
                        vec![self.field_value(node, expand_link_levels)?],
                    ));
                }
            }
        }
        if let Some((name, values)) = run.take() {
            insert_run(&mut model, name, values)?;
        }

        Ok((!model.is_empty()).then_some(model))
    }

    /// Classify one field node and produce its value.
    fn field_value(&self, node: &FieldNode, expand_link_levels: i32) -> Result<FieldValue> {
        match &node.body {
            FieldBody::Reference(token) => {
                self.reference_value(&node.name, token, expand_link_levels)
            }
            FieldBody::Markup(markup) => Ok(FieldValue::RichText(
                self.build_rich_text(markup, &node.name)?,
            )),
            FieldBody::Group(fields) => Ok(FieldValue::Nested(
                self.build_content_model(fields, expand_link_levels)?
                    .unwrap_or_default(),
            )),
            FieldBody::Text(text) => Ok(FieldValue::Text(text.clone())),
        }
    }

    /// Expand a reference field within the remaining budget.
    fn reference_value(
        &self,
        field: &str,
        token: &str,
        expand_link_levels: i32,
    ) -> Result<FieldValue> {
        if !self.source.is_reference_token(token) {
            // External link field.
            return Ok(FieldValue::Text(token.to_string()));
        }

        let Some(item) = self.source.resolve(token) else {
            debug!(field, token, "reference did not resolve to a supported item");
            return Ok(FieldValue::Text(token.to_string()));
        };
        debug!(field, token, "encountered reference");

        if expand_link_levels == 0 {
            debug!(token, "expansion budget exhausted, emitting stub");
            return Ok(match item {
                Item::Content(content) => {
                    FieldValue::Entity(Box::new(EntityModel::stub(content.id)))
                }
                Item::Keyword(keyword) => FieldValue::Keyword(Box::new(KeywordModel::stub(
                    keyword.id,
                    keyword.taxonomy_id,
                ))),
            });
        }

        match item {
            Item::Content(content) => {
                debug!(token, expand_link_levels, "expanding entity reference");
                Ok(FieldValue::Entity(Box::new(
                    self.build_entity_model(&content, expand_link_levels - 1)?,
                )))
            }
            Item::Keyword(keyword) => {
                debug!(token, expand_link_levels, "expanding keyword reference");
                Ok(FieldValue::Keyword(Box::new(
                    self.build_keyword_model(&keyword, expand_link_levels - 1)?,
                )))
            }
        }
    }

    /// Build a content model from the metadata fields not in the exclusion
    /// set, or `None` when every field is excluded or none exist.
    ///
    /// Operates on a filtered working copy; the caller's tree is untouched.
    /// References in custom metadata are never expanded.
    pub fn extract_custom_metadata(
        &self,
        metadata: &FieldTree,
        exclude_fields: &[&str],
    ) -> Result<Option<ContentModel>> {
        let custom = FieldTree {
            fields: metadata
                .fields
                .iter()
                .filter(|field| !exclude_fields.contains(&field.name.as_str()))
                .cloned()
                .collect(),
        };

        if custom.is_empty() {
            return Ok(None);
        }
        self.build_content_model(&custom, 0)
    }
}

fn insert_run(model: &mut ContentModel, name: &str, mut values: Vec<FieldValue>) -> Result<()> {
    if model.contains(name) {
        return Err(Error::DuplicateField(name.to_string()));
    }
    let value = if values.len() == 1 {
        values.remove(0)
    } else {
        FieldValue::List(values)
    };
    model.insert(name, value);
    Ok(())
}
