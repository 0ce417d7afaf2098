//! # fieldmill
//!
//! A library for turning semi-structured CMS field trees into normalized,
//! serializable content models.
//!
//! ## Features
//!
//! - Groups repeated sibling fields into ordered lists
//! - Expands cross-references up to a configurable depth budget, degrading
//!   to identity-only stubs beyond it
//! - Rewrites rich-text markup, hoisting embedded media out of line while
//!   preserving document order
//! - Merges content and template metadata with collision reporting
//! - Parses field trees from their serialized XML form
//!
//! ## Quick Start
//!
//! The host supplies reference resolution and binary registration through
//! [`ItemSource`]; the builder does the rest:
//!
//! ```
//! use fieldmill::{
//!     BuilderSettings, ContentItem, FieldNode, FieldTree, Item, ItemSource, ModelBuilder,
//! };
//!
//! struct Repository;
//!
//! impl ItemSource for Repository {
//!     fn is_reference_token(&self, token: &str) -> bool {
//!         token.starts_with("urn:")
//!     }
//!
//!     fn resolve(&self, _token: &str) -> Option<Item> {
//!         None
//!     }
//!
//!     fn register_binary(&self, item: &ContentItem) -> fieldmill::Result<String> {
//!         Ok(format!("/binaries/{}", item.id))
//!     }
//! }
//!
//! let item = ContentItem {
//!     id: "42".into(),
//!     uri: "urn:item:42".into(),
//!     schema_id: Some("7".into()),
//!     content: FieldTree {
//!         fields: vec![
//!             FieldNode::text("title", "Hello"),
//!             FieldNode::text("tags", "tutorial"),
//!             FieldNode::text("tags", "intro"),
//!         ],
//!     },
//!     metadata: FieldTree::new(),
//!     binary: None,
//! };
//!
//! let repository = Repository;
//! let builder = ModelBuilder::new(&repository, BuilderSettings::default());
//! let model = builder.build_entity_model(&item, 1).unwrap();
//!
//! let content = model.content.unwrap();
//! assert_eq!(content.len(), 2);
//! assert_eq!(content.get("tags").unwrap().as_list().unwrap().len(), 2);
//! ```
//!
//! ## Scope
//!
//! The builder constructs the model tree and nothing else: storage,
//! transport, rendering, and the decision of which items to build are the
//! host's concern, as is the repository behind [`ItemSource`].

pub mod builder;
pub mod error;
pub mod fields;
pub mod model;
pub mod source;

pub use builder::{merge_fields, region_mvc_data, strip_module_name, ModelBuilder, MvcData};
pub use error::{Error, Result};
pub use fields::{FieldBody, FieldNode, FieldTree};
pub use model::{
    BinaryDescriptor, ContentModel, EntityModel, FieldValue, Fragment, ItemModel, KeywordModel,
    RichText,
};
pub use source::{
    BinaryData, BuilderSettings, ContentItem, Item, ItemSource, KeywordItem,
    REFERENCE_LIBRARY_MIME,
};
