//! Builder pipeline tests: grouping, classification, and reference
//! expansion against an in-memory item source.

use std::collections::HashMap;

use fieldmill::{
    BinaryData, BuilderSettings, ContentItem, Error, FieldNode, FieldTree, FieldValue, Item,
    ItemSource, KeywordItem, ModelBuilder, REFERENCE_LIBRARY_MIME, Result,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[derive(Default)]
struct Repo {
    items: HashMap<String, Item>,
}

impl Repo {
    fn with(mut self, token: &str, item: Item) -> Self {
        self.items.insert(token.to_string(), item);
        self
    }
}

impl ItemSource for Repo {
    fn is_reference_token(&self, token: &str) -> bool {
        token.starts_with("urn:")
    }

    fn resolve(&self, token: &str) -> Option<Item> {
        self.items.get(token).cloned()
    }

    fn register_binary(&self, item: &ContentItem) -> Result<String> {
        Ok(format!("/binaries/{}", item.id))
    }
}

fn tree(fields: Vec<FieldNode>) -> FieldTree {
    FieldTree { fields }
}

fn entity(id: &str, content: FieldTree) -> ContentItem {
    ContentItem {
        id: id.to_string(),
        uri: format!("urn:item:{id}"),
        schema_id: Some("10".to_string()),
        content,
        metadata: FieldTree::new(),
        binary: None,
    }
}

fn keyword(id: &str, metadata: FieldTree) -> KeywordItem {
    KeywordItem {
        id: id.to_string(),
        title: format!("Keyword {id}"),
        description: Some("A keyword".to_string()),
        key: Some(format!("key-{id}")),
        taxonomy_id: "3".to_string(),
        schema_id: Some("20".to_string()),
        metadata,
    }
}

#[test]
fn test_consecutive_siblings_collapse_into_ordered_list() {
    let repo = Repo::default();
    let builder = ModelBuilder::new(&repo, BuilderSettings::default());

    let item = entity(
        "1",
        tree(vec![
            FieldNode::text("title", "Hello"),
            FieldNode::text("tags", "a"),
            FieldNode::text("tags", "b"),
            FieldNode::text("tags", "c"),
            FieldNode::text("footer", "End"),
        ]),
    );
    let model = builder.build_entity_model(&item, 0).unwrap();
    let content = model.content.unwrap();

    assert_eq!(
        content.keys().collect::<Vec<_>>(),
        vec!["title", "tags", "footer"]
    );
    // A run of one stays a bare scalar, not a singleton list.
    assert_eq!(content.get("title"), Some(&FieldValue::Text("Hello".into())));
    let tags = content.get("tags").unwrap().as_list().unwrap();
    assert_eq!(
        tags.to_vec(),
        vec![
            FieldValue::Text("a".into()),
            FieldValue::Text("b".into()),
            FieldValue::Text("c".into()),
        ]
    );
}

#[test]
fn test_empty_tree_builds_no_content() {
    let repo = Repo::default();
    let builder = ModelBuilder::new(&repo, BuilderSettings::default());

    let model = builder.build_entity_model(&entity("1", FieldTree::new()), 1).unwrap();
    assert!(model.content.is_none());
    assert!(model.metadata.is_none());
}

#[test]
fn test_non_consecutive_duplicate_field_is_fatal() {
    let repo = Repo::default();
    let builder = ModelBuilder::new(&repo, BuilderSettings::default());

    let item = entity(
        "1",
        tree(vec![
            FieldNode::text("a", "1"),
            FieldNode::text("b", "2"),
            FieldNode::text("a", "3"),
        ]),
    );
    let result = builder.build_entity_model(&item, 0);
    assert!(matches!(result, Err(Error::DuplicateField(name)) if name == "a"));
}

#[test]
fn test_external_link_stays_raw_token() {
    let repo = Repo::default();
    let builder = ModelBuilder::new(&repo, BuilderSettings::default());

    let item = entity(
        "1",
        tree(vec![FieldNode::reference("website", "https://example.com/page")]),
    );
    let model = builder.build_entity_model(&item, 5).unwrap();
    assert_eq!(
        model.content.unwrap().get("website"),
        Some(&FieldValue::Text("https://example.com/page".into()))
    );
}

#[test]
fn test_unresolvable_reference_degrades_to_raw_token() {
    let repo = Repo::default();
    let builder = ModelBuilder::new(&repo, BuilderSettings::default());

    let item = entity("1", tree(vec![FieldNode::reference("link", "urn:item:404")]));
    let model = builder.build_entity_model(&item, 5).unwrap();
    assert_eq!(
        model.content.unwrap().get("link"),
        Some(&FieldValue::Text("urn:item:404".into()))
    );
}

#[test]
fn test_budget_zero_yields_entity_stub() {
    let repo = Repo::default().with(
        "urn:item:2",
        Item::Content(entity("2", tree(vec![FieldNode::text("name", "Target")]))),
    );
    let builder = ModelBuilder::new(&repo, BuilderSettings::default());

    let item = entity("1", tree(vec![FieldNode::reference("link", "urn:item:2")]));
    let model = builder.build_entity_model(&item, 0).unwrap();

    let link = model.content.unwrap();
    let stub = link.get("link").unwrap().as_entity().unwrap().clone();
    assert_eq!(stub.id, "2");
    assert!(stub.schema_id.is_none());
    assert!(stub.content.is_none());
    assert!(stub.metadata.is_none());
}

#[test]
fn test_budget_zero_yields_keyword_stub_with_taxonomy() {
    let repo = Repo::default().with("urn:kw:5", Item::Keyword(keyword("5", FieldTree::new())));
    let builder = ModelBuilder::new(&repo, BuilderSettings::default());

    let item = entity("1", tree(vec![FieldNode::reference("topic", "urn:kw:5")]));
    let model = builder.build_entity_model(&item, 0).unwrap();

    let content = model.content.unwrap();
    let stub = content.get("topic").unwrap().as_keyword().unwrap().clone();
    assert_eq!(stub.id, "5");
    assert_eq!(stub.taxonomy_id, "3");
    assert!(stub.title.is_none());
    assert!(stub.metadata.is_none());
}

#[test]
fn test_expansion_terminates_with_stub_after_budget_hops() {
    let repo = Repo::default()
        .with(
            "urn:item:2",
            Item::Content(entity("2", tree(vec![FieldNode::reference("next", "urn:item:3")]))),
        )
        .with(
            "urn:item:3",
            Item::Content(entity("3", tree(vec![FieldNode::reference("next", "urn:item:4")]))),
        )
        .with(
            "urn:item:4",
            Item::Content(entity("4", tree(vec![FieldNode::text("name", "Tail")]))),
        );
    let builder = ModelBuilder::new(&repo, BuilderSettings::default());

    let item = entity("1", tree(vec![FieldNode::reference("next", "urn:item:2")]));
    let model = builder.build_entity_model(&item, 2).unwrap();

    let second = model.content.unwrap();
    let second = second.get("next").unwrap().as_entity().unwrap();
    assert_eq!(second.id, "2");
    assert!(second.content.is_some(), "first hop should be expanded");

    let third = second.content.as_ref().unwrap();
    let third = third.get("next").unwrap().as_entity().unwrap();
    assert_eq!(third.id, "3");
    assert!(third.content.is_some(), "second hop should be expanded");

    let fourth = third.content.as_ref().unwrap();
    let fourth = fourth.get("next").unwrap().as_entity().unwrap();
    assert_eq!(fourth.id, "4");
    assert!(fourth.content.is_none(), "budget exhausted, expected a stub");
}

#[test]
fn test_self_referencing_item_terminates_at_budget() {
    let looped = entity("9", tree(vec![FieldNode::reference("this", "urn:item:9")]));
    let repo = Repo::default().with("urn:item:9", Item::Content(looped.clone()));
    let builder = ModelBuilder::new(&repo, BuilderSettings::default());

    let model = builder.build_entity_model(&looped, 3).unwrap();

    let mut current = model;
    for _ in 0..3 {
        let content = current.content.expect("expanded hop should carry content");
        current = content.get("this").unwrap().as_entity().unwrap().clone();
        assert_eq!(current.id, "9");
    }
    // Three hops were expanded in full; the budget is now spent and the
    // next link degrades to a stub.
    let content = current.content.expect("third hop is still a full model");
    let stub = content.get("this").unwrap().as_entity().unwrap();
    assert!(stub.content.is_none(), "fourth hop should be a stub");
}

#[test]
fn test_negative_budget_expands_without_limit() {
    let repo = Repo::default()
        .with(
            "urn:item:2",
            Item::Content(entity("2", tree(vec![FieldNode::reference("next", "urn:item:3")]))),
        )
        .with(
            "urn:item:3",
            Item::Content(entity("3", tree(vec![FieldNode::text("name", "Tail")]))),
        );
    let builder = ModelBuilder::new(&repo, BuilderSettings::default());

    let item = entity("1", tree(vec![FieldNode::reference("next", "urn:item:2")]));
    let model = builder.build_entity_model(&item, -1).unwrap();

    let second = model.content.unwrap();
    let second = second.get("next").unwrap().as_entity().unwrap();
    let third = second.content.as_ref().unwrap();
    let third = third.get("next").unwrap().as_entity().unwrap();
    assert_eq!(
        third.content.as_ref().unwrap().get("name"),
        Some(&FieldValue::Text("Tail".into()))
    );
}

#[test]
fn test_keyword_expansion_builds_metadata() {
    let metadata = tree(vec![FieldNode::text("color", "red")]);
    let repo = Repo::default().with("urn:kw:5", Item::Keyword(keyword("5", metadata)));
    let builder = ModelBuilder::new(&repo, BuilderSettings::default());

    let item = entity("1", tree(vec![FieldNode::reference("topic", "urn:kw:5")]));
    let model = builder.build_entity_model(&item, 1).unwrap();

    let content = model.content.unwrap();
    let kw = content.get("topic").unwrap().as_keyword().unwrap();
    assert_eq!(kw.title.as_deref(), Some("Keyword 5"));
    assert_eq!(kw.description.as_deref(), Some("A keyword"));
    assert_eq!(kw.key.as_deref(), Some("key-5"));
    assert_eq!(kw.schema_id.as_deref(), Some("20"));
    assert_eq!(
        kw.metadata.as_ref().unwrap().get("color"),
        Some(&FieldValue::Text("red".into()))
    );
}

#[test]
fn test_keyword_metadata_budget_is_decremented_not_reset() {
    // A keyword reached through a link was charged one hop; links in its
    // metadata continue from the decremented budget.
    let metadata = tree(vec![FieldNode::reference("related", "urn:item:2")]);
    let repo = Repo::default()
        .with("urn:kw:5", Item::Keyword(keyword("5", metadata)))
        .with(
            "urn:item:2",
            Item::Content(entity("2", tree(vec![FieldNode::text("name", "Target")]))),
        );
    let builder = ModelBuilder::new(&repo, BuilderSettings::default());

    let item = entity("1", tree(vec![FieldNode::reference("topic", "urn:kw:5")]));
    let model = builder.build_entity_model(&item, 1).unwrap();

    let content = model.content.unwrap();
    let kw = content.get("topic").unwrap().as_keyword().unwrap();
    let related = kw.metadata.as_ref().unwrap();
    let related = related.get("related").unwrap().as_entity().unwrap();
    assert_eq!(related.id, "2");
    assert!(related.content.is_none(), "expected a stub, not a fresh budget");
}

#[test]
fn test_nested_group_builds_nested_model() {
    let repo = Repo::default();
    let builder = ModelBuilder::new(&repo, BuilderSettings::default());

    let item = entity(
        "1",
        tree(vec![FieldNode::group(
            "address",
            vec![
                FieldNode::text("street", "Main St"),
                FieldNode::text("number", "42"),
            ],
        )]),
    );
    let model = builder.build_entity_model(&item, 0).unwrap();

    let content = model.content.unwrap();
    match content.get("address").unwrap() {
        FieldValue::Nested(nested) => {
            assert_eq!(nested.get("street"), Some(&FieldValue::Text("Main St".into())));
            assert_eq!(nested.get("number"), Some(&FieldValue::Text("42".into())));
        }
        other => panic!("expected nested model, got {:?}", other),
    }
}

#[test]
fn test_binary_item_gets_registered_descriptor() {
    let repo = Repo::default();
    let builder = ModelBuilder::new(&repo, BuilderSettings::default());

    let mut item = entity("7", FieldTree::new());
    item.binary = Some(BinaryData {
        file_name: "logo.png".to_string(),
        size: 2048,
        mime_type: "image/png".to_string(),
    });
    let model = builder.build_entity_model(&item, 0).unwrap();

    let binary = model.binary_content.unwrap();
    assert_eq!(binary.url, "/binaries/7");
    assert_eq!(binary.file_name, "logo.png");
    assert_eq!(binary.file_size, 2048);
    assert_eq!(binary.mime_type, "image/png");
}

#[test]
fn test_reference_library_item_gets_no_descriptor() {
    let repo = Repo::default();
    let builder = ModelBuilder::new(&repo, BuilderSettings::default());

    let mut item = entity("8", FieldTree::new());
    item.binary = Some(BinaryData {
        file_name: "stub.bin".to_string(),
        size: 0,
        mime_type: REFERENCE_LIBRARY_MIME.to_string(),
    });
    let model = builder.build_entity_model(&item, 0).unwrap();
    assert!(model.binary_content.is_none());
}

#[test]
fn test_build_model_dispatches_on_item_kind() {
    let repo = Repo::default();
    let builder = ModelBuilder::new(&repo, BuilderSettings::default());

    let entity_model = builder
        .build_model(&Item::Content(entity("1", FieldTree::new())))
        .unwrap();
    assert_eq!(entity_model.as_entity().unwrap().id, "1");
    assert!(entity_model.as_keyword().is_none());

    let keyword_model = builder
        .build_model(&Item::Keyword(keyword("5", FieldTree::new())))
        .unwrap();
    assert_eq!(keyword_model.as_keyword().unwrap().id, "5");
}

#[test]
fn test_extract_custom_metadata_filters_fields() {
    let repo = Repo::default();
    let builder = ModelBuilder::new(&repo, BuilderSettings::default());

    let metadata = tree(vec![
        FieldNode::text("regionView", "Hero"),
        FieldNode::text("author", "Ada"),
        FieldNode::text("audience", "everyone"),
    ]);

    let custom = builder
        .extract_custom_metadata(&metadata, &["regionView"])
        .unwrap()
        .unwrap();
    assert_eq!(custom.keys().collect::<Vec<_>>(), vec!["author", "audience"]);

    // The caller's tree is untouched.
    assert_eq!(metadata.len(), 3);
}

#[test]
fn test_extract_custom_metadata_all_excluded_is_absent() {
    let repo = Repo::default();
    let builder = ModelBuilder::new(&repo, BuilderSettings::default());

    let metadata = tree(vec![
        FieldNode::text("regionView", "Hero"),
        FieldNode::text("regionName", "Top"),
    ]);
    let custom = builder
        .extract_custom_metadata(&metadata, &["regionView", "regionName"])
        .unwrap();
    assert!(custom.is_none());

    let empty = builder.extract_custom_metadata(&FieldTree::new(), &[]).unwrap();
    assert!(empty.is_none());
}

#[test]
fn test_extract_custom_metadata_empty_exclusion_copies_everything() {
    let repo = Repo::default();
    let builder = ModelBuilder::new(&repo, BuilderSettings::default());

    let metadata = tree(vec![FieldNode::text("author", "Ada")]);
    let custom = builder.extract_custom_metadata(&metadata, &[]).unwrap().unwrap();
    assert_eq!(custom.get("author"), Some(&FieldValue::Text("Ada".into())));
}

#[test]
fn test_model_serializes_in_document_order() {
    let repo = Repo::default();
    let builder = ModelBuilder::new(&repo, BuilderSettings::default());

    let item = entity(
        "1",
        tree(vec![
            FieldNode::text("zebra", "last name, first field"),
            FieldNode::text("tags", "a"),
            FieldNode::text("tags", "b"),
        ]),
    );
    let model = builder.build_entity_model(&item, 0).unwrap();

    let json = serde_json::to_string(&model).unwrap();
    assert_eq!(
        json,
        r#"{"id":"1","schemaId":"10","content":{"zebra":"last name, first field","tags":["a","b"]}}"#
    );
}

proptest! {
    #[test]
    fn prop_runs_collapse_to_matching_lengths(
        lengths in prop::collection::vec(1usize..5, 1..6)
    ) {
        let mut fields = Vec::new();
        for (i, len) in lengths.iter().enumerate() {
            for j in 0..*len {
                fields.push(FieldNode::text(format!("f{i}"), format!("v{j}")));
            }
        }

        let repo = Repo::default();
        let builder = ModelBuilder::new(&repo, BuilderSettings::default());
        let model = builder
            .build_content_model(&FieldTree { fields }, 0)
            .unwrap()
            .unwrap();

        prop_assert_eq!(model.len(), lengths.len());
        for (i, len) in lengths.iter().enumerate() {
            let value = model.get(&format!("f{i}")).unwrap();
            if *len == 1 {
                prop_assert!(matches!(value, FieldValue::Text(_)));
            } else {
                prop_assert_eq!(value.as_list().unwrap().len(), *len);
            }
        }
    }
}
