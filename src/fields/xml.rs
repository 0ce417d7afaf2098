//! XML ingestion for field trees.
//!
//! Field trees arrive from the host repository as serialized XML: a root
//! element whose children are the fields, with repeated fields as repeated
//! sibling elements, nested groups as nested elements, rich text as XHTML
//! child elements, and references as XLink `href` attributes.

use std::borrow::Cow;

use quick_xml::NsReader;
use quick_xml::Writer;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::{Namespace, ResolveResult};

use crate::error::{Error, Result};
use crate::fields::{FieldNode, FieldTree};

pub(crate) const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
pub(crate) const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Generic XML element, parsed before field classification.
struct XmlElement {
    /// Qualified name as written in the source, for re-serialization.
    qname: String,
    /// Local name; becomes the field name.
    local: String,
    namespace: Option<String>,
    /// XLink `href` value, when present.
    reference: Option<String>,
    /// All attributes as written, including namespace declarations.
    attributes: Vec<(String, String)>,
    children: Vec<XmlChild>,
}

enum XmlChild {
    Element(XmlElement),
    Text(String),
}

pub(crate) fn parse_field_tree(xml: &str) -> Result<FieldTree> {
    let mut reader = NsReader::from_str(xml);

    loop {
        match reader.read_resolved_event()? {
            (_, Event::Start(e)) => {
                let root = parse_element(&mut reader, &e)?;
                let fields = root
                    .children
                    .into_iter()
                    .filter_map(|child| match child {
                        XmlChild::Element(element) => Some(classify(element)),
                        XmlChild::Text(_) => None,
                    })
                    .collect::<Result<Vec<_>>>()?;
                return Ok(FieldTree { fields });
            }
            (_, Event::Empty(_)) | (_, Event::Eof) => return Ok(FieldTree::new()),
            _ => {}
        }
    }
}

/// Capture an element's name, namespace, and attributes.
///
/// Must be called while the element is in namespace scope (immediately after
/// its start event has been read).
fn element_shell(reader: &NsReader<&[u8]>, start: &BytesStart<'_>) -> XmlElement {
    let qname = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let (resolved, local) = reader.resolve_element(start.name());
    let local = String::from_utf8_lossy(local.as_ref()).into_owned();
    let namespace = match resolved {
        ResolveResult::Bound(Namespace(ns)) => Some(String::from_utf8_lossy(ns).into_owned()),
        _ => None,
    };

    let mut reference = None;
    let mut attributes = Vec::new();
    for attr in start.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map(Cow::into_owned)
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
        if reference.is_none() && is_reference_attr(reader, &attr) {
            reference = Some(value.clone());
        }
        attributes.push((key, value));
    }

    XmlElement {
        qname,
        local,
        namespace,
        reference,
        attributes,
        children: Vec::new(),
    }
}

/// An attribute is a reference when it is `href` in the XLink namespace.
///
/// The literal `xlink:` prefix is also accepted: a fragment cut out of a
/// larger document may have lost the prefix declaration carried by an
/// ancestor element.
fn is_reference_attr(reader: &NsReader<&[u8]>, attr: &Attribute<'_>) -> bool {
    if attr.key.as_ref() == b"xlink:href" {
        return true;
    }
    let (resolved, local) = reader.resolve_attribute(attr.key);
    matches!(resolved, ResolveResult::Bound(Namespace(ns)) if ns == XLINK_NS.as_bytes())
        && local.as_ref() == b"href"
}

/// Parse the children of an element whose start event has just been read.
fn parse_element(reader: &mut NsReader<&[u8]>, start: &BytesStart<'_>) -> Result<XmlElement> {
    let mut element = element_shell(reader, start);

    loop {
        match reader.read_resolved_event()? {
            (_, Event::Start(e)) => {
                let child = parse_element(reader, &e)?;
                element.children.push(XmlChild::Element(child));
            }
            (_, Event::Empty(e)) => {
                element.children.push(XmlChild::Element(element_shell(reader, &e)));
            }
            (_, Event::Text(t)) => {
                let text = t
                    .decode()
                    .map(Cow::into_owned)
                    .unwrap_or_else(|_| String::from_utf8_lossy(t.as_ref()).into_owned());
                element.children.push(XmlChild::Text(text));
            }
            (_, Event::CData(c)) => {
                element
                    .children
                    .push(XmlChild::Text(String::from_utf8_lossy(c.as_ref()).into_owned()));
            }
            (_, Event::GeneralRef(e)) => {
                let entity = String::from_utf8_lossy(e.as_ref());
                if let Some(resolved) = resolve_entity(&entity) {
                    element.children.push(XmlChild::Text(resolved));
                }
            }
            (_, Event::End(_)) => return Ok(element),
            (_, Event::Eof) => {
                return Err(Error::Markup(format!(
                    "unexpected end of input inside '{}'",
                    element.qname
                )));
            }
            _ => {}
        }
    }
}

/// Classify a parsed element as a field node.
///
/// Checked in order: reference, rich text, nested group, scalar text.
fn classify(element: XmlElement) -> Result<FieldNode> {
    let XmlElement {
        local,
        reference,
        children,
        ..
    } = element;

    if let Some(token) = reference {
        return Ok(FieldNode::reference(local, token));
    }

    let has_markup = children.iter().any(|child| {
        matches!(child, XmlChild::Element(e) if e.namespace.as_deref() == Some(XHTML_NS))
    });
    if has_markup {
        return Ok(FieldNode::markup(local, serialize_children(&children)?));
    }

    let has_elements = children
        .iter()
        .any(|child| matches!(child, XmlChild::Element(_)));
    if has_elements {
        let fields = children
            .into_iter()
            .filter_map(|child| match child {
                XmlChild::Element(e) => Some(classify(e)),
                XmlChild::Text(_) => None,
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(FieldNode::group(local, fields));
    }

    let text: String = children
        .into_iter()
        .filter_map(|child| match child {
            XmlChild::Text(t) => Some(t),
            XmlChild::Element(_) => None,
        })
        .collect();
    Ok(FieldNode::text(local, text))
}

/// Re-serialize the children of a markup field to a single markup string.
fn serialize_children(children: &[XmlChild]) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    for child in children {
        write_child(&mut writer, child)?;
    }
    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_child(writer: &mut Writer<Vec<u8>>, child: &XmlChild) -> Result<()> {
    match child {
        XmlChild::Text(text) => {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        XmlChild::Element(element) => {
            let mut start = BytesStart::new(element.qname.as_str());
            for (key, value) in &element.attributes {
                start.push_attribute((key.as_str(), value.as_str()));
            }
            if element.children.is_empty() {
                writer.write_event(Event::Empty(start))?;
            } else {
                writer.write_event(Event::Start(start))?;
                for child in &element.children {
                    write_child(writer, child)?;
                }
                writer.write_event(Event::End(BytesEnd::new(element.qname.as_str())))?;
            }
        }
    }
    Ok(())
}

/// Resolve XML entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    if let Some(hex) = entity.strip_prefix("#x") {
        if let Ok(code) = u32::from_str_radix(hex, 16)
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    } else if let Some(dec) = entity.strip_prefix('#')
        && let Ok(code) = dec.parse::<u32>()
        && let Some(c) = char::from_u32(code)
    {
        return Some(c.to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldBody;

    const CONTENT: &str = r#"<Content xmlns="uuid:f1a2" xmlns:xlink="http://www.w3.org/1999/xlink">
<title>Hello &amp; welcome</title>
<tags>first</tags>
<tags>second</tags>
<related xlink:href="urn:item:7" xlink:title="Related"/>
<external xlink:href="https://example.com/page"/>
<address><street>Main St</street><number>42</number></address>
<body><p xmlns="http://www.w3.org/1999/xhtml">Rich <strong>text</strong></p></body>
</Content>"#;

    fn parsed() -> FieldTree {
        FieldTree::from_xml(CONTENT).expect("should parse field tree")
    }

    #[test]
    fn test_scalar_field() {
        let tree = parsed();
        assert_eq!(tree.text_field("title"), Some("Hello & welcome"));
    }

    #[test]
    fn test_repeated_fields_stay_separate_nodes() {
        let tree = parsed();
        let tags: Vec<_> = tree.fields.iter().filter(|f| f.name == "tags").collect();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].body, FieldBody::Text("first".to_string()));
        assert_eq!(tags[1].body, FieldBody::Text("second".to_string()));
    }

    #[test]
    fn test_reference_field() {
        let tree = parsed();
        let related = tree.fields.iter().find(|f| f.name == "related").unwrap();
        assert_eq!(related.body, FieldBody::Reference("urn:item:7".to_string()));

        let external = tree.fields.iter().find(|f| f.name == "external").unwrap();
        assert_eq!(
            external.body,
            FieldBody::Reference("https://example.com/page".to_string())
        );
    }

    #[test]
    fn test_group_field() {
        let tree = parsed();
        let address = tree.fields.iter().find(|f| f.name == "address").unwrap();
        match &address.body {
            FieldBody::Group(inner) => {
                assert_eq!(inner.text_field("street"), Some("Main St"));
                assert_eq!(inner.text_field("number"), Some("42"));
            }
            other => panic!("expected group, got {:?}", other),
        }
    }

    #[test]
    fn test_markup_field() {
        let tree = parsed();
        let body = tree.fields.iter().find(|f| f.name == "body").unwrap();
        match &body.body {
            FieldBody::Markup(markup) => {
                assert!(markup.contains("<strong>text</strong>"), "got: {}", markup);
                assert!(markup.starts_with("<p"));
            }
            other => panic!("expected markup, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_document() {
        let tree = FieldTree::from_xml("<Content/>").unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_field_order_preserved() {
        let tree = parsed();
        let names: Vec<_> = tree.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            ["title", "tags", "tags", "related", "external", "address", "body"]
        );
    }

    #[test]
    fn test_unclosed_element_is_an_error() {
        assert!(FieldTree::from_xml("<Content><title>oops</Content>").is_err());
    }
}
