//! The rich-text rewriter.
//!
//! Scans a markup fragment for reference-bearing elements in one streaming
//! pass. References that resolve to binary-bearing items are rewritten:
//! anchors get the registered binary URL plus a zero-width link-end comment
//! after their end tag, images are hoisted out of the markup entirely and
//! replaced with an order-preserving marker. Every other reference becomes a
//! plain `href` holding the raw token. The rewritten markup is then split on
//! the markers into an ordered sequence of text and embedded-entity
//! fragments.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesPI, BytesStart, BytesText, Event};
use tracing::debug;

use crate::error::{Error, Result};
use crate::fields::XHTML_NS;
use crate::model::{ContentModel, EntityModel, FieldValue, Fragment, RichText};
use crate::source::{Item, ItemSource};

use super::ModelBuilder;

/// Marker left in the markup where an image element was hoisted out.
pub(crate) const EMBEDDED_ENTITY_MARKER: &str = "<?EmbeddedEntity ?>";

/// Comment name marking the end of a hyperlink to a binary item.
pub(crate) const LINK_END_MARKER: &str = "LinkEnd";

/// How a reference-bearing element is rewritten.
enum Rewrite {
    /// No reference attribute; element passes through untouched.
    Keep,
    /// Rewritten element with a plain `href`.
    Link(BytesStart<'static>),
    /// Rewritten anchor to a binary item; the string is the identity token
    /// for the link-end comment emitted after the element.
    LinkEnd(BytesStart<'static>, String),
    /// Image element replaced by a marker; the entity was pushed onto the
    /// embedded list.
    Embed,
}

impl<'a, S: ItemSource> ModelBuilder<'a, S> {
    /// Rewrite a rich-text markup fragment into an ordered fragment
    /// sequence. `fragment_id` only contextualizes log output.
    pub fn build_rich_text(&self, markup: &str, fragment_id: &str) -> Result<RichText> {
        let mut reader = Reader::from_str(markup);
        let mut writer = Writer::new(Vec::new());
        let mut embedded: Vec<EntityModel> = Vec::new();
        // One entry per open element; holds the identity token when a
        // link-end comment is due after the element closes.
        let mut open: Vec<Option<String>> = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) => match self.rewrite_element(&e, fragment_id, &mut embedded)? {
                    Rewrite::Keep => {
                        open.push(None);
                        writer.write_event(Event::Start(e))?;
                    }
                    Rewrite::Link(elem) => {
                        open.push(None);
                        writer.write_event(Event::Start(elem))?;
                    }
                    Rewrite::LinkEnd(elem, uri) => {
                        open.push(Some(uri));
                        writer.write_event(Event::Start(elem))?;
                    }
                    Rewrite::Embed => {
                        skip_subtree(&mut reader)?;
                        writer.write_event(Event::PI(BytesPI::new("EmbeddedEntity ")))?;
                    }
                },
                Event::Empty(e) => match self.rewrite_element(&e, fragment_id, &mut embedded)? {
                    Rewrite::Keep => writer.write_event(Event::Empty(e))?,
                    Rewrite::Link(elem) => writer.write_event(Event::Empty(elem))?,
                    Rewrite::LinkEnd(elem, uri) => {
                        writer.write_event(Event::Empty(elem))?;
                        write_link_end(&mut writer, &uri)?;
                    }
                    Rewrite::Embed => {
                        writer.write_event(Event::PI(BytesPI::new("EmbeddedEntity ")))?;
                    }
                },
                Event::End(e) => {
                    writer.write_event(Event::End(e))?;
                    if let Some(Some(uri)) = open.pop() {
                        write_link_end(&mut writer, &uri)?;
                    }
                }
                Event::Eof => break,
                other => writer.write_event(other)?,
            }
        }

        let html = String::from_utf8(writer.into_inner())?;
        // Serialization may reintroduce the markup default namespace; it is
        // cosmetic, not semantic.
        let html = html.replace(&format!(" xmlns=\"{XHTML_NS}\""), "");

        Ok(split_fragments(&html, embedded))
    }

    fn rewrite_element(
        &self,
        elem: &BytesStart<'_>,
        fragment_id: &str,
        embedded: &mut Vec<EntityModel>,
    ) -> Result<Rewrite> {
        let Some(token) = attr_value(elem, b"xlink:href") else {
            return Ok(Rewrite::Keep);
        };

        let resolved = if self.source.is_reference_token(&token) {
            self.source.resolve(&token)
        } else {
            None
        };

        match resolved {
            Some(Item::Content(item)) if item.binary.is_some() => {
                if elem.local_name().as_ref() == b"img" {
                    // Embedded media never expands further references.
                    let mut entity = self.build_entity_model(&item, 0)?;
                    if let Some(classes) = attr_value(elem, b"class").filter(|c| !c.is_empty()) {
                        entity.html_classes = Some(classes);
                    }
                    if let Some(alt) = attr_value(elem, b"alt").filter(|a| !a.is_empty()) {
                        // The image's alt attribute wins over any metadata
                        // field of the same name.
                        entity
                            .metadata
                            .get_or_insert_with(ContentModel::new)
                            .insert("altText", FieldValue::Text(alt));
                    }
                    debug!(fragment_id, token = %token, "hoisting embedded image");
                    embedded.push(entity);
                    Ok(Rewrite::Embed)
                } else {
                    let url = self.source.register_binary(&item)?;
                    debug!(fragment_id, token = %token, url = %url, "rewriting binary link");
                    let rewritten = replace_href(elem, &url);
                    if elem.local_name().as_ref() == b"a" {
                        Ok(Rewrite::LinkEnd(rewritten, item.uri.clone()))
                    } else {
                        Ok(Rewrite::Link(rewritten))
                    }
                }
            }
            _ => {
                // Plain resolved link: external URL, dangling token, or a
                // target without binary content.
                debug!(fragment_id, token = %token, "keeping plain link");
                Ok(Rewrite::Link(replace_href(elem, &token)))
            }
        }
    }
}

/// Rebuild an element with a bare `href`, stripping XLink attributes.
fn replace_href(elem: &BytesStart<'_>, href: &str) -> BytesStart<'static> {
    let name = String::from_utf8_lossy(elem.name().as_ref()).into_owned();
    let mut rewritten = BytesStart::new(name);
    let mut replaced = false;

    for attr in elem.attributes().flatten() {
        let key = attr.key.as_ref();
        if is_xlink_attr(key) {
            continue;
        }
        if key == b"href" {
            rewritten.push_attribute(("href", href));
            replaced = true;
            continue;
        }
        let key = String::from_utf8_lossy(key).into_owned();
        let value = attr
            .unescape_value()
            .map(Cow::into_owned)
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
        rewritten.push_attribute((key.as_str(), value.as_str()));
    }
    if !replaced {
        rewritten.push_attribute(("href", href));
    }

    rewritten
}

fn is_xlink_attr(key: &[u8]) -> bool {
    key == b"xmlns:xlink" || key.starts_with(b"xlink:")
}

fn attr_value(elem: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    elem.attributes().flatten().find(|attr| attr.key.as_ref() == name).map(|attr| {
        attr.unescape_value()
            .map(Cow::into_owned)
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned())
    })
}

fn write_link_end(writer: &mut Writer<Vec<u8>>, uri: &str) -> Result<()> {
    let comment = format!("{LINK_END_MARKER} {uri}");
    writer.write_event(Event::Comment(BytesText::from_escaped(comment)))?;
    Ok(())
}

/// Consume events until the current element's end tag.
fn skip_subtree(reader: &mut Reader<&[u8]>) -> Result<()> {
    let mut depth = 1usize;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => {
                return Err(Error::Markup("unexpected end of input inside element".into()));
            }
            _ => {}
        }
    }
}

/// Split rewritten markup on embedded-entity markers, pairing each marker
/// with the next entity from the ordered list.
///
/// Marker and entity counts match by construction; a mismatch means the
/// rewrite pass and this split have drifted apart, which is a programming
/// error rather than bad input.
fn split_fragments(html: &str, embedded: Vec<EntityModel>) -> RichText {
    let mut fragments = Vec::new();
    let mut entities = embedded.into_iter();
    let mut last = 0;

    for (index, _) in html.match_indices(EMBEDDED_ENTITY_MARKER) {
        if index > last {
            fragments.push(Fragment::Markup(html[last..index].to_string()));
        }
        let entity = entities
            .next()
            .expect("marker without a matching embedded entity");
        fragments.push(Fragment::Entity(Box::new(entity)));
        last = index + EMBEDDED_ENTITY_MARKER.len();
    }
    if last < html.len() {
        fragments.push(Fragment::Markup(html[last..].to_string()));
    }
    assert!(
        entities.next().is_none(),
        "embedded entity without a matching marker"
    );

    RichText { fragments }
}
