//! XML text → [`Document`].

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use trackalt_shared::{Result, TrackAltError};

use crate::tree::{Document, Element, FieldKind, MarkupNode, NodeId};

/// An element whose end tag has not been seen yet.
struct OpenElement {
    name: String,
    id: NodeId,
    text: String,
}

/// Parse XML text into an order-preserving [`Document`].
///
/// The XML declaration is kept verbatim; comments, processing instructions
/// and DOCTYPE are dropped. Text and attribute values are stored raw.
pub fn parse(text: &str) -> Result<Document> {
    let mut reader = Reader::from_str(text);
    let mut doc = Document::empty();
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut root: Option<NodeId> = None;

    loop {
        let start_pos = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(|e| {
            TrackAltError::parse(format!("{e} (at byte {})", reader.error_position()))
        })?;

        match event {
            Event::Decl(_) => {
                let end_pos = reader.buffer_position() as usize;
                let raw = text.get(start_pos..end_pos).map(str::trim);
                doc.set_declaration(raw.map(String::from));
            }
            Event::Start(e) => {
                ensure_single_root(root, &stack)?;
                let (name, id) = open_element(&mut doc, &e)?;
                stack.push(OpenElement {
                    name,
                    id,
                    text: String::new(),
                });
            }
            Event::Empty(e) => {
                ensure_single_root(root, &stack)?;
                let (name, id) = open_element(&mut doc, &e)?;
                close_element(
                    &mut doc,
                    &stack,
                    &mut root,
                    OpenElement {
                        name,
                        id,
                        text: String::new(),
                    },
                )?;
            }
            Event::End(e) => {
                let name = utf8(e.name().as_ref())?.to_string();
                let open = stack.pop().ok_or_else(|| {
                    TrackAltError::parse(format!("unexpected end tag </{name}>"))
                })?;
                if open.name != name {
                    return Err(TrackAltError::parse(format!(
                        "end tag </{name}> does not match <{}>",
                        open.name
                    )));
                }
                close_element(&mut doc, &stack, &mut root, open)?;
            }
            Event::Text(e) => push_text(&mut stack, utf8(e.as_ref())?)?,
            Event::GeneralRef(e) => {
                let name = utf8(e.as_ref())?;
                push_text(&mut stack, &format!("&{name};"))?;
            }
            Event::CData(e) => {
                let content = utf8(e.as_ref())?;
                push_text(&mut stack, &format!("<![CDATA[{content}]]>"))?;
            }
            Event::Eof => break,
            // Comments, processing instructions, DOCTYPE.
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(TrackAltError::parse(format!(
            "unterminated element <{}>",
            open.name
        )));
    }
    if root.is_none() {
        return Err(TrackAltError::parse("document has no root element"));
    }

    debug!(nodes = doc.node_count(), root = doc.root_name(), "parsed markup");
    Ok(doc)
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes)
        .map_err(|e| TrackAltError::parse(format!("invalid UTF-8 in markup: {e}")))
}

fn ensure_single_root(root: Option<NodeId>, stack: &[OpenElement]) -> Result<()> {
    if root.is_some() && stack.is_empty() {
        return Err(TrackAltError::parse("multiple root elements"));
    }
    Ok(())
}

/// Allocate an element node holding the start tag's attributes, in order.
fn open_element(doc: &mut Document, start: &BytesStart<'_>) -> Result<(String, NodeId)> {
    let name = utf8(start.name().as_ref())?.to_string();
    let id = doc.alloc(MarkupNode::Element(Element::default()));

    for attr in start.attributes() {
        let attr = attr.map_err(|e| TrackAltError::parse(format!("in <{name}>: {e}")))?;
        let key = utf8(attr.key.as_ref())?;
        let value = utf8(&attr.value)?.to_string();
        let node = doc.alloc(MarkupNode::Scalar(value));
        doc.push_field(id, key, FieldKind::Attribute, node)
            .map_err(|dup| duplicate_field(&name, &dup))?;
    }

    Ok((name, id))
}

/// Finish an element and attach it to its parent, or make it the root.
fn close_element(
    doc: &mut Document,
    stack: &[OpenElement],
    root: &mut Option<NodeId>,
    open: OpenElement,
) -> Result<()> {
    let has_fields = doc
        .element(open.id)
        .is_some_and(|el| !el.fields().is_empty());

    if has_fields {
        // Whitespace around child elements is formatting, not content.
        let trimmed = open.text.trim();
        let text = (!trimmed.is_empty()).then(|| trimmed.to_string());
        if let Some(el) = doc.element_mut(open.id) {
            el.set_text(text);
        }
    } else if !open.text.is_empty() {
        doc.replace(open.id, MarkupNode::Scalar(open.text));
    }

    match stack.last() {
        Some(parent) => doc
            .push_field(parent.id, &open.name, FieldKind::Child, open.id)
            .map_err(|dup| duplicate_field(&parent.name, &dup)),
        None => {
            doc.set_root(open.id, open.name);
            *root = Some(open.id);
            Ok(())
        }
    }
}

fn push_text(stack: &mut [OpenElement], raw: &str) -> Result<()> {
    match stack.last_mut() {
        Some(open) => {
            open.text.push_str(raw);
            Ok(())
        }
        None if raw.trim().is_empty() => Ok(()),
        None => Err(TrackAltError::parse(format!(
            "character data outside the root element: {:?}",
            raw.trim()
        ))),
    }
}

fn duplicate_field(element: &str, field: &str) -> TrackAltError {
    TrackAltError::parse(format!(
        "<{element}> has both an attribute and a child element named '{field}'"
    ))
}
