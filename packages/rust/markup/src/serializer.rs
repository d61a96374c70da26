//! [`Document`] → XML text.

use std::borrow::Cow;

use quick_xml::Writer;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;

use trackalt_shared::{Result, TrackAltError};

use crate::tree::{Document, FieldKind, MarkupNode, NodeId};

/// Declaration prepended when the rendered document has none.
pub const DEFAULT_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Render a document back to XML with two-space indentation.
///
/// Attributes go in the start tag and children follow in field order; group
/// members are written as consecutive siblings. Raw values are written as-is.
pub fn serialize(doc: &Document) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_node(&mut writer, doc, doc.root_name(), doc.root())?;

    let body = String::from_utf8(writer.into_inner())
        .map_err(|e| TrackAltError::Serialize(format!("rendered markup is not UTF-8: {e}")))?;

    let declaration = doc.declaration().unwrap_or(DEFAULT_DECLARATION);
    Ok(ensure_declaration(format!("{declaration}\n{body}\n")))
}

/// Prepend [`DEFAULT_DECLARATION`] unless `text` already starts with one.
pub fn ensure_declaration(text: String) -> String {
    if text.trim_start().starts_with("<?xml") {
        text
    } else {
        format!("{DEFAULT_DECLARATION}\n{text}")
    }
}

fn write_node(writer: &mut Writer<Vec<u8>>, doc: &Document, name: &str, id: NodeId) -> Result<()> {
    match doc.node(id) {
        MarkupNode::Scalar(text) if text.is_empty() => emit(writer, Event::Empty(BytesStart::new(name))),
        MarkupNode::Scalar(text) => {
            emit(writer, Event::Start(BytesStart::new(name)))?;
            emit(writer, Event::Text(BytesText::from_escaped(text.as_str())))?;
            emit(writer, Event::End(BytesEnd::new(name)))
        }
        MarkupNode::Element(el) => {
            let mut start = BytesStart::new(name);
            for field in el.attributes() {
                let value = doc.scalar(field.node).unwrap_or_default();
                start.push_attribute(Attribute {
                    key: QName(field.name.as_bytes()),
                    value: attribute_value(value),
                });
            }

            if el.children().next().is_none() && el.text().is_none() {
                return emit(writer, Event::Empty(start));
            }

            emit(writer, Event::Start(start))?;
            if let Some(text) = el.text() {
                emit(writer, Event::Text(BytesText::from_escaped(text)))?;
            }
            for field in el.fields().iter().filter(|f| f.kind == FieldKind::Child) {
                write_node(writer, doc, &field.name, field.node)?;
            }
            emit(writer, Event::End(BytesEnd::new(name)))
        }
        MarkupNode::Group(members) => {
            for member in members {
                write_node(writer, doc, name, *member)?;
            }
            Ok(())
        }
    }
}

/// Values from single-quoted source attributes may hold a bare `"`.
fn attribute_value(raw: &str) -> Cow<'_, [u8]> {
    if raw.contains('"') {
        Cow::Owned(raw.replace('"', "&quot;").into_bytes())
    } else {
        Cow::Borrowed(raw.as_bytes())
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| TrackAltError::Serialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    const TRACK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test">
  <metadata>
    <name>Morning &amp; Ride</name>
  </metadata>
  <trk>
    <trkseg>
      <trkpt lat="48.1000" lon="11.50">
        <time>2024-05-01T10:00:00Z</time>
      </trkpt>
      <trkpt lat="48.2" lon="11.6"/>
    </trkseg>
  </trk>
</gpx>
"#;

    #[test]
    fn roundtrip_is_structurally_identical() {
        let doc = parse(TRACK).unwrap();
        let text = serialize(&doc).unwrap();
        let reparsed = parse(&text).unwrap();
        assert_eq!(doc, reparsed);
    }

    #[test]
    fn roundtrip_keeps_tokens_and_entities() {
        let text = serialize(&parse(TRACK).unwrap()).unwrap();
        assert!(text.contains(r#"<trkpt lat="48.1000" lon="11.50">"#));
        assert!(text.contains("<name>Morning &amp; Ride</name>"));
        assert!(text.contains(r#"<trkpt lat="48.2" lon="11.6"/>"#));
    }

    #[test]
    fn rendering_is_a_fixpoint() {
        let once = serialize(&parse(TRACK).unwrap()).unwrap();
        let twice = serialize(&parse(&once).unwrap()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn mixed_content_reaches_a_fixpoint() {
        let source = "<desc>\n  hello\n  <b>x</b>\n</desc>";
        let once = serialize(&parse(source).unwrap()).unwrap();
        let twice = serialize(&parse(&once).unwrap()).unwrap();
        assert_eq!(once, twice);
        assert!(once.contains("hello"));
        assert!(once.contains("<b>x</b>"));
    }

    #[test]
    fn interleaved_siblings_render_grouped() {
        let text = serialize(&parse(r#"<gpx><wpt n="1"/><trk/><wpt n="3"/></gpx>"#).unwrap()).unwrap();
        let first = text.find(r#"<wpt n="1"/>"#).unwrap();
        let third = text.find(r#"<wpt n="3"/>"#).unwrap();
        let trk = text.find("<trk/>").unwrap();
        assert!(first < third && third < trk);
    }

    #[test]
    fn keeps_source_declaration() {
        let doc = parse(r#"<?xml version="1.0" standalone="yes"?><gpx/>"#).unwrap();
        let text = serialize(&doc).unwrap();
        assert!(text.starts_with(r#"<?xml version="1.0" standalone="yes"?>"#));
    }

    #[test]
    fn prepends_declaration_when_missing() {
        let doc = parse(r#"<gpx version="1.1"><trk/></gpx>"#).unwrap();
        let text = serialize(&doc).unwrap();
        assert!(text.starts_with(DEFAULT_DECLARATION));
        assert_eq!(text.matches("<?xml").count(), 1);
    }

    #[test]
    fn ensure_declaration_leaves_existing_alone() {
        let text = format!("{DEFAULT_DECLARATION}\n<gpx/>");
        assert_eq!(ensure_declaration(text.clone()), text);
        assert!(ensure_declaration("<gpx/>".into()).starts_with("<?xml"));
    }

    #[test]
    fn escapes_double_quote_from_single_quoted_attribute() {
        let doc = parse(r#"<wpt name='say "hi"'/>"#).unwrap();
        let text = serialize(&doc).unwrap();
        assert!(text.contains(r#"name="say &quot;hi&quot;""#));
        assert!(parse(&text).is_ok());
    }

    #[test]
    fn mutated_field_is_rendered() {
        let mut doc = parse(r#"<trkpt lat="1" lon="2"><time>t</time></trkpt>"#).unwrap();
        let root = doc.root();
        doc.set_scalar_field(root, "ele", FieldKind::Child, "12.5");
        let text = serialize(&doc).unwrap();
        let ele = text.find("<ele>12.5</ele>").expect("ele rendered");
        let time = text.find("<time>t</time>").expect("time rendered");
        assert!(ele < time);
    }
}
