//! XML serialization for `Document` (quick-xml)
//!
//! Output is UTF-8, indented by two spaces, with a standalone declaration.
//! Parsing drops whitespace-only text between elements.

use super::model::{Document, Element, Node};
use crate::error::{PipelineError, PipelineResult};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::{BufRead, Write};

const INDENT_SIZE: usize = 2;

/// Serialize `doc` into `out`
pub fn write_document<W: Write>(out: W, doc: &Document) -> PipelineResult<()> {
    let mut writer = Writer::new_with_indent(out, b' ', INDENT_SIZE);

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))),
    )?;
    write_element(&mut writer, &doc.root)?;

    writer
        .get_mut()
        .write_all(b"\n")
        .map_err(|e| PipelineError::Encoding(e.to_string()))
}

/// Serialize `doc` into an owned string
pub fn to_xml_string(doc: &Document) -> PipelineResult<String> {
    let mut out = Vec::new();
    write_document(&mut out, doc)?;
    String::from_utf8(out).map_err(|e| PipelineError::Encoding(e.to_string()))
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> PipelineResult<()> {
    check_name(&element.name)?;

    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        check_name(key)?;
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        return emit(writer, Event::Empty(start));
    }

    emit(writer, Event::Start(start))?;
    for child in &element.children {
        match child {
            Node::Element(e) => write_element(writer, e)?,
            Node::Text(t) => emit(writer, Event::Text(BytesText::new(t)))?,
        }
    }
    emit(writer, Event::End(BytesEnd::new(element.name.as_str())))
}

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> PipelineResult<()> {
    writer
        .write_event(event)
        .map_err(|e| PipelineError::Encoding(e.to_string()))
}

/// Element and attribute names accepted by both the writer and path queries
pub(crate) fn is_xml_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.')
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

fn check_name(name: &str) -> PipelineResult<()> {
    if is_xml_name(name) {
        Ok(())
    } else {
        Err(PipelineError::Encoding(format!("invalid XML name {:?}", name)))
    }
}

/// Parse a whole document into memory
pub fn read_document<R: BufRead>(input: R) -> PipelineResult<Document> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if stack.is_empty() && root.is_some() {
                    return Err(PipelineError::Parse("multiple root elements".to_string()));
                }
                stack.push(element_from(&e)?);
            }
            Ok(Event::Empty(e)) => {
                let element = element_from(&e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(e)) => {
                let element = stack.pop().ok_or_else(|| {
                    PipelineError::Parse(format!(
                        "unexpected closing tag </{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    ))
                })?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| PipelineError::Parse(e.to_string()))?;
                push_text(&mut stack, &text)?;
            }
            Ok(Event::CData(e)) => {
                let text = std::str::from_utf8(&e)
                    .map_err(|e| PipelineError::Parse(e.to_string()))?
                    .to_string();
                push_text(&mut stack, &text)?;
            }
            Ok(Event::Eof) => break,
            // Declaration, comments, processing instructions, doctype
            Ok(_) => {}
            Err(e) => {
                return Err(PipelineError::Parse(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(PipelineError::Parse(format!("unclosed element <{}>", open.name)));
    }

    root.map(Document::new)
        .ok_or_else(|| PipelineError::Parse("document has no root element".to_string()))
}

fn element_from(start: &BytesStart<'_>) -> PipelineResult<Element> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| PipelineError::Parse(e.to_string()))?
        .to_string();

    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| PipelineError::Parse(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| PipelineError::Parse(e.to_string()))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| PipelineError::Parse(e.to_string()))?
            .into_owned();
        element.attributes.push((key, value));
    }

    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> PipelineResult<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_some() => {
            return Err(PipelineError::Parse("multiple root elements".to_string()))
        }
        None => *root = Some(element),
    }
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str) -> PipelineResult<()> {
    if text.trim().is_empty() {
        return Ok(());
    }
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Text(text.to_string()));
            Ok(())
        }
        None => Err(PipelineError::Parse(format!(
            "text outside root element: {:?}",
            text
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::builder::build;

    #[test]
    fn test_source_document_layout() {
        let xml = to_xml_string(&build(&[1, 2])).unwrap();

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#));
        assert!(xml.contains("\n<entries>\n"));
        assert!(xml.contains("\n  <entry>\n    <field>1</field>\n  </entry>\n"));
        assert!(xml.ends_with("</entries>\n"));
    }

    #[test]
    fn test_empty_root_is_self_closing() {
        let xml = to_xml_string(&build(&[])).unwrap();
        assert!(xml.contains("<entries/>"));
    }

    #[test]
    fn test_read_back_matches_built_tree() {
        let doc = build(&[4, 8, 15, 16, 23, 42]);
        let xml = to_xml_string(&doc).unwrap();

        let parsed = read_document(xml.as_bytes()).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_attribute_values_are_escaped() {
        let doc = Document::new(Element::new("entries").with_attribute("note", "a<b & \"c\""));
        let xml = to_xml_string(&doc).unwrap();

        assert!(!xml.contains("a<b"));
        let parsed = read_document(xml.as_bytes()).unwrap();
        assert_eq!(parsed.root.attribute("note"), Some("a<b & \"c\""));
    }

    #[test]
    fn test_invalid_name_is_encoding_error() {
        let doc = Document::new(Element::new("entries").with_child(Element::new("1bad")));
        assert!(matches!(to_xml_string(&doc), Err(PipelineError::Encoding(_))));
    }

    #[test]
    fn test_xml_name_rules() {
        for name in ["entry", "_x", "ns:field", "a-b.c", "é1"] {
            assert!(is_xml_name(name), "{:?} should be accepted", name);
        }
        for name in ["", "1entry", "-x", ".x", "ent ry", "a/b", "@field"] {
            assert!(!is_xml_name(name), "{:?} should be rejected", name);
        }
    }

    #[test]
    fn test_unclosed_tag_is_parse_error() {
        let err = read_document("<entries><entry>".as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
    }

    #[test]
    fn test_mismatched_tag_is_parse_error() {
        let err = read_document("<entries><entry></entries>".as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
    }

    #[test]
    fn test_empty_input_has_no_root() {
        let err = read_document("".as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
    }
}
