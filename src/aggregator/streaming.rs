//! Forward-only aggregation
//!
//! Holds one event at a time; the document tree is never built.

use super::{accumulate, parse_value};
use crate::document::{ENTRY_ELEMENT, FIELD_NAME};
use crate::error::{PipelineError, PipelineResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::BufRead;

/// Sum the `field` attribute of every `entry` element
pub fn sum_streaming<R: BufRead>(input: R) -> PipelineResult<i64> {
    sum_streaming_with(input, ENTRY_ELEMENT, FIELD_NAME)
}

/// Sum the `attribute` of every `element`, wherever it appears
pub(crate) fn sum_streaming_with<R: BufRead>(
    input: R,
    element: &str,
    attribute: &str,
) -> PipelineResult<i64> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut total: i64 = 0;
    let mut matched: usize = 0;
    let mut depth: usize = 0;
    let mut seen_root = false;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            PipelineError::Parse(format!("at byte {}: {}", reader.buffer_position(), e))
        })?;

        match event {
            Event::Start(e) => {
                if depth == 0 && seen_root {
                    return Err(PipelineError::Parse("multiple root elements".to_string()));
                }
                seen_root = true;
                depth += 1;
                if e.name().as_ref() == element.as_bytes() {
                    matched += 1;
                    total = accumulate(total, value_of(&e, element, attribute, matched)?)?;
                }
            }
            Event::Empty(e) => {
                if depth == 0 && seen_root {
                    return Err(PipelineError::Parse("multiple root elements".to_string()));
                }
                seen_root = true;
                if e.name().as_ref() == element.as_bytes() {
                    matched += 1;
                    total = accumulate(total, value_of(&e, element, attribute, matched)?)?;
                }
            }
            Event::End(_) => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    PipelineError::Parse("closing tag without matching start".to_string())
                })?;
            }
            Event::Text(e) if depth == 0 => {
                let text = e
                    .unescape()
                    .map_err(|e| PipelineError::Parse(e.to_string()))?;
                reject_outside_root(&text)?;
            }
            Event::CData(e) if depth == 0 => {
                reject_outside_root(&String::from_utf8_lossy(&e))?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if depth != 0 {
        return Err(PipelineError::Parse(format!(
            "document ended with {} unclosed element(s)",
            depth
        )));
    }
    if !seen_root {
        return Err(PipelineError::Parse("document has no root element".to_string()));
    }

    log::debug!("🌊 Streaming pass: {} <{}> elements, sum={}", matched, element, total);
    Ok(total)
}

fn reject_outside_root(text: &str) -> PipelineResult<()> {
    if text.trim().is_empty() {
        Ok(())
    } else {
        Err(PipelineError::Parse(format!(
            "text outside root element: {:?}",
            text
        )))
    }
}

fn value_of(
    start: &BytesStart<'_>,
    element: &str,
    attribute: &str,
    ordinal: usize,
) -> PipelineResult<i64> {
    let mut attributes = 0usize;

    for attr in start.attributes() {
        let attr = attr.map_err(|e| PipelineError::Parse(e.to_string()))?;
        attributes += 1;
        if attr.key.as_ref() == attribute.as_bytes() {
            let raw = attr
                .unescape_value()
                .map_err(|e| PipelineError::Parse(e.to_string()))?;
            return parse_value(&raw);
        }
    }

    if attributes == 0 {
        Err(PipelineError::Parse(format!(
            "<{}> #{} has no attributes",
            element, ordinal
        )))
    } else {
        Err(PipelineError::Parse(format!(
            "<{}> #{} has no '{}' attribute",
            element, ordinal, attribute
        )))
    }
}
