//! Rows → `entries/entry/field` document

use super::model::{Document, Element};

pub const ROOT_ELEMENT: &str = "entries";
pub const ENTRY_ELEMENT: &str = "entry";
pub const FIELD_NAME: &str = "field";

/// Build the pre-transform document: one `<entry><field>v</field></entry>` per row, in row order
pub fn build(rows: &[i64]) -> Document {
    let root = rows.iter().fold(Element::new(ROOT_ELEMENT), |root, value| {
        root.with_child(
            Element::new(ENTRY_ELEMENT)
                .with_child(Element::new(FIELD_NAME).with_text(value.to_string())),
        )
    });

    log::debug!("🧱 Built document with {} entries", rows.len());
    Document::new(root)
}
