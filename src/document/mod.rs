//! Document layer - tree model, builder, XML codec, file store
//!
//! ```text
//! rows → build() → Document → write_document() → 1.xml
//!                                   read_document() ← 1.xml / 2.xml
//! ```

pub mod builder;
pub mod codec;
pub mod model;
pub mod store;

pub use builder::{build, ENTRY_ELEMENT, FIELD_NAME, ROOT_ELEMENT};
pub use codec::{read_document, to_xml_string, write_document};
pub use model::{Document, Element, Node};
pub use store::DocumentStore;
