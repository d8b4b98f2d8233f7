//! # xmlsort
//!
//! Reorders the child nodes of XML documents. Siblings are sorted by tag
//! name, or by keys taken from relative `XPath` expressions, recursively
//! through the whole tree. Nodes selected by an exclusion expression can be
//! dropped before sorting.
//!
//! The crate carries everything it needs: a small XML loader, an arena
//! [`Document`] tree, an `XPath` 1.0 engine, the sorter itself and an
//! indenting serializer.
//!
//! ## Quick Start
//!
//! ```
//! use xmlsort::serial::{serialize_with_options, SerializeOptions};
//! use xmlsort::{sort, Document};
//!
//! let mut doc = Document::parse_str(
//!     "<xml><c>masg.</c><a>gast.</a><b>test.</b></xml>",
//! ).unwrap();
//! sort::sort_document(&mut doc);
//!
//! let xml = serialize_with_options(&doc, &SerializeOptions::default().indent(true));
//! assert_eq!(
//!     xml,
//!     "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
//!      <xml>\n    <a>gast.</a>\n    <b>test.</b>\n    <c>masg.</c>\n</xml>\n"
//! );
//! ```

pub mod encoding;
pub mod error;
pub mod parser;
pub mod serial;
pub mod sort;
pub mod tree;
pub mod xpath;

// Re-export primary types at the crate root for convenience.
pub use error::{Error, ParseError};
pub use tree::{Document, NodeId};
