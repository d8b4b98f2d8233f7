//! XML serialization.
//!
//! Turns a sorted [`Document`](crate::Document) back into text. The output
//! is always UTF-8, whatever encoding the input was read from.

pub mod xml;

pub use xml::{serialize, serialize_with_options, SerializeOptions};
