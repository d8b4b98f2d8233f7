//! XML serializer.
//!
//! Writes a [`Document`] back out as UTF-8 XML text, optionally indented.

use std::fmt::Write;

use crate::tree::{Document, NodeId, NodeKind};

/// Options controlling XML serialization output.
///
/// # Examples
///
/// ```
/// use xmlsort::Document;
/// use xmlsort::serial::{serialize_with_options, SerializeOptions};
///
/// let doc = Document::parse_str("<root><child>Hello</child></root>").unwrap();
/// let xml = serialize_with_options(&doc, &SerializeOptions::default().indent(true));
/// assert!(xml.contains("\n    <child>Hello</child>\n"));
/// ```
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Whether to put element-only content on separate, indented lines.
    /// Defaults to `false`.
    pub indent: bool,
    /// The string written once per nesting level when `indent` is `true`.
    /// Defaults to four spaces.
    pub indent_str: String,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            indent: false,
            indent_str: "    ".to_owned(),
        }
    }
}

impl SerializeOptions {
    /// Enables or disables indented output.
    ///
    /// Only elements whose children are all elements, comments or
    /// processing instructions are broken onto separate lines. Anything
    /// with text content is written inline so no character data changes.
    #[must_use]
    pub fn indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the string written per nesting level.
    #[must_use]
    pub fn indent_str(mut self, s: &str) -> Self {
        self.indent_str = s.to_owned();
        self
    }
}

/// Serializes a document without indentation.
///
/// # Examples
///
/// ```
/// use xmlsort::Document;
/// use xmlsort::serial::serialize;
///
/// let doc = Document::parse_str("<root><child>Hello</child></root>").unwrap();
/// assert_eq!(
///     serialize(&doc),
///     "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root><child>Hello</child></root>\n"
/// );
/// ```
#[must_use]
pub fn serialize(doc: &Document) -> String {
    serialize_with_options(doc, &SerializeOptions::default())
}

/// Serializes a document with the given options.
///
/// The output always starts with an XML declaration carrying the source
/// version (default `1.0`), `encoding="UTF-8"` and the source `standalone`
/// flag if there was one. Each top-level node is written on its own line
/// and the output ends with a newline.
#[must_use]
pub fn serialize_with_options(doc: &Document, options: &SerializeOptions) -> String {
    let mut out = String::new();

    let version = doc.version.as_deref().unwrap_or("1.0");
    let _ = write!(out, "<?xml version=\"{version}\" encoding=\"UTF-8\"");
    if let Some(standalone) = doc.standalone {
        out.push_str(if standalone {
            " standalone=\"yes\""
        } else {
            " standalone=\"no\""
        });
    }
    out.push_str("?>\n");

    let mut writer = Writer { doc, options, out };
    for child in doc.children(doc.root()) {
        writer.write_node(child, 0);
        writer.out.push('\n');
    }
    writer.out
}

struct Writer<'a> {
    doc: &'a Document,
    options: &'a SerializeOptions,
    out: String,
}

impl Writer<'_> {
    fn write_indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push_str(&self.options.indent_str);
        }
    }

    /// True if the children of `id` may be laid out one per line: there is
    /// at least one, and none of them is character data.
    fn breaks_lines(&self, id: NodeId) -> bool {
        self.options.indent
            && self.doc.first_child(id).is_some()
            && self.doc.children(id).all(|child| {
                match &self.doc.node(child).kind {
                    NodeKind::Text { content } => is_blank(content),
                    NodeKind::CData { .. } => false,
                    _ => true,
                }
            })
    }

    fn write_node(&mut self, id: NodeId, depth: usize) {
        let doc = self.doc;
        match &doc.node(id).kind {
            NodeKind::Element { name, attributes } => {
                self.out.push('<');
                self.out.push_str(name);
                for &attr in attributes {
                    let NodeKind::Attribute { name, value } = &doc.node(attr).kind else {
                        continue;
                    };
                    self.out.push(' ');
                    self.out.push_str(name);
                    self.out.push_str("=\"");
                    write_escaped_attr(&mut self.out, value);
                    self.out.push('"');
                }

                if doc.first_child(id).is_none() {
                    self.out.push_str("/>");
                    return;
                }
                self.out.push('>');

                if self.breaks_lines(id) {
                    for child in doc.children(id) {
                        if matches!(&doc.node(child).kind, NodeKind::Text { .. }) {
                            continue;
                        }
                        self.out.push('\n');
                        self.write_indent(depth + 1);
                        self.write_node(child, depth + 1);
                    }
                    self.out.push('\n');
                    self.write_indent(depth);
                } else {
                    for child in doc.children(id) {
                        self.write_node(child, depth + 1);
                    }
                }

                self.out.push_str("</");
                self.out.push_str(name);
                self.out.push('>');
            }
            NodeKind::Text { content } => write_escaped_text(&mut self.out, content),
            NodeKind::CData { content } => {
                self.out.push_str("<![CDATA[");
                self.out.push_str(content);
                self.out.push_str("]]>");
            }
            NodeKind::Comment { content } => {
                self.out.push_str("<!--");
                self.out.push_str(content);
                self.out.push_str("-->");
            }
            NodeKind::ProcessingInstruction { target, data } => {
                self.out.push_str("<?");
                self.out.push_str(target);
                if let Some(data) = data {
                    self.out.push(' ');
                    self.out.push_str(data);
                }
                self.out.push_str("?>");
            }
            NodeKind::DocumentType {
                name,
                system_id,
                public_id,
                internal_subset,
            } => {
                self.out.push_str("<!DOCTYPE ");
                self.out.push_str(name);
                match (public_id, system_id) {
                    (Some(public_id), Some(system_id)) => {
                        let _ = write!(self.out, " PUBLIC \"{public_id}\" \"{system_id}\"");
                    }
                    (None, Some(system_id)) => {
                        let _ = write!(self.out, " SYSTEM \"{system_id}\"");
                    }
                    _ => {}
                }
                if let Some(subset) = internal_subset {
                    self.out.push_str(" [");
                    self.out.push_str(subset);
                    self.out.push(']');
                }
                self.out.push('>');
            }
            // Attributes are written with their owner; the document node
            // never appears as a child.
            NodeKind::Attribute { .. } | NodeKind::Document => {}
        }
    }
}

fn is_blank(text: &str) -> bool {
    text.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
}

/// Escapes character data: `&`, `<`, `>` and carriage returns.
fn write_escaped_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(ch),
        }
    }
}

/// Escapes an attribute value for a double-quoted attribute. Whitespace
/// other than spaces is written as character references so attribute-value
/// normalization on reload gives back the same value.
fn write_escaped_attr(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(ch),
        }
    }
}
