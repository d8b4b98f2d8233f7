//! Tree-building XML parser.
//!
//! Recursive descent over [`ParserInput`], appending nodes to a fresh
//! [`Document`] as they are recognized.

use crate::error::ParseError;
use crate::tree::{Document, NodeId, NodeKind};

use super::input::{
    parse_cdata_content, parse_comment_content, parse_pi_content, parse_xml_decl, ParserInput,
};
use super::ParseOptions;

/// The core XML parser.
pub(crate) struct XmlParser<'a> {
    input: ParserInput<'a>,
    doc: Document,
    no_blanks: bool,
    max_attributes: u32,
}

impl<'a> XmlParser<'a> {
    pub fn new(input: &'a str, options: &ParseOptions) -> Self {
        Self {
            input: ParserInput::new(input, options),
            doc: Document::new(),
            no_blanks: options.no_blanks,
            max_attributes: options.max_attributes,
        }
    }

    /// Parses the entire document.
    pub fn parse(mut self) -> Result<Document, ParseError> {
        // The XML declaration must be the very first thing in the document.
        if self.looking_at_xml_decl() {
            let decl = parse_xml_decl(&mut self.input)?;
            self.doc.version = Some(decl.version);
            self.doc.encoding = decl.encoding;
            self.doc.standalone = decl.standalone;
        } else if self.input.skip_whitespace() && self.looking_at_xml_decl() {
            return Err(self
                .input
                .fatal("XML declaration must be at the start of the document"));
        }

        let root = self.doc.root();
        self.parse_misc(root)?;

        if self.input.looking_at(b"<!DOCTYPE") {
            self.parse_doctype(root)?;
            self.parse_misc(root)?;
        }

        if self.input.peek() == Some(b'<')
            && self
                .input
                .peek_at(1)
                .is_some_and(|b| b != b'!' && b != b'?')
        {
            self.parse_element(root)?;
        } else {
            return Err(self.input.fatal("missing root element"));
        }

        self.parse_misc(root)?;
        if !self.input.at_end() {
            return Err(self.input.fatal("content after document element"));
        }

        Ok(self.doc)
    }

    fn looking_at_xml_decl(&self) -> bool {
        self.input.looking_at(b"<?xml")
            && matches!(self.input.peek_at(5), Some(b' ' | b'\t' | b'\r' | b'\n'))
    }

    // --- Misc (comments, PIs, whitespace outside the root element) ---

    fn parse_misc(&mut self, parent: NodeId) -> Result<(), ParseError> {
        loop {
            self.input.skip_whitespace();
            if self.input.looking_at(b"<!--") {
                self.parse_comment(parent)?;
            } else if self.input.looking_at(b"<?") {
                self.parse_processing_instruction(parent)?;
            } else {
                return Ok(());
            }
        }
    }

    // --- DOCTYPE Declaration ---
    // See XML 1.0 §2.8: [28] doctypedecl

    fn parse_doctype(&mut self, parent: NodeId) -> Result<(), ParseError> {
        self.input.expect_str(b"<!DOCTYPE")?;
        self.input.skip_whitespace_required()?;
        let name = self.input.parse_name()?;
        self.input.skip_whitespace();

        let mut system_id = None;
        let mut public_id = None;
        if self.input.looking_at(b"SYSTEM") {
            self.input.expect_str(b"SYSTEM")?;
            self.input.skip_whitespace_required()?;
            system_id = Some(self.input.parse_quoted_value()?);
            self.input.skip_whitespace();
        } else if self.input.looking_at(b"PUBLIC") {
            self.input.expect_str(b"PUBLIC")?;
            self.input.skip_whitespace_required()?;
            public_id = Some(self.input.parse_quoted_value()?);
            self.input.skip_whitespace_required()?;
            system_id = Some(self.input.parse_quoted_value()?);
            self.input.skip_whitespace();
        }

        let internal_subset = if self.input.peek() == Some(b'[') {
            let subset = self.scan_internal_subset()?;
            self.input.skip_whitespace();
            Some(subset)
        } else {
            None
        };

        self.input.expect_byte(b'>')?;

        let doctype = self.doc.create_node(NodeKind::DocumentType {
            name,
            system_id,
            public_id,
            internal_subset,
        });
        self.doc.append_child(parent, doctype);
        Ok(())
    }

    /// Consumes `[ ... ]` and returns the text between the brackets.
    ///
    /// Declarations are not interpreted. Quoted strings and comments are
    /// skipped so that brackets inside them do not end the subset early.
    fn scan_internal_subset(&mut self) -> Result<String, ParseError> {
        self.input.expect_byte(b'[')?;
        let start = self.input.pos();
        loop {
            if self.input.at_end() {
                return Err(self
                    .input
                    .fatal("unexpected end of input in internal subset"));
            }
            if self.input.looking_at(b"<!--") {
                parse_comment_content(&mut self.input)?;
                continue;
            }
            match self.input.peek() {
                Some(b']') => break,
                Some(b'"' | b'\'') => {
                    self.input.parse_quoted_value()?;
                }
                _ => {
                    self.input.next_char()?;
                }
            }
        }
        let subset = self.input.slice(start, self.input.pos()).to_string();
        self.input.advance(1);
        Ok(subset)
    }

    // --- Elements ---
    // See XML 1.0 §3.1: [40] STag, [42] ETag, [44] EmptyElemTag

    fn parse_element(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        self.input.enter_element()?;
        self.input.expect_byte(b'<')?;
        let name = self.input.parse_name()?;
        let elem = self.doc.create_element(&name);
        self.doc.append_child(parent, elem);

        let mut count: u32 = 0;
        loop {
            let had_ws = self.input.skip_whitespace();
            if self.input.peek() == Some(b'>') || self.input.looking_at(b"/>") {
                break;
            }
            if !had_ws {
                return Err(self.input.fatal("whitespace required between attributes"));
            }
            count += 1;
            if count > self.max_attributes {
                return Err(self.input.fatal(format!(
                    "too many attributes on <{name}> (maximum {})",
                    self.max_attributes
                )));
            }
            self.parse_attribute(elem)?;
        }

        if self.input.looking_at(b"/>") {
            self.input.advance(2);
            self.input.leave_element();
            return Ok(elem);
        }
        self.input.expect_byte(b'>')?;

        self.parse_content(elem)?;

        self.input.expect_str(b"</")?;
        let end_name = self.input.parse_name()?;
        if end_name != name {
            return Err(self.input.fatal(format!(
                "mismatched end tag: expected </{name}>, found </{end_name}>"
            )));
        }
        self.input.skip_whitespace();
        self.input.expect_byte(b'>')?;
        self.input.leave_element();

        Ok(elem)
    }

    // --- Attributes ---
    // See XML 1.0 §3.1: [41] Attribute

    fn parse_attribute(&mut self, elem: NodeId) -> Result<(), ParseError> {
        let name = self.input.parse_name()?;
        if self.doc.attribute(elem, &name).is_some() {
            return Err(self.input.fatal(format!("duplicate attribute: '{name}'")));
        }
        self.input.skip_whitespace();
        self.input.expect_byte(b'=')?;
        self.input.skip_whitespace();
        let value = self.input.parse_attribute_value()?;
        self.doc.add_attribute(elem, &name, &value);
        Ok(())
    }

    // --- Content ---
    // See XML 1.0 §3.1: [43] content

    fn parse_content(&mut self, parent: NodeId) -> Result<(), ParseError> {
        loop {
            if self.input.at_end() {
                return Err(self
                    .input
                    .fatal("unexpected end of input in element content"));
            }
            if self.input.looking_at(b"</") {
                return Ok(());
            }

            if self.input.looking_at(b"<![CDATA[") {
                let content = parse_cdata_content(&mut self.input)?;
                let cdata = self.doc.create_node(NodeKind::CData { content });
                self.doc.append_child(parent, cdata);
            } else if self.input.looking_at(b"<!--") {
                self.parse_comment(parent)?;
            } else if self.input.looking_at(b"<?") {
                self.parse_processing_instruction(parent)?;
            } else if self.input.peek() == Some(b'<') {
                self.parse_element(parent)?;
            } else {
                self.parse_char_data(parent)?;
            }
        }
    }

    // --- Character Data ---
    // See XML 1.0 §2.4: [14] CharData

    fn parse_char_data(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let mut text = String::new();

        while let Some(b) = self.input.peek() {
            match b {
                b'<' => break,
                b'&' => text.push(self.input.parse_reference()?),
                b']' if self.input.looking_at(b"]]>") => {
                    return Err(self.input.fatal("']]>' not allowed in character data"));
                }
                _ => text.push(self.input.next_char()?),
            }
        }

        if text.is_empty() || (self.no_blanks && text.chars().all(char::is_whitespace)) {
            return Ok(());
        }
        let text_id = self.doc.create_node(NodeKind::Text { content: text });
        self.doc.append_child(parent, text_id);
        Ok(())
    }

    fn parse_comment(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let content = parse_comment_content(&mut self.input)?;
        let comment = self.doc.create_node(NodeKind::Comment { content });
        self.doc.append_child(parent, comment);
        Ok(())
    }

    fn parse_processing_instruction(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let (target, data) = parse_pi_content(&mut self.input)?;
        let pi = self
            .doc
            .create_node(NodeKind::ProcessingInstruction { target, data });
        self.doc.append_child(parent, pi);
        Ok(())
    }
}
