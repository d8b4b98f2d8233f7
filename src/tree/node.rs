//! Node type definitions.
//!
//! The `NodeKind` enum represents every node type the sorter can meet in a
//! document tree. Each variant carries the node-type-specific payload;
//! navigation links live in `NodeData`.

use super::NodeId;

/// The kind of an XML node and its associated data.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The document node. There is exactly one per `Document`.
    Document,

    /// An element node, e.g., `<item id="3">`.
    Element {
        /// The qualified name as written in the source.
        name: String,
        /// Attribute nodes in source order. Each is an `Attribute` node whose
        /// `owner` is this element.
        attributes: Vec<NodeId>,
    },

    /// An attribute node. Attributes are not children of their element;
    /// they are reachable through the element's `attributes` list.
    Attribute {
        /// The qualified name as written in the source.
        name: String,
        /// The normalized attribute value.
        value: String,
    },

    /// A text node containing character data.
    Text {
        /// The text content (character and entity references resolved).
        content: String,
    },

    /// A CDATA section, e.g., `<![CDATA[...]]>`.
    CData {
        /// The CDATA content (no escaping applied).
        content: String,
    },

    /// A comment node, e.g., `<!-- ... -->`.
    Comment {
        /// The comment text without the `<!--` and `-->` delimiters.
        content: String,
    },

    /// A processing instruction, e.g., `<?target data?>`.
    ProcessingInstruction {
        /// The PI target.
        target: String,
        /// The PI data, if any.
        data: Option<String>,
    },

    /// A document type declaration, e.g., `<!DOCTYPE catalog [...]>`.
    DocumentType {
        /// The root element name declared in the DOCTYPE.
        name: String,
        /// The SYSTEM identifier, if any.
        system_id: Option<String>,
        /// The PUBLIC identifier, if any.
        public_id: Option<String>,
        /// The internal subset text between `[` and `]`, kept verbatim.
        internal_subset: Option<String>,
    },
}

impl NodeKind {
    /// Returns the DOM node-type number for this kind.
    ///
    /// These numbers define the fixed order used when nodes of different
    /// kinds are compared: elements first, then attributes, text, CDATA,
    /// processing instructions, comments, documents and doctypes.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            Self::Element { .. } => 1,
            Self::Attribute { .. } => 2,
            Self::Text { .. } => 3,
            Self::CData { .. } => 4,
            Self::ProcessingInstruction { .. } => 7,
            Self::Comment { .. } => 8,
            Self::Document => 9,
            Self::DocumentType { .. } => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes_follow_dom_numbering() {
        let kinds = [
            NodeKind::Element {
                name: "a".to_string(),
                attributes: Vec::new(),
            },
            NodeKind::Attribute {
                name: "id".to_string(),
                value: "1".to_string(),
            },
            NodeKind::Text {
                content: String::new(),
            },
            NodeKind::CData {
                content: String::new(),
            },
            NodeKind::ProcessingInstruction {
                target: "pi".to_string(),
                data: None,
            },
            NodeKind::Comment {
                content: String::new(),
            },
            NodeKind::Document,
        ];
        let codes: Vec<u16> = kinds.iter().map(NodeKind::code).collect();
        assert_eq!(codes, vec![1, 2, 3, 4, 7, 8, 9]);
    }
}
