//! Arena-based XML document tree.
//!
//! All nodes live in a contiguous `Vec<NodeData>` owned by the `Document`
//! and are referenced by `NodeId`, a newtype over `NonZeroU32`. Navigation
//! links (parent, first\_child, last\_child, next\_sibling, prev\_sibling)
//! are arena indices, so reordering children never moves node storage.
//!
//! Attributes are arena nodes as well. They are listed on their element and
//! point back to it through `owner`, but they are never part of a child
//! list and have no parent.
//!
//! Because the sorter relinks children freely, arena order says nothing
//! about document order once a tree has been mutated. Use
//! [`Document::compare_document_order`] whenever document order matters.

mod node;

pub use node::NodeKind;

use std::cmp::Ordering;
use std::num::NonZeroU32;

use crate::error::ParseError;

/// A typed index into the document's node arena.
///
/// `Option<NodeId>` has the same size as `NodeId` (niche optimization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Creates a `NodeId` from a raw arena index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is 0.
    #[allow(clippy::expect_used, clippy::cast_possible_truncation)]
    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::new(index as u32).expect("NodeId index must be non-zero"))
    }

    fn as_index(self) -> usize {
        self.0.get() as usize
    }
}

/// Storage for a single node in the document arena.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// What kind of node this is and its payload.
    pub kind: NodeKind,
    /// Parent node. `None` for the document node, for detached nodes and
    /// for attributes.
    pub parent: Option<NodeId>,
    /// The element an attribute belongs to. `None` for every other kind.
    pub owner: Option<NodeId>,
    /// First child node.
    pub first_child: Option<NodeId>,
    /// Last child node (for O(1) append).
    pub last_child: Option<NodeId>,
    /// Next sibling.
    pub next_sibling: Option<NodeId>,
    /// Previous sibling.
    pub prev_sibling: Option<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            owner: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            prev_sibling: None,
        }
    }
}

/// An XML document.
///
/// The `Document` owns all nodes in an arena. Navigation goes through
/// `&Document`, mutation through `&mut Document`.
///
/// # Examples
///
/// ```
/// use xmlsort::Document;
///
/// let doc = Document::parse_str("<root/>").unwrap();
/// let root = doc.root_element().unwrap();
/// assert_eq!(doc.node_name(root), "root");
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    /// The node arena. Index 0 is unused (placeholder for `NonZeroU32`).
    nodes: Vec<NodeData>,
    /// The document node id (not the root element).
    root: NodeId,
    /// XML version from the XML declaration (e.g., "1.0").
    pub version: Option<String>,
    /// Encoding from the XML declaration (e.g., "Shift_JIS").
    pub encoding: Option<String>,
    /// Standalone flag from the XML declaration.
    pub standalone: Option<bool>,
}

impl Document {
    /// Creates a new document containing only the document node.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(64);
        nodes.push(NodeData::new(NodeKind::Document));
        nodes.push(NodeData::new(NodeKind::Document));
        Self {
            nodes,
            root: NodeId::from_index(1),
            version: None,
            encoding: None,
            standalone: None,
        }
    }

    /// Parses an XML string into a `Document` with default options.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the input is not well-formed XML.
    pub fn parse_str(input: &str) -> Result<Self, ParseError> {
        crate::parser::parse_str(input)
    }

    /// Parses XML from raw bytes, detecting the encoding from the BOM or the
    /// XML declaration.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the bytes cannot be decoded or the resulting
    /// text is not well-formed XML.
    ///
    /// # Examples
    ///
    /// ```
    /// use xmlsort::Document;
    ///
    /// let doc = Document::parse_bytes(b"<list><b/><a/></list>").unwrap();
    /// assert_eq!(doc.node_name(doc.root_element().unwrap()), "list");
    /// ```
    pub fn parse_bytes(input: &[u8]) -> Result<Self, ParseError> {
        crate::parser::parse_bytes(input, &crate::parser::ParseOptions::default())
    }

    /// Returns the document node id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the single top-level element, if there is one.
    #[must_use]
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.root)
            .find(|&id| matches!(self.node(id).kind, NodeKind::Element { .. }))
    }

    /// Returns the `NodeData` for the given node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this document.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.as_index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.as_index()]
    }

    /// Returns the DOM node-type number of a node. See [`NodeKind::code`].
    #[must_use]
    pub fn kind_code(&self, id: NodeId) -> u16 {
        self.node(id).kind.code()
    }

    /// Returns the DOM-style name of a node.
    ///
    /// Elements and attributes return their qualified name, processing
    /// instructions their target and doctypes the declared root name. The
    /// remaining kinds return the fixed names `#text`, `#cdata-section`,
    /// `#comment` and `#document`.
    #[must_use]
    pub fn node_name(&self, id: NodeId) -> &str {
        match &self.node(id).kind {
            NodeKind::Element { name, .. }
            | NodeKind::Attribute { name, .. }
            | NodeKind::DocumentType { name, .. }
            | NodeKind::ProcessingInstruction { target: name, .. } => name,
            NodeKind::Text { .. } => "#text",
            NodeKind::CData { .. } => "#cdata-section",
            NodeKind::Comment { .. } => "#comment",
            NodeKind::Document => "#document",
        }
    }

    /// Returns the part of an element or attribute name after its prefix.
    ///
    /// Returns `None` for kinds that have no expanded name.
    #[must_use]
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { name, .. } | NodeKind::Attribute { name, .. } => {
                Some(name.rsplit_once(':').map_or(name.as_str(), |(_, local)| local))
            }
            NodeKind::ProcessingInstruction { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Returns the DOM-style value of a node.
    ///
    /// Attributes return their value; text, CDATA and comments their
    /// content; processing instructions their data. Elements, documents and
    /// doctypes have no value.
    #[must_use]
    pub fn node_value(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Attribute { value: content, .. }
            | NodeKind::Text { content }
            | NodeKind::CData { content }
            | NodeKind::Comment { content } => Some(content),
            NodeKind::ProcessingInstruction { data, .. } => Some(data.as_deref().unwrap_or("")),
            NodeKind::Element { .. } | NodeKind::Document | NodeKind::DocumentType { .. } => None,
        }
    }

    /// Returns the concatenated text of a node and all its descendants.
    ///
    /// For attributes and other leaf nodes this is the node's own value.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        match &self.node(id).kind {
            NodeKind::Element { .. } | NodeKind::Document => {
                let mut result = String::new();
                for desc in self.descendants(id) {
                    if let NodeKind::Text { content } | NodeKind::CData { content } =
                        &self.node(desc).kind
                    {
                        result.push_str(content);
                    }
                }
                result
            }
            _ => self.node_value(id).unwrap_or_default().to_string(),
        }
    }

    /// Returns the attribute nodes of an element, in source order.
    ///
    /// Returns an empty slice for non-element nodes.
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[NodeId] {
        match &self.node(id).kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Returns the value of an attribute by qualified name.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|&&attr| self.node_name(attr) == name)
            .and_then(|&attr| self.node_value(attr))
    }

    /// Returns the element an attribute belongs to.
    #[must_use]
    pub fn owner(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).owner
    }

    // --- Navigation ---

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Returns the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child
    }

    /// Returns the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).last_child
    }

    /// Returns the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next_sibling
    }

    /// Returns the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev_sibling
    }

    /// Returns an iterator over the children of a node.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.node(id).first_child,
        }
    }

    /// Returns an iterator over a node and its ancestors (walking up to the
    /// document node). An attribute's first ancestor is its owner element.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: Some(id),
        }
    }

    /// Returns an iterator over all descendants of a node (depth-first,
    /// attributes excluded).
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            root: id,
            next: self.first_child(id),
        }
    }

    fn tree_parent(&self, id: NodeId) -> Option<NodeId> {
        let data = self.node(id);
        data.parent.or(data.owner)
    }

    /// Compares two nodes by document order.
    ///
    /// An ancestor precedes its descendants; an element's attributes follow
    /// the element and precede its children. The order is derived from the
    /// current links, so it stays correct after children are reordered.
    /// Nodes in unrelated detached subtrees fall back to arena order.
    #[must_use]
    pub fn compare_document_order(&self, a: NodeId, b: NodeId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }

        let mut chain_a: Vec<NodeId> = self.ancestors(a).collect();
        let mut chain_b: Vec<NodeId> = self.ancestors(b).collect();
        chain_a.reverse();
        chain_b.reverse();

        if chain_a[0] != chain_b[0] {
            return a.cmp(&b);
        }

        let common = chain_a
            .iter()
            .zip(&chain_b)
            .take_while(|(x, y)| x == y)
            .count();

        // One node is an ancestor (or owner) of the other.
        let (Some(&x), Some(&y)) = (chain_a.get(common), chain_b.get(common)) else {
            return chain_a.len().cmp(&chain_b.len());
        };

        let parent = chain_a[common - 1];
        match (self.node(x).owner.is_some(), self.node(y).owner.is_some()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (true, true) => {
                let attrs = self.attributes(parent);
                let pos_x = attrs.iter().position(|&id| id == x);
                let pos_y = attrs.iter().position(|&id| id == y);
                pos_x.cmp(&pos_y)
            }
            (false, false) => {
                let mut sibling = self.next_sibling(x);
                while let Some(s) = sibling {
                    if s == y {
                        return Ordering::Less;
                    }
                    sibling = self.next_sibling(s);
                }
                Ordering::Greater
            }
        }
    }

    /// Ranks every node reachable from the document node in one preorder
    /// walk. An element's attributes rank right after it and before its
    /// children.
    ///
    /// Use this instead of [`compare_document_order`](Self::compare_document_order)
    /// to order many nodes at once. The ranks describe the tree as it is now
    /// and go stale once it is modified.
    #[must_use]
    pub fn document_order(&self) -> DocumentOrder {
        let mut ranks = vec![u32::MAX; self.nodes.len()];
        let mut next = 0;
        for id in std::iter::once(self.root).chain(self.descendants(self.root)) {
            ranks[id.as_index()] = next;
            next += 1;
            for &attr in self.attributes(id) {
                ranks[attr.as_index()] = next;
                next += 1;
            }
        }
        DocumentOrder { ranks }
    }

    // --- Mutation ---

    /// Allocates a new node in the arena and returns its `NodeId`.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let index = self.nodes.len();
        self.nodes.push(NodeData::new(kind));
        NodeId::from_index(index)
    }

    /// Allocates a new element with no attributes.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.create_node(NodeKind::Element {
            name: name.to_string(),
            attributes: Vec::new(),
        })
    }

    /// Adds an attribute node to an element and returns it.
    ///
    /// The caller is responsible for rejecting duplicate names. Calling this
    /// on a non-element node allocates the attribute but attaches it nowhere.
    pub fn add_attribute(&mut self, element: NodeId, name: &str, value: &str) -> NodeId {
        let attr = self.create_node(NodeKind::Attribute {
            name: name.to_string(),
            value: value.to_string(),
        });
        if let NodeKind::Element { attributes, .. } = &mut self.node_mut(element).kind {
            attributes.push(attr);
            self.node_mut(attr).owner = Some(element);
        }
        attr
    }

    /// Removes an attribute node from its owner element.
    ///
    /// Does nothing if `attr` is not attached to an element.
    pub fn remove_attribute(&mut self, attr: NodeId) {
        let Some(owner) = self.node(attr).owner else {
            return;
        };
        if let NodeKind::Element { attributes, .. } = &mut self.node_mut(owner).kind {
            attributes.retain(|&id| id != attr);
        }
        self.node_mut(attr).owner = None;
    }

    /// Appends a child node to the end of a parent's child list.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `child` already has a parent. Detach it
    /// first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            self.node(child).parent.is_none(),
            "child already has a parent; detach it first"
        );

        self.node_mut(child).parent = Some(parent);

        if let Some(last) = self.node(parent).last_child {
            self.node_mut(last).next_sibling = Some(child);
            self.node_mut(child).prev_sibling = Some(last);
            self.node_mut(parent).last_child = Some(child);
        } else {
            self.node_mut(parent).first_child = Some(child);
            self.node_mut(parent).last_child = Some(child);
        }
    }

    /// Detaches a node from its parent. The node stays allocated in the
    /// arena and keeps its own subtree.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };

        let prev = self.node(id).prev_sibling;
        let next = self.node(id).next_sibling;

        match prev {
            Some(p) => self.node_mut(p).next_sibling = next,
            None => self.node_mut(parent).first_child = next,
        }

        match next {
            Some(n) => self.node_mut(n).prev_sibling = prev,
            None => self.node_mut(parent).last_child = prev,
        }

        let data = self.node_mut(id);
        data.parent = None;
        data.prev_sibling = None;
        data.next_sibling = None;
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::str::FromStr for Document {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

/// Document-order ranks computed by [`Document::document_order`].
#[derive(Debug, Clone)]
pub struct DocumentOrder {
    ranks: Vec<u32>,
}

impl DocumentOrder {
    /// Returns the rank of `id`, or `None` if it was detached when the
    /// ranks were computed.
    #[must_use]
    pub fn rank(&self, id: NodeId) -> Option<u32> {
        self.ranks
            .get(id.as_index())
            .copied()
            .filter(|&rank| rank != u32::MAX)
    }
}

// --- Iterators ---

/// Iterator over the children of a node.
pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).next_sibling;
        Some(current)
    }
}

/// Iterator over a node and its ancestors.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.tree_parent(current);
        Some(current)
    }
}

/// Depth-first iterator over all descendants of a node.
pub struct Descendants<'a> {
    doc: &'a Document,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        if let Some(child) = self.doc.first_child(current) {
            self.next = Some(child);
            return Some(current);
        }

        if let Some(sibling) = self.doc.next_sibling(current) {
            self.next = Some(sibling);
            return Some(current);
        }

        let mut ancestor = self.doc.parent(current);
        while let Some(anc) = ancestor {
            if anc == self.root {
                break;
            }
            if let Some(sibling) = self.doc.next_sibling(anc) {
                self.next = Some(sibling);
                return Some(current);
            }
            ancestor = self.doc.parent(anc);
        }

        self.next = None;
        Some(current)
    }
}
