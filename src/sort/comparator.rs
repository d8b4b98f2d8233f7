//! Sibling ordering by `XPath`-derived sort keys.

use std::cmp::Ordering;

use tracing::{debug, trace};

use super::NodeComparator;
use crate::error::Error;
use crate::tree::{Document, NodeId, NodeKind};
use crate::xpath::{self, XPathExpr};

/// Orders siblings by keys selected with relative `XPath` expressions.
///
/// Two nodes of different kinds are ordered by their kind code (element
/// before attribute before text and so on). Otherwise each expression is
/// tried in turn until one tells the nodes apart:
///
/// - the expression is evaluated with each node as context;
/// - the first selected node, in document order, gives the key: its name
///   if it is an element, its value otherwise;
/// - the keys are compared by code point.
///
/// An expression is skipped when it fails to evaluate, selects nothing for
/// either node, does not yield a node-set, or yields a node without a value.
/// Nodes that no expression distinguishes compare equal.
///
/// # Examples
///
/// ```
/// use xmlsort::sort::{sort_subtree, ExcludeNone, PathKeyComparator, SortAll};
/// use xmlsort::{serial, Document};
///
/// let mut doc = Document::parse_str("<r><a id='2'/><a id='1'/></r>").unwrap();
/// let by_id = PathKeyComparator::new(&["@id"]).unwrap();
/// let root = doc.root();
/// sort_subtree(&mut doc, root, &SortAll, &by_id, &ExcludeNone);
/// assert!(serial::serialize(&doc).ends_with("<r><a id=\"1\"/><a id=\"2\"/></r>\n"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathKeyComparator {
    expressions: Vec<XPathExpr>,
}

impl PathKeyComparator {
    /// Compiles the sort-key expressions, highest priority first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Expression`] for the first expression that fails to
    /// compile.
    pub fn new<S: AsRef<str>>(expressions: &[S]) -> Result<Self, Error> {
        let expressions = expressions
            .iter()
            .map(|e| {
                let e = e.as_ref();
                xpath::compile(e).map_err(|source| Error::expression(e, source))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if !expressions.is_empty() {
            debug!(
                keys = ?expressions.iter().map(XPathExpr::as_str).collect::<Vec<_>>(),
                "compiled sort keys"
            );
        }
        Ok(Self { expressions })
    }

    /// Number of sort-key expressions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    /// True if there are no sort-key expressions; every pair of same-kind
    /// nodes then compares equal.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    fn key<'d>(&self, doc: &'d Document, expr: &XPathExpr, node: NodeId) -> Option<&'d str> {
        let selected = match expr.select(doc, node) {
            Ok(selected) => selected,
            Err(error) => {
                trace!(expression = %expr, %error, "sort key skipped");
                return None;
            }
        };
        let &first = selected.first()?;
        match doc.node(first).kind {
            NodeKind::Element { .. } => Some(doc.node_name(first)),
            _ => doc.node_value(first),
        }
    }
}

impl NodeComparator for PathKeyComparator {
    fn compare(&self, doc: &Document, a: NodeId, b: NodeId) -> Ordering {
        let by_kind = doc.kind_code(a).cmp(&doc.kind_code(b));
        if by_kind != Ordering::Equal {
            return by_kind;
        }

        for expr in &self.expressions {
            let (Some(key_a), Some(key_b)) = (self.key(doc, expr, a), self.key(doc, expr, b))
            else {
                continue;
            };
            match key_a.cmp(key_b) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}
