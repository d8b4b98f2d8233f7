//! Recursive reordering of child nodes.
//!
//! [`sort_node`] rearranges the children of a node in place. Three
//! extension points decide what happens:
//!
//! - a [`SortTarget`] says whose children get reordered,
//! - a [`NodeComparator`] orders siblings,
//! - an [`ExcludeTarget`] says which nodes are dropped from the tree once
//!   their parent has been sorted.
//!
//! Each has a named default ([`SortAll`], [`NameComparator`],
//! [`ExcludeNone`]) and is implemented for plain closures, so callers can
//! pass either.
//!
//! ```
//! use xmlsort::sort::{sort_subtree, ExcludeNone, NameComparator};
//! use xmlsort::{serial, Document, NodeId};
//!
//! let mut doc = Document::parse_str("<r><b/><a><z/><y/></a></r>").unwrap();
//! let root = doc.root();
//! // Leave the children of <a> alone.
//! let not_a = |doc: &Document, node: NodeId| doc.node_name(node) != "a";
//! sort_subtree(&mut doc, root, &not_a, &NameComparator, &ExcludeNone);
//! assert!(serial::serialize(&doc).ends_with("<r><a><z/><y/></a><b/></r>\n"));
//! ```

pub mod comparator;
mod remove;

use std::cmp::Ordering;

use tracing::debug;

use crate::error::Error;
use crate::tree::{Document, NodeId, NodeKind};

pub use comparator::PathKeyComparator;
pub use remove::remove_matches;

/// Decides whether the children of a node are reordered.
pub trait SortTarget {
    /// Returns `true` if the children of `node` should be sorted.
    fn is_sort_target(&self, doc: &Document, node: NodeId) -> bool;
}

/// Decides whether a node is dropped from the tree after its parent has
/// been sorted.
///
/// An excluded node is still visited, but its own subtree is not sorted.
pub trait ExcludeTarget {
    /// Returns `true` if `node` should be removed.
    fn is_excluded(&self, doc: &Document, node: NodeId) -> bool;
}

/// Orders two sibling nodes.
///
/// Ties return [`Ordering::Equal`] and keep their original relative order.
/// A comparator that is not a total order (such as [`PathKeyComparator`]
/// when only some siblings have a key) gives an unspecified but complete
/// ordering rather than a panic.
pub trait NodeComparator {
    /// Compares `a` with `b`.
    fn compare(&self, doc: &Document, a: NodeId, b: NodeId) -> Ordering;
}

/// Sorts the children of every node.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortAll;

impl SortTarget for SortAll {
    fn is_sort_target(&self, _doc: &Document, _node: NodeId) -> bool {
        true
    }
}

/// Excludes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExcludeNone;

impl ExcludeTarget for ExcludeNone {
    fn is_excluded(&self, _doc: &Document, _node: NodeId) -> bool {
        false
    }
}

/// Orders nodes by [`Document::node_name`], in code point order.
///
/// Text, comments and CDATA use their `#text`-style names, so they sort
/// before elements whose names start with a letter.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameComparator;

impl NodeComparator for NameComparator {
    fn compare(&self, doc: &Document, a: NodeId, b: NodeId) -> Ordering {
        doc.node_name(a).cmp(doc.node_name(b))
    }
}

impl<F> SortTarget for F
where
    F: Fn(&Document, NodeId) -> bool,
{
    fn is_sort_target(&self, doc: &Document, node: NodeId) -> bool {
        self(doc, node)
    }
}

impl<F> ExcludeTarget for F
where
    F: Fn(&Document, NodeId) -> bool,
{
    fn is_excluded(&self, doc: &Document, node: NodeId) -> bool {
        self(doc, node)
    }
}

impl<F> NodeComparator for F
where
    F: Fn(&Document, NodeId, NodeId) -> Ordering,
{
    fn compare(&self, doc: &Document, a: NodeId, b: NodeId) -> Ordering {
        self(doc, a, b)
    }
}

/// Sorts the children of `node`, and with `recurse` the children of every
/// descendant as well.
///
/// For each visited node:
///
/// 1. The current children are snapshotted.
/// 2. If `recurse` is set and `node` is not excluded, each child is sorted
///    first. This happens whether or not `node` is a sort target.
/// 3. If `node` is not a sort target, nothing else happens.
/// 4. The snapshot is stably sorted with `comparator`, every child is
///    detached, and the children are re-appended in sorted order. Children
///    that `exclude` matches (tested while still attached) are not
///    re-appended.
///
/// A document type declaration keeps its place ahead of the other
/// children of the document node so the output stays well-formed.
pub fn sort_node<S, C, E>(
    doc: &mut Document,
    node: NodeId,
    recurse: bool,
    sort_target: &S,
    comparator: &C,
    exclude: &E,
) where
    S: SortTarget + ?Sized,
    C: NodeComparator + ?Sized,
    E: ExcludeTarget + ?Sized,
{
    let children: Vec<NodeId> = doc.children(node).collect();

    if recurse && !exclude.is_excluded(doc, node) {
        for &child in &children {
            sort_node(doc, child, recurse, sort_target, comparator, exclude);
        }
    }

    if !sort_target.is_sort_target(doc, node) {
        return;
    }

    let mut sorted: Vec<NodeId> = children
        .into_iter()
        .filter(|&child| !matches!(doc.node(child).kind, NodeKind::DocumentType { .. }))
        .collect();
    merge_sort(&mut sorted, &|a, b| comparator.compare(doc, a, b));

    let excluded: Vec<bool> = sorted
        .iter()
        .map(|&child| exclude.is_excluded(doc, child))
        .collect();

    for &child in &sorted {
        doc.detach(child);
    }
    for (child, drop) in sorted.into_iter().zip(excluded) {
        if !drop {
            doc.append_child(node, child);
        }
    }
}

/// Stable top-down merge sort.
///
/// `slice::sort_by` may panic when the comparator is not a total order, so
/// siblings are merged by hand. Each merge takes from the left run unless
/// the right element is strictly smaller.
fn merge_sort(nodes: &mut [NodeId], compare: &dyn Fn(NodeId, NodeId) -> Ordering) {
    if nodes.len() < 2 {
        return;
    }
    let mid = nodes.len() / 2;
    merge_sort(&mut nodes[..mid], compare);
    merge_sort(&mut nodes[mid..], compare);
    if compare(nodes[mid - 1], nodes[mid]) != Ordering::Greater {
        return;
    }

    let left = nodes[..mid].to_vec();
    let (mut i, mut j, mut k) = (0, mid, 0);
    // Right-run elements not yet taken are already in place.
    while i < left.len() {
        if j < nodes.len() && compare(left[i], nodes[j]) == Ordering::Greater {
            nodes[k] = nodes[j];
            j += 1;
        } else {
            nodes[k] = left[i];
            i += 1;
        }
        k += 1;
    }
}

/// Sorts `node` and its whole subtree.
pub fn sort_subtree<S, C, E>(
    doc: &mut Document,
    node: NodeId,
    sort_target: &S,
    comparator: &C,
    exclude: &E,
) where
    S: SortTarget + ?Sized,
    C: NodeComparator + ?Sized,
    E: ExcludeTarget + ?Sized,
{
    sort_node(doc, node, true, sort_target, comparator, exclude);
}

/// Sorts every node of the document by name.
///
/// # Examples
///
/// ```
/// use xmlsort::{serial, sort, Document};
///
/// let mut doc = Document::parse_str("<xml><c>masg.</c><a>gast.</a><b>test.</b></xml>").unwrap();
/// sort::sort_document(&mut doc);
/// assert!(serial::serialize(&doc).ends_with("<xml><a>gast.</a><b>test.</b><c>masg.</c></xml>\n"));
/// ```
pub fn sort_document(doc: &mut Document) {
    let root = doc.root();
    sort_node(doc, root, true, &SortAll, &NameComparator, &ExcludeNone);
}

/// Sorts every node of the document using `XPath` sort keys, after removing
/// the nodes `exclude_xpath` selects.
///
/// `use_values` are relative expressions evaluated against each sibling;
/// earlier expressions take priority (see [`PathKeyComparator`]). With no
/// expressions, siblings are ordered by name. A blank `exclude_xpath` is
/// ignored.
///
/// # Errors
///
/// Returns [`Error::Expression`] if any expression fails to compile, or if
/// `exclude_xpath` cannot be evaluated. Sort-key expressions are compiled
/// before anything is removed, so the tree is untouched on a compile error.
///
/// # Examples
///
/// ```
/// use xmlsort::{serial, sort, Document};
///
/// let mut doc = Document::parse_str(
///     "<r><x id='2'/><x id='1'/><drop/></r>",
/// ).unwrap();
/// sort::sort_document_by_paths(&mut doc, &["./@id"], Some("//drop")).unwrap();
/// assert!(serial::serialize(&doc).ends_with("<r><x id=\"1\"/><x id=\"2\"/></r>\n"));
/// ```
pub fn sort_document_by_paths<S: AsRef<str>>(
    doc: &mut Document,
    use_values: &[S],
    exclude_xpath: Option<&str>,
) -> Result<(), Error> {
    let comparator = PathKeyComparator::new(use_values)?;

    if let Some(expression) = exclude_xpath.filter(|e| !e.trim().is_empty()) {
        remove_matches(doc, expression)?;
    }

    let root = doc.root();
    if comparator.is_empty() {
        sort_node(doc, root, true, &SortAll, &NameComparator, &ExcludeNone);
    } else {
        debug!(keys = comparator.len(), "sorting by path keys");
        sort_node(doc, root, true, &SortAll, &comparator, &ExcludeNone);
    }
    Ok(())
}
