use tracing::debug;

use crate::error::Error;
use crate::tree::{Document, NodeId};
use crate::xpath;

/// Removes every node `expression` selects, evaluated against the document
/// node, and returns how many were removed.
///
/// Attributes are removed from their owner element; any other node is
/// detached from its parent together with its subtree. The document node
/// itself is never removed.
///
/// # Errors
///
/// Returns [`Error::Expression`] if the expression does not compile, fails
/// to evaluate or does not select a node-set.
///
/// # Examples
///
/// ```
/// use xmlsort::{serial, sort, Document};
///
/// let mut doc = Document::parse_str("<r a='1'><x/><y/></r>").unwrap();
/// assert_eq!(sort::remove_matches(&mut doc, "//@a | /r/x").unwrap(), 2);
/// assert!(serial::serialize(&doc).ends_with("<r><y/></r>\n"));
/// ```
pub fn remove_matches(doc: &mut Document, expression: &str) -> Result<usize, Error> {
    let compiled =
        xpath::compile(expression).map_err(|source| Error::expression(expression, source))?;
    let selected = compiled
        .select(doc, doc.root())
        .map_err(|source| Error::expression(expression, source))?;

    let removed = selected
        .into_iter()
        .filter(|&node| remove_node(doc, node))
        .count();
    debug!(expression, removed, "removed matching nodes");
    Ok(removed)
}

fn remove_node(doc: &mut Document, node: NodeId) -> bool {
    if doc.owner(node).is_some() {
        doc.remove_attribute(node);
        true
    } else if doc.parent(node).is_some() {
        doc.detach(node);
        true
    } else {
        false
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::serial::serialize;
    use pretty_assertions::assert_eq;

    const DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

    #[test]
    fn test_remove_attributes_and_elements() {
        let mut doc = Document::parse_str(
            "<xml><notarget><a id='2'/></notarget><target><a id='2'/><b id='0'/></target></xml>",
        )
        .unwrap();
        let removed = remove_matches(&mut doc, "//*/@id|/xml/notarget").unwrap();
        assert_eq!(removed, 4);
        assert_eq!(
            serialize(&doc),
            format!("{DECL}<xml><target><a/><b/></target></xml>\n")
        );
    }

    #[test]
    fn test_remove_nothing() {
        let mut doc = Document::parse_str("<r><a/></r>").unwrap();
        assert_eq!(remove_matches(&mut doc, "//missing").unwrap(), 0);
        assert_eq!(serialize(&doc), format!("{DECL}<r><a/></r>\n"));
    }

    #[test]
    fn test_document_node_is_kept() {
        let mut doc = Document::parse_str("<r/>").unwrap();
        assert_eq!(remove_matches(&mut doc, "/").unwrap(), 0);
        assert_eq!(remove_matches(&mut doc, "/r").unwrap(), 1);
        assert_eq!(doc.root_element(), None);
    }

    #[test]
    fn test_remove_text_and_comments() {
        let mut doc = Document::parse_str("<r>x<!--c--><a>y</a></r>").unwrap();
        assert_eq!(remove_matches(&mut doc, "/r/text() | //comment()").unwrap(), 2);
        assert_eq!(serialize(&doc), format!("{DECL}<r><a>y</a></r>\n"));
    }

    #[test]
    fn test_invalid_expressions() {
        let mut doc = Document::parse_str("<r/>").unwrap();
        let err = remove_matches(&mut doc, "//[").unwrap_err();
        assert!(matches!(err, Error::Expression { .. }), "{err}");
        let err = remove_matches(&mut doc, "count(//r)").unwrap_err();
        assert!(
            err.to_string().contains("expected node-set, found number"),
            "{err}"
        );
    }
}
