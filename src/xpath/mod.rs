//! `XPath` 1.0 query language.
//!
//! Sort keys and exclusions are `XPath` expressions. This module compiles
//! them once and evaluates them against any node of a [`Document`].
//!
//! # Quick Start
//!
//! ```
//! use xmlsort::Document;
//! use xmlsort::xpath::{compile, XPathValue};
//!
//! let doc = Document::parse_str("<root><a id='1'/><b/></root>").unwrap();
//! let root = doc.root_element().unwrap();
//! let ids = compile("./*/@id").unwrap();
//! let selected = ids.select(&doc, root).unwrap();
//! assert_eq!(doc.node_value(selected[0]), Some("1"));
//! ```
//!
//! # Known Limitations
//!
//! - No variables, no `namespace::` axis and no namespace-aware name tests:
//!   `x:item` matches the qualified name as written.
//! - `id()`, `lang()` and `namespace-uri()` are not provided.
//!
//! # Submodules
//!
//! - [`ast`]: syntax tree of compiled expressions.
//! - [`lexer`]: tokenizer.
//! - [`parser`]: recursive descent parser.
//! - [`eval`]: evaluator.
//! - [`types`]: values and errors.

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod types;

use std::fmt;

pub use eval::XPathContext;
pub use types::{XPathError, XPathValue};

use crate::tree::{Document, NodeId};

/// A compiled `XPath` expression, reusable across documents and nodes.
#[derive(Debug, Clone)]
pub struct XPathExpr {
    source: String,
    expr: ast::Expr,
}

impl XPathExpr {
    /// The expression text this was compiled from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The parsed syntax tree.
    #[must_use]
    pub fn ast(&self) -> &ast::Expr {
        &self.expr
    }

    /// Evaluates the expression with `node` as the context node.
    ///
    /// # Errors
    ///
    /// Returns [`XPathError`] if evaluation fails.
    pub fn evaluate(&self, doc: &Document, node: NodeId) -> Result<XPathValue, XPathError> {
        XPathContext::new(doc, node).evaluate(&self.expr)
    }

    /// Evaluates the expression and returns the selected nodes in document
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`XPathError::TypeError`] if the expression does not yield a
    /// node-set, or any evaluation error.
    pub fn select(&self, doc: &Document, node: NodeId) -> Result<Vec<NodeId>, XPathError> {
        match self.evaluate(doc, node)? {
            XPathValue::NodeSet(nodes) => Ok(nodes),
            other => Err(XPathError::TypeError {
                expected: "node-set".to_owned(),
                found: other.type_name().to_owned(),
            }),
        }
    }
}

impl fmt::Display for XPathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for XPathExpr {
    type Err = XPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        compile(s)
    }
}

/// Compiles an expression for repeated evaluation.
///
/// # Errors
///
/// Returns [`XPathError::InvalidExpression`] if `expression` is not valid
/// `XPath` 1.0.
pub fn compile(expression: &str) -> Result<XPathExpr, XPathError> {
    Ok(XPathExpr {
        source: expression.to_owned(),
        expr: parser::parse(expression)?,
    })
}

/// Compiles and evaluates an expression in one call.
///
/// # Examples
///
/// ```
/// use xmlsort::Document;
/// use xmlsort::xpath::{evaluate, XPathValue};
///
/// let doc = Document::parse_str("<root><child>Hello</child></root>").unwrap();
/// let root = doc.root_element().unwrap();
/// let result = evaluate(&doc, root, "string(child)").unwrap();
/// assert_eq!(result, XPathValue::String("Hello".to_owned()));
/// ```
///
/// # Errors
///
/// Returns [`XPathError`] if the expression is malformed or evaluation fails.
pub fn evaluate(
    doc: &Document,
    context_node: NodeId,
    expression: &str,
) -> Result<XPathValue, XPathError> {
    compile(expression)?.evaluate(doc, context_node)
}
