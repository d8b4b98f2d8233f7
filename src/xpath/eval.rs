//! `XPath` 1.0 expression evaluator.
//!
//! Walks an [`Expr`] against a [`Document`] and produces an [`XPathValue`].
//!
//! # Evaluation Context
//!
//! Every expression is evaluated against a context node, a context position
//! and a context size (`XPath` 1.0 §1). There are no variable bindings.
//!
//! # Document order
//!
//! Node-sets are kept in document order as given by the current sibling
//! links. Arena order is not used since sorting moves nodes around. Larger
//! node-sets are ordered by [`Document::document_order`] ranks, computed at
//! most once per call to [`XPathContext::evaluate`].

use std::cell::OnceCell;

use super::ast::{Axis, BinaryOp, Expr, NodeTest, PathStart, Step};
use super::types::{format_xpath_number, parse_xpath_number, XPathError, XPathValue};
use crate::tree::{Document, DocumentOrder, NodeId, NodeKind};

/// Evaluation context for an `XPath` 1.0 expression.
///
/// # Examples
///
/// ```
/// use xmlsort::xpath::parser::parse;
/// use xmlsort::xpath::{XPathContext, XPathValue};
/// use xmlsort::Document;
///
/// let doc = Document::parse_str("<root><a/><b/></root>").unwrap();
/// let root = doc.root_element().unwrap();
/// let expr = parse("count(*)").unwrap();
/// let value = XPathContext::new(&doc, root).evaluate(&expr).unwrap();
/// assert_eq!(value, XPathValue::Number(2.0));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct XPathContext<'a> {
    doc: &'a Document,
    context_node: NodeId,
    /// 1-based position of the context node within the current node-set.
    context_position: usize,
    context_size: usize,
    order: Option<&'a OnceCell<DocumentOrder>>,
}

/// Node-sets up to this size are ordered by pairwise comparison instead of
/// by ranking the whole document.
const PAIRWISE_ORDER_LIMIT: usize = 16;

impl<'a> XPathContext<'a> {
    /// Creates a context with `context_node` as the only member of the
    /// context node-set.
    #[must_use]
    pub fn new(doc: &'a Document, context_node: NodeId) -> Self {
        Self {
            doc,
            context_node,
            context_position: 1,
            context_size: 1,
            order: None,
        }
    }

    /// Evaluates `expr` in this context.
    ///
    /// # Errors
    ///
    /// Returns [`XPathError`] for unknown functions, wrong argument counts
    /// and operands that must be node-sets but are not.
    pub fn evaluate(&self, expr: &Expr) -> Result<XPathValue, XPathError> {
        let order = OnceCell::new();
        let context = XPathContext {
            order: Some(&order),
            ..*self
        };
        context.eval_expr(expr)
    }

    fn focus(&self, node: NodeId, position: usize, size: usize) -> Self {
        Self {
            doc: self.doc,
            context_node: node,
            context_position: position,
            context_size: size,
            order: self.order,
        }
    }

    fn eval_expr(&self, expr: &Expr) -> Result<XPathValue, XPathError> {
        match expr {
            Expr::Number(n) => Ok(XPathValue::Number(*n)),
            Expr::String(s) => Ok(XPathValue::String(s.clone())),
            Expr::BinaryOp { op, left, right } => self.eval_binary_op(*op, left, right),
            Expr::UnaryNeg(inner) => {
                let value = self.eval_expr(inner)?;
                Ok(XPathValue::Number(-self.to_number(&value)))
            }
            Expr::FunctionCall { name, args } => self.eval_function(name, args),
            Expr::Path { start, steps } => self.eval_path(start, steps),
            Expr::Filter { expr, predicates } => {
                let mut nodes = self.eval_node_set(expr)?;
                for predicate in predicates {
                    nodes = self.apply_predicate(&nodes, predicate)?;
                }
                Ok(XPathValue::NodeSet(nodes))
            }
            Expr::Union(left, right) => {
                let mut nodes = self.eval_node_set(left)?;
                nodes.extend(self.eval_node_set(right)?);
                self.sort_document_order(&mut nodes);
                Ok(XPathValue::NodeSet(nodes))
            }
        }
    }

    fn eval_node_set(&self, expr: &Expr) -> Result<Vec<NodeId>, XPathError> {
        match self.eval_expr(expr)? {
            XPathValue::NodeSet(nodes) => Ok(nodes),
            other => Err(XPathError::TypeError {
                expected: "node-set".to_owned(),
                found: other.type_name().to_owned(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Operators
    // -----------------------------------------------------------------------

    fn eval_binary_op(
        &self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<XPathValue, XPathError> {
        match op {
            BinaryOp::And => {
                if !self.eval_expr(left)?.to_boolean() {
                    return Ok(XPathValue::Boolean(false));
                }
                Ok(XPathValue::Boolean(self.eval_expr(right)?.to_boolean()))
            }
            BinaryOp::Or => {
                if self.eval_expr(left)?.to_boolean() {
                    return Ok(XPathValue::Boolean(true));
                }
                Ok(XPathValue::Boolean(self.eval_expr(right)?.to_boolean()))
            }
            BinaryOp::Eq | BinaryOp::Neq => {
                let lhs = self.eval_expr(left)?;
                let rhs = self.eval_expr(right)?;
                let equal = self.compare_equality(&lhs, &rhs, op == BinaryOp::Neq);
                Ok(XPathValue::Boolean(equal))
            }
            BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => {
                let lhs = self.eval_expr(left)?;
                let rhs = self.eval_expr(right)?;
                Ok(XPathValue::Boolean(self.compare_relational(op, &lhs, &rhs)))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let l = self.to_number(&self.eval_expr(left)?);
                let r = self.to_number(&self.eval_expr(right)?);
                let result = match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => l / r,
                    _ => l % r,
                };
                Ok(XPathValue::Number(result))
            }
        }
    }

    /// `=` and `!=` per `XPath` 1.0 §3.4. With `negate`, node-set operands
    /// look for a pair that differs rather than negating the `=` result.
    #[allow(clippy::float_cmp)]
    fn compare_equality(&self, lhs: &XPathValue, rhs: &XPathValue, negate: bool) -> bool {
        let strings_match = |a: &str, b: &str| (a == b) != negate;
        let numbers_match = |a: f64, b: f64| (a == b) != negate;
        match (lhs, rhs) {
            (XPathValue::NodeSet(left), XPathValue::NodeSet(right)) => {
                let right_values: Vec<String> =
                    right.iter().map(|&n| self.string_value(n)).collect();
                left.iter().any(|&l| {
                    let lv = self.string_value(l);
                    right_values.iter().any(|rv| strings_match(&lv, rv))
                })
            }
            (XPathValue::NodeSet(nodes), XPathValue::Boolean(b))
            | (XPathValue::Boolean(b), XPathValue::NodeSet(nodes)) => {
                (!nodes.is_empty() == *b) != negate
            }
            (XPathValue::NodeSet(nodes), XPathValue::Number(n))
            | (XPathValue::Number(n), XPathValue::NodeSet(nodes)) => nodes
                .iter()
                .any(|&node| numbers_match(parse_xpath_number(&self.string_value(node)), *n)),
            (XPathValue::NodeSet(nodes), XPathValue::String(s))
            | (XPathValue::String(s), XPathValue::NodeSet(nodes)) => nodes
                .iter()
                .any(|&node| strings_match(&self.string_value(node), s)),
            (XPathValue::Boolean(_), _) | (_, XPathValue::Boolean(_)) => {
                (lhs.to_boolean() == rhs.to_boolean()) != negate
            }
            (XPathValue::Number(_), _) | (_, XPathValue::Number(_)) => {
                numbers_match(self.to_number(lhs), self.to_number(rhs))
            }
            _ => strings_match(&self.to_string(lhs), &self.to_string(rhs)),
        }
    }

    /// `<`, `<=`, `>`, `>=` per `XPath` 1.0 §3.4: node-sets compare if any
    /// member satisfies the relation, everything else as numbers.
    fn compare_relational(&self, op: BinaryOp, lhs: &XPathValue, rhs: &XPathValue) -> bool {
        let holds = |a: f64, b: f64| match op {
            BinaryOp::Lt => a < b,
            BinaryOp::Lte => a <= b,
            BinaryOp::Gt => a > b,
            _ => a >= b,
        };
        let numbers = |value: &XPathValue| -> Vec<f64> {
            match value {
                XPathValue::NodeSet(nodes) => nodes
                    .iter()
                    .map(|&n| parse_xpath_number(&self.string_value(n)))
                    .collect(),
                other => vec![self.to_number(other)],
            }
        };
        match (lhs, rhs) {
            (XPathValue::NodeSet(_), XPathValue::Boolean(_))
            | (XPathValue::Boolean(_), XPathValue::NodeSet(_)) => holds(
                f64::from(u8::from(lhs.to_boolean())),
                f64::from(u8::from(rhs.to_boolean())),
            ),
            _ => {
                let right = numbers(rhs);
                numbers(lhs)
                    .into_iter()
                    .any(|l| right.iter().any(|&r| holds(l, r)))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Location paths
    // -----------------------------------------------------------------------

    fn eval_path(&self, start: &PathStart, steps: &[Step]) -> Result<XPathValue, XPathError> {
        let mut nodes = match start {
            PathStart::Context => vec![self.context_node],
            PathStart::Root => vec![self.doc.root()],
            PathStart::Expr(expr) => self.eval_node_set(expr)?,
        };
        for step in steps {
            nodes = self.apply_step(&nodes, step)?;
        }
        Ok(XPathValue::NodeSet(nodes))
    }

    fn apply_step(&self, input: &[NodeId], step: &Step) -> Result<Vec<NodeId>, XPathError> {
        let mut result = Vec::new();
        for &node in input {
            let mut selected: Vec<NodeId> = self
                .axis_nodes(node, step.axis)
                .into_iter()
                .filter(|&n| self.matches_node_test(n, &step.node_test, step.axis))
                .collect();
            for predicate in &step.predicates {
                selected = self.apply_predicate(&selected, predicate)?;
            }
            result.extend(selected);
        }
        self.sort_document_order(&mut result);
        Ok(result)
    }

    /// Returns the nodes on `axis` from `node`, in axis order: reverse
    /// document order for reverse axes, document order otherwise.
    fn axis_nodes(&self, node: NodeId, axis: Axis) -> Vec<NodeId> {
        let doc = self.doc;
        match axis {
            Axis::Child => doc.children(node).collect(),
            Axis::Descendant => doc.descendants(node).collect(),
            Axis::DescendantOrSelf => std::iter::once(node).chain(doc.descendants(node)).collect(),
            Axis::Parent => doc.parent(node).or_else(|| doc.owner(node)).into_iter().collect(),
            Axis::Ancestor => doc.ancestors(node).skip(1).collect(),
            Axis::AncestorOrSelf => doc.ancestors(node).collect(),
            Axis::FollowingSibling => {
                std::iter::successors(doc.next_sibling(node), |&n| doc.next_sibling(n)).collect()
            }
            Axis::PrecedingSibling => {
                std::iter::successors(doc.prev_sibling(node), |&n| doc.prev_sibling(n)).collect()
            }
            Axis::Following => self.following_nodes(node),
            Axis::Preceding => self.preceding_nodes(node),
            Axis::Attribute => doc.attributes(node).to_vec(),
            Axis::SelfAxis => vec![node],
        }
    }

    /// Everything after `node` in document order, minus its descendants.
    /// For an attribute, the owner element's content follows it.
    fn following_nodes(&self, node: NodeId) -> Vec<NodeId> {
        let doc = self.doc;
        let mut result = Vec::new();
        let mut current = node;
        if let Some(owner) = doc.owner(node) {
            result.extend(doc.descendants(owner));
            current = owner;
        }
        loop {
            let mut sibling = doc.next_sibling(current);
            while let Some(s) = sibling {
                result.push(s);
                result.extend(doc.descendants(s));
                sibling = doc.next_sibling(s);
            }
            match doc.parent(current) {
                Some(parent) => current = parent,
                None => return result,
            }
        }
    }

    /// Everything before `node` in document order, minus its ancestors, in
    /// reverse document order.
    fn preceding_nodes(&self, node: NodeId) -> Vec<NodeId> {
        let doc = self.doc;
        let mut result = Vec::new();
        let mut current = doc.owner(node).unwrap_or(node);
        loop {
            let mut sibling = doc.prev_sibling(current);
            while let Some(s) = sibling {
                let mut subtree: Vec<NodeId> =
                    std::iter::once(s).chain(doc.descendants(s)).collect();
                subtree.reverse();
                result.extend(subtree);
                sibling = doc.prev_sibling(s);
            }
            match doc.parent(current) {
                Some(parent) => current = parent,
                None => return result,
            }
        }
    }

    fn matches_node_test(&self, node: NodeId, test: &NodeTest, axis: Axis) -> bool {
        let kind = &self.doc.node(node).kind;
        let principal = if axis == Axis::Attribute {
            matches!(kind, NodeKind::Attribute { .. })
        } else {
            matches!(kind, NodeKind::Element { .. })
        };
        match test {
            NodeTest::Name(name) => principal && self.doc.node_name(node) == name,
            NodeTest::Wildcard => principal,
            NodeTest::PrefixWildcard(prefix) => {
                principal
                    && self
                        .doc
                        .node_name(node)
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with(':'))
            }
            NodeTest::Node => true,
            NodeTest::Text => matches!(kind, NodeKind::Text { .. } | NodeKind::CData { .. }),
            NodeTest::Comment => matches!(kind, NodeKind::Comment { .. }),
            NodeTest::ProcessingInstruction(target) => match kind {
                NodeKind::ProcessingInstruction { target: t, .. } => {
                    target.as_ref().map_or(true, |wanted| wanted == t)
                }
                _ => false,
            },
        }
    }

    /// Keeps the nodes for which `predicate` holds, with positions counted
    /// in the order `nodes` is given.
    #[allow(clippy::float_cmp)]
    fn apply_predicate(
        &self,
        nodes: &[NodeId],
        predicate: &Expr,
    ) -> Result<Vec<NodeId>, XPathError> {
        let size = nodes.len();
        let mut result = Vec::new();
        for (i, &node) in nodes.iter().enumerate() {
            let value = self.focus(node, i + 1, size).eval_expr(predicate)?;
            let keep = match value {
                XPathValue::Number(n) => n == usize_to_f64(i + 1),
                other => other.to_boolean(),
            };
            if keep {
                result.push(node);
            }
        }
        Ok(result)
    }

    fn sort_document_order(&self, nodes: &mut Vec<NodeId>) {
        match self.order {
            Some(cell) if nodes.len() > PAIRWISE_ORDER_LIMIT => {
                let order = cell.get_or_init(|| self.doc.document_order());
                let rank = |node| order.rank(node).unwrap_or(u32::MAX);
                nodes.sort_by(|&a, &b| {
                    rank(a)
                        .cmp(&rank(b))
                        .then_with(|| self.doc.compare_document_order(a, b))
                });
            }
            _ => nodes.sort_by(|&a, &b| self.doc.compare_document_order(a, b)),
        }
        nodes.dedup();
    }

    // -----------------------------------------------------------------------
    // Functions
    // -----------------------------------------------------------------------

    fn eval_function(&self, name: &str, args: &[Expr]) -> Result<XPathValue, XPathError> {
        match name {
            // Node-set functions
            "last" => {
                check_arg_count(name, args, 0, 0)?;
                Ok(XPathValue::Number(usize_to_f64(self.context_size)))
            }
            "position" => {
                check_arg_count(name, args, 0, 0)?;
                Ok(XPathValue::Number(usize_to_f64(self.context_position)))
            }
            "count" => {
                check_arg_count(name, args, 1, 1)?;
                let nodes = self.eval_node_set(&args[0])?;
                Ok(XPathValue::Number(usize_to_f64(nodes.len())))
            }
            "name" | "local-name" => {
                check_arg_count(name, args, 0, 1)?;
                let node = match args.first() {
                    Some(arg) => self.eval_node_set(arg)?.first().copied(),
                    None => Some(self.context_node),
                };
                let result = node.map_or(String::new(), |n| {
                    if name == "name" {
                        self.expanded_name(n).to_owned()
                    } else {
                        self.doc.local_name(n).unwrap_or_default().to_owned()
                    }
                });
                Ok(XPathValue::String(result))
            }

            // String functions
            "string" => {
                check_arg_count(name, args, 0, 1)?;
                Ok(XPathValue::String(self.string_arg_or_context(args)?))
            }
            "concat" => {
                check_arg_count(name, args, 2, usize::MAX)?;
                let mut result = String::new();
                for arg in args {
                    result.push_str(&self.to_string(&self.eval_expr(arg)?));
                }
                Ok(XPathValue::String(result))
            }
            "starts-with" | "contains" | "substring-before" | "substring-after" => {
                check_arg_count(name, args, 2, 2)?;
                let haystack = self.to_string(&self.eval_expr(&args[0])?);
                let needle = self.to_string(&self.eval_expr(&args[1])?);
                Ok(match name {
                    "starts-with" => XPathValue::Boolean(haystack.starts_with(&needle)),
                    "contains" => XPathValue::Boolean(haystack.contains(&needle)),
                    "substring-before" => XPathValue::String(
                        haystack
                            .split_once(&needle)
                            .map_or("", |(before, _)| before)
                            .to_owned(),
                    ),
                    _ => XPathValue::String(
                        haystack
                            .split_once(&needle)
                            .map_or("", |(_, after)| after)
                            .to_owned(),
                    ),
                })
            }
            "substring" => self.fn_substring(args),
            "string-length" => {
                check_arg_count(name, args, 0, 1)?;
                let s = self.string_arg_or_context(args)?;
                Ok(XPathValue::Number(usize_to_f64(s.chars().count())))
            }
            "normalize-space" => {
                check_arg_count(name, args, 0, 1)?;
                let s = self.string_arg_or_context(args)?;
                let normalized = s
                    .split([' ', '\t', '\r', '\n'])
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                Ok(XPathValue::String(normalized))
            }
            "translate" => {
                check_arg_count(name, args, 3, 3)?;
                let s = self.to_string(&self.eval_expr(&args[0])?);
                let from: Vec<char> = self.to_string(&self.eval_expr(&args[1])?).chars().collect();
                let to: Vec<char> = self.to_string(&self.eval_expr(&args[2])?).chars().collect();
                let translated = s
                    .chars()
                    .filter_map(|c| match from.iter().position(|&f| f == c) {
                        Some(i) => to.get(i).copied(),
                        None => Some(c),
                    })
                    .collect();
                Ok(XPathValue::String(translated))
            }

            // Boolean functions
            "not" => {
                check_arg_count(name, args, 1, 1)?;
                Ok(XPathValue::Boolean(!self.eval_expr(&args[0])?.to_boolean()))
            }
            "true" | "false" => {
                check_arg_count(name, args, 0, 0)?;
                Ok(XPathValue::Boolean(name == "true"))
            }
            "boolean" => {
                check_arg_count(name, args, 1, 1)?;
                Ok(XPathValue::Boolean(self.eval_expr(&args[0])?.to_boolean()))
            }

            // Number functions
            "number" => {
                check_arg_count(name, args, 0, 1)?;
                let n = match args.first() {
                    Some(arg) => self.to_number(&self.eval_expr(arg)?),
                    None => parse_xpath_number(&self.string_value(self.context_node)),
                };
                Ok(XPathValue::Number(n))
            }
            "sum" => {
                check_arg_count(name, args, 1, 1)?;
                let total = self
                    .eval_node_set(&args[0])?
                    .into_iter()
                    .map(|n| parse_xpath_number(&self.string_value(n)))
                    .sum();
                Ok(XPathValue::Number(total))
            }
            "floor" | "ceiling" | "round" => {
                check_arg_count(name, args, 1, 1)?;
                let n = self.to_number(&self.eval_expr(&args[0])?);
                Ok(XPathValue::Number(match name {
                    "floor" => n.floor(),
                    "ceiling" => n.ceil(),
                    _ => xpath_round(n),
                }))
            }

            _ => Err(XPathError::UndefinedFunction {
                name: name.to_owned(),
            }),
        }
    }

    /// `substring(s, start, len?)` with the rounding rules of §4.2: a
    /// character at 1-based position `p` is kept when
    /// `round(start) <= p < round(start) + round(len)`.
    fn fn_substring(&self, args: &[Expr]) -> Result<XPathValue, XPathError> {
        check_arg_count("substring", args, 2, 3)?;
        let s = self.to_string(&self.eval_expr(&args[0])?);
        let start = xpath_round(self.to_number(&self.eval_expr(&args[1])?));
        let end = match args.get(2) {
            Some(len) => start + xpath_round(self.to_number(&self.eval_expr(len)?)),
            None => f64::INFINITY,
        };
        let result = s
            .chars()
            .enumerate()
            .filter(|&(i, _)| {
                let p = usize_to_f64(i + 1);
                p >= start && p < end
            })
            .map(|(_, c)| c)
            .collect();
        Ok(XPathValue::String(result))
    }

    fn string_arg_or_context(&self, args: &[Expr]) -> Result<String, XPathError> {
        match args.first() {
            Some(arg) => Ok(self.to_string(&self.eval_expr(arg)?)),
            None => Ok(self.string_value(self.context_node)),
        }
    }

    /// The name `name()` reports: qualified name for elements and
    /// attributes, target for processing instructions, empty otherwise.
    fn expanded_name(&self, node: NodeId) -> &'a str {
        match &self.doc.node(node).kind {
            NodeKind::Element { name, .. }
            | NodeKind::Attribute { name, .. }
            | NodeKind::ProcessingInstruction { target: name, .. } => name,
            _ => "",
        }
    }

    // -----------------------------------------------------------------------
    // Conversions
    // -----------------------------------------------------------------------

    /// The string-value of a node (`XPath` 1.0 §5).
    fn string_value(&self, node: NodeId) -> String {
        match self.doc.node(node).kind {
            NodeKind::DocumentType { .. } => String::new(),
            _ => self.doc.text_content(node),
        }
    }

    fn to_string(&self, value: &XPathValue) -> String {
        match value {
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map_or_else(String::new, |&n| self.string_value(n)),
            XPathValue::String(s) => s.clone(),
            XPathValue::Number(n) => format_xpath_number(*n),
            XPathValue::Boolean(b) => b.to_string(),
        }
    }

    fn to_number(&self, value: &XPathValue) -> f64 {
        match value {
            XPathValue::Number(n) => *n,
            XPathValue::Boolean(b) => f64::from(u8::from(*b)),
            other => parse_xpath_number(&self.to_string(other)),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn usize_to_f64(n: usize) -> f64 {
    n as f64
}

/// `round()`: half-way cases round toward positive infinity.
fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        return n;
    }
    (n + 0.5).floor()
}

fn check_arg_count(name: &str, args: &[Expr], min: usize, max: usize) -> Result<(), XPathError> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        min.to_string()
    } else if max == usize::MAX {
        format!("{min} or more")
    } else if max == min + 1 {
        format!("{min} or {max}")
    } else {
        format!("{min} to {max}")
    };
    Err(XPathError::InvalidArgCount {
        function: name.to_owned(),
        expected,
        found: args.len(),
    })
}

#[cfg(test)]
#[allow(clippy::float_cmp, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::xpath::parser::parse;
    use pretty_assertions::assert_eq;

    const LIBRARY: &str = "<lib><book id='b2' lang='en'><title>Zeta</title><price>10</price></book>\
        <book id='b1'><title>Alpha</title><price>5.5</price></book>\
        <!--note--><?pi data?><mag x:kind='weekly'/></lib>";

    fn eval_at(doc: &Document, node: NodeId, xpath: &str) -> XPathValue {
        XPathContext::new(doc, node)
            .evaluate(&parse(xpath).unwrap())
            .unwrap()
    }

    fn eval(xml: &str, xpath: &str) -> XPathValue {
        let doc = Document::parse_str(xml).unwrap();
        eval_at(&doc, doc.root(), xpath)
    }

    fn names(doc: &Document, value: &XPathValue) -> Vec<String> {
        value
            .as_node_set()
            .unwrap()
            .iter()
            .map(|&n| doc.node_name(n).to_owned())
            .collect()
    }

    fn eval_err(xpath: &str) -> XPathError {
        let doc = Document::parse_str(LIBRARY).unwrap();
        XPathContext::new(&doc, doc.root())
            .evaluate(&parse(xpath).unwrap())
            .unwrap_err()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("<r/>", "1 + 2 * 3"), XPathValue::Number(7.0));
        assert_eq!(eval("<r/>", "7 mod 3"), XPathValue::Number(1.0));
        assert_eq!(eval("<r/>", "1 div 4"), XPathValue::Number(0.25));
        assert_eq!(eval("<r/>", "-(2 - 5)"), XPathValue::Number(3.0));
    }

    #[test]
    fn test_child_and_descendant_paths() {
        let doc = Document::parse_str(LIBRARY).unwrap();
        let value = eval_at(&doc, doc.root(), "/lib/book/title");
        assert_eq!(names(&doc, &value), vec!["title", "title"]);
        let value = eval_at(&doc, doc.root(), "//price");
        assert_eq!(doc.text_content(value.as_node_set().unwrap()[1]), "5.5");
    }

    #[test]
    fn test_attribute_selection() {
        let doc = Document::parse_str(LIBRARY).unwrap();
        let value = eval_at(&doc, doc.root(), "/lib/book/@id");
        let ids: Vec<&str> = value
            .as_node_set()
            .unwrap()
            .iter()
            .map(|&n| doc.node_value(n).unwrap())
            .collect();
        assert_eq!(ids, vec!["b2", "b1"]);
        assert_eq!(
            eval_at(&doc, doc.root(), "count(//@*)"),
            XPathValue::Number(4.0)
        );
        assert_eq!(
            eval_at(&doc, doc.root(), "count(//mag/@x:*)"),
            XPathValue::Number(1.0)
        );
    }

    #[test]
    fn test_relative_to_context_node() {
        let doc = Document::parse_str(LIBRARY).unwrap();
        let book = doc.children(doc.root_element().unwrap()).next().unwrap();
        let value = eval_at(&doc, book, "./@id");
        assert_eq!(doc.node_value(value.as_node_set().unwrap()[0]), Some("b2"));
        let value = eval_at(&doc, book, ".");
        assert_eq!(value.as_node_set().unwrap(), &[book]);
        let value = eval_at(&doc, book, "..");
        assert_eq!(names(&doc, &value), vec!["lib"]);
    }

    #[test]
    fn test_attribute_parent_is_owner() {
        let doc = Document::parse_str(LIBRARY).unwrap();
        let value = eval_at(&doc, doc.root(), "//@lang/..");
        assert_eq!(names(&doc, &value), vec!["book"]);
    }

    #[test]
    fn test_predicates() {
        let doc = Document::parse_str(LIBRARY).unwrap();
        let value = eval_at(&doc, doc.root(), "/lib/book[price > 6]/title");
        assert_eq!(doc.text_content(value.as_node_set().unwrap()[0]), "Zeta");
        let value = eval_at(&doc, doc.root(), "/lib/book[2]/@id");
        assert_eq!(doc.node_value(value.as_node_set().unwrap()[0]), Some("b1"));
        let value = eval_at(&doc, doc.root(), "/lib/*[last()]");
        assert_eq!(names(&doc, &value), vec!["mag"]);
        let value = eval_at(&doc, doc.root(), "/lib/book[@id='b1']/title");
        assert_eq!(doc.text_content(value.as_node_set().unwrap()[0]), "Alpha");
    }

    #[test]
    fn test_reverse_axis_positions() {
        let doc = Document::parse_str("<r><a/><b/><c/></r>").unwrap();
        let value = eval_at(&doc, doc.root(), "/r/c/preceding-sibling::*[1]");
        assert_eq!(names(&doc, &value), vec!["b"]);
        let value = eval_at(&doc, doc.root(), "/r/c/preceding-sibling::*");
        assert_eq!(names(&doc, &value), vec!["a", "b"]);
    }

    #[test]
    fn test_following_and_preceding() {
        let doc = Document::parse_str("<r><a><a1/></a><b><b1/></b><c/></r>").unwrap();
        let value = eval_at(&doc, doc.root(), "//a1/following::*");
        assert_eq!(names(&doc, &value), vec!["b", "b1", "c"]);
        let value = eval_at(&doc, doc.root(), "//b1/preceding::*");
        assert_eq!(names(&doc, &value), vec!["a", "a1"]);
        let value = eval_at(&doc, doc.root(), "//b1/ancestor::*");
        assert_eq!(names(&doc, &value), vec!["r", "b"]);
    }

    #[test]
    fn test_node_type_tests() {
        let doc = Document::parse_str(LIBRARY).unwrap();
        let value = eval_at(&doc, doc.root(), "/lib/comment()");
        assert_eq!(names(&doc, &value), vec!["#comment"]);
        let value = eval_at(&doc, doc.root(), "/lib/processing-instruction('pi')");
        assert_eq!(names(&doc, &value), vec!["pi"]);
        assert_eq!(
            eval_at(&doc, doc.root(), "count(/lib/node())"),
            XPathValue::Number(5.0)
        );
        let value = eval_at(&doc, doc.root(), "/lib/book/title/text()");
        assert_eq!(names(&doc, &value), vec!["#text", "#text"]);
    }

    #[test]
    fn test_union_is_in_document_order() {
        let doc = Document::parse_str(LIBRARY).unwrap();
        let value = eval_at(&doc, doc.root(), "//mag | //book | //book[1]");
        assert_eq!(names(&doc, &value), vec!["book", "book", "mag"]);
    }

    #[test]
    fn test_document_order_follows_moved_nodes() {
        let mut doc = Document::parse_str("<r><a/><b/></r>").unwrap();
        let r = doc.root_element().unwrap();
        let a = doc.first_child(r).unwrap();
        doc.detach(a);
        doc.append_child(r, a);
        let value = eval_at(&doc, doc.root(), "/r/a | /r/b");
        assert_eq!(names(&doc, &value), vec!["b", "a"]);
    }

    #[test]
    fn test_equality_rules() {
        let doc = Document::parse_str(LIBRARY).unwrap();
        let root = doc.root();
        assert_eq!(eval_at(&doc, root, "//price = 10"), XPathValue::Boolean(true));
        assert_eq!(eval_at(&doc, root, "//price != 10"), XPathValue::Boolean(true));
        assert_eq!(eval_at(&doc, root, "//title = 'Alpha'"), XPathValue::Boolean(true));
        assert_eq!(eval_at(&doc, root, "//nothing = ''"), XPathValue::Boolean(false));
        assert_eq!(eval_at(&doc, root, "'1' = 1"), XPathValue::Boolean(true));
        assert_eq!(eval_at(&doc, root, "true() = 'x'"), XPathValue::Boolean(true));
    }

    #[test]
    fn test_string_functions() {
        assert_eq!(
            eval("<r/>", "concat('a', 'b', 1)"),
            XPathValue::String("ab1".into())
        );
        assert_eq!(
            eval("<r/>", "substring-before('2024-01', '-')"),
            XPathValue::String("2024".into())
        );
        assert_eq!(
            eval("<r/>", "substring-after('2024-01', '-')"),
            XPathValue::String("01".into())
        );
        assert_eq!(
            eval("<r/>", "substring('12345', 1.5, 2.6)"),
            XPathValue::String("234".into())
        );
        assert_eq!(
            eval("<r/>", "normalize-space('  a \n b  ')"),
            XPathValue::String("a b".into())
        );
        assert_eq!(eval("<r/>", "string-length('日本')"), XPathValue::Number(2.0));
        assert_eq!(
            eval("<r/>", "translate('bar', 'abc', 'AB')"),
            XPathValue::String("BAr".into())
        );
        assert_eq!(eval("<r/>", "starts-with('abc', 'ab')"), XPathValue::Boolean(true));
        assert_eq!(eval("<r/>", "contains('abc', 'd')"), XPathValue::Boolean(false));
    }

    #[test]
    fn test_name_functions() {
        let doc = Document::parse_str(LIBRARY).unwrap();
        let root = doc.root();
        assert_eq!(
            eval_at(&doc, root, "name(//@x:kind)"),
            XPathValue::String("x:kind".into())
        );
        assert_eq!(
            eval_at(&doc, root, "local-name(//@x:kind)"),
            XPathValue::String("kind".into())
        );
        assert_eq!(eval_at(&doc, root, "name(/)"), XPathValue::String(String::new()));
        assert_eq!(eval_at(&doc, root, "name(//nothing)"), XPathValue::String(String::new()));
    }

    #[test]
    fn test_number_functions() {
        let doc = Document::parse_str(LIBRARY).unwrap();
        let root = doc.root();
        assert_eq!(eval_at(&doc, root, "sum(//price)"), XPathValue::Number(15.5));
        assert_eq!(eval_at(&doc, root, "number('x')").to_string(), "NaN");
        assert_eq!(eval_at(&doc, root, "round(-0.5)"), XPathValue::Number(0.0));
        assert_eq!(eval_at(&doc, root, "floor(2.7)"), XPathValue::Number(2.0));
        assert_eq!(eval_at(&doc, root, "ceiling(2.1)"), XPathValue::Number(3.0));
        assert_eq!(eval_at(&doc, root, "boolean(//book)"), XPathValue::Boolean(true));
        assert_eq!(eval_at(&doc, root, "not(//nothing)"), XPathValue::Boolean(true));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            eval_err("frobnicate()"),
            XPathError::UndefinedFunction {
                name: "frobnicate".into()
            }
        );
        assert_eq!(
            eval_err("substring('a')"),
            XPathError::InvalidArgCount {
                function: "substring".into(),
                expected: "2 or 3".into(),
                found: 1
            }
        );
        assert_eq!(
            eval_err("count('a')"),
            XPathError::TypeError {
                expected: "node-set".into(),
                found: "string".into()
            }
        );
        assert_eq!(
            eval_err("('a')/b"),
            XPathError::TypeError {
                expected: "node-set".into(),
                found: "string".into()
            }
        );
    }

    #[test]
    fn test_non_ascii_names() {
        let doc = Document::parse_str("<データ><項目 名前='x'/></データ>").unwrap();
        let value = eval_at(&doc, doc.root(), "/データ/項目/@名前");
        assert_eq!(doc.node_value(value.as_node_set().unwrap()[0]), Some("x"));
    }

    #[test]
    fn test_large_node_sets_follow_current_links() {
        let xml: String = (0..100).map(|i| format!("<a id='{i}'/>")).collect();
        let mut doc = Document::parse_str(&format!("<r>{xml}</r>")).unwrap();
        let r = doc.root_element().unwrap();
        let kids: Vec<NodeId> = doc.children(r).collect();
        for &kid in kids.iter().rev() {
            doc.detach(kid);
            doc.append_child(r, kid);
        }

        let value = eval_at(&doc, doc.root(), "//a/@id | /r/a[1]/@id");
        let ids: Vec<&str> = value
            .as_node_set()
            .unwrap()
            .iter()
            .map(|&n| doc.node_value(n).unwrap())
            .collect();
        let expected: Vec<String> = (0..100).rev().map(|i| i.to_string()).collect();
        assert_eq!(ids, expected);
    }
}
