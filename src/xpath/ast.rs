//! Syntax tree for compiled `XPath` 1.0 expressions.
//!
//! Every location path, absolute or relative, and every filter expression
//! followed by `/` steps is an [`Expr::Path`]: a [`PathStart`] that yields
//! the initial node-set, then zero or more [`Step`]s applied in order.

use std::fmt;

/// An `XPath` 1.0 expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A numeric literal such as `42` or `.5`.
    Number(f64),

    /// A string literal, quotes removed.
    String(String),

    /// A binary operator applied to two operands.
    BinaryOp {
        /// The operator.
        op: BinaryOp,
        /// The left-hand operand.
        left: Box<Expr>,
        /// The right-hand operand.
        right: Box<Expr>,
    },

    /// Unary minus.
    UnaryNeg(Box<Expr>),

    /// A core library function call such as `count(item)`.
    FunctionCall {
        /// The function name.
        name: String,
        /// The argument expressions.
        args: Vec<Expr>,
    },

    /// A location path, or a filter expression continued with steps.
    ///
    /// `/` alone is a path with a [`PathStart::Root`] start and no steps.
    Path {
        /// Where the path begins.
        start: PathStart,
        /// The steps applied to the starting node-set.
        steps: Vec<Step>,
    },

    /// A primary expression with predicates, e.g. `(a | b)[1]`.
    Filter {
        /// The primary expression.
        expr: Box<Expr>,
        /// Predicates evaluated against the resulting node-set.
        predicates: Vec<Expr>,
    },

    /// The union of two node-sets, `a | b`.
    Union(Box<Expr>, Box<Expr>),
}

/// The starting node-set of a [`Expr::Path`].
#[derive(Debug, Clone, PartialEq)]
pub enum PathStart {
    /// The context node (relative location paths).
    Context,
    /// The document node (`/...` and `//...`).
    Root,
    /// The node-set a filter expression evaluates to (`(...)/step`).
    Expr(Box<Expr>),
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `or`
    Or,
    /// `and`
    And,
    /// `=`
    Eq,
    /// `!=`
    Neq,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `div`
    Div,
    /// `mod`
    Mod,
}

impl BinaryOp {
    /// Returns the operator as written in an expression.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "div",
            Self::Mod => "mod",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a location path: `axis::node-test[predicate]...`.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// The axis to walk from each context node.
    pub axis: Axis,
    /// Which nodes on the axis are kept.
    pub node_test: NodeTest,
    /// Predicates applied in order, each with positions counted along the axis.
    pub predicates: Vec<Expr>,
}

impl Step {
    /// A step without predicates.
    #[must_use]
    pub fn new(axis: Axis, node_test: NodeTest) -> Self {
        Self {
            axis,
            node_test,
            predicates: Vec::new(),
        }
    }

    /// The expansion of `//`: `descendant-or-self::node()`.
    #[must_use]
    pub fn descendant_or_self_node() -> Self {
        Self::new(Axis::DescendantOrSelf, NodeTest::Node)
    }
}

/// An `XPath` axis. The namespace axis is not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// `child::`
    Child,
    /// `descendant::`
    Descendant,
    /// `descendant-or-self::`
    DescendantOrSelf,
    /// `parent::`
    Parent,
    /// `ancestor::`
    Ancestor,
    /// `ancestor-or-self::`
    AncestorOrSelf,
    /// `following-sibling::`
    FollowingSibling,
    /// `preceding-sibling::`
    PrecedingSibling,
    /// `following::`
    Following,
    /// `preceding::`
    Preceding,
    /// `attribute::`
    Attribute,
    /// `self::`
    SelfAxis,
}

impl Axis {
    /// Looks up an axis by its name as written before `::`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "child" => Self::Child,
            "descendant" => Self::Descendant,
            "descendant-or-self" => Self::DescendantOrSelf,
            "parent" => Self::Parent,
            "ancestor" => Self::Ancestor,
            "ancestor-or-self" => Self::AncestorOrSelf,
            "following-sibling" => Self::FollowingSibling,
            "preceding-sibling" => Self::PrecedingSibling,
            "following" => Self::Following,
            "preceding" => Self::Preceding,
            "attribute" => Self::Attribute,
            "self" => Self::SelfAxis,
            _ => return None,
        })
    }

    /// Returns the axis name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Child => "child",
            Self::Descendant => "descendant",
            Self::DescendantOrSelf => "descendant-or-self",
            Self::Parent => "parent",
            Self::Ancestor => "ancestor",
            Self::AncestorOrSelf => "ancestor-or-self",
            Self::FollowingSibling => "following-sibling",
            Self::PrecedingSibling => "preceding-sibling",
            Self::Following => "following",
            Self::Preceding => "preceding",
            Self::Attribute => "attribute",
            Self::SelfAxis => "self",
        }
    }

    /// Reverse axes number their nodes in reverse document order
    /// (`XPath` 1.0 §2.4).
    #[must_use]
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Self::Parent
                | Self::Ancestor
                | Self::AncestorOrSelf
                | Self::PrecedingSibling
                | Self::Preceding
        )
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The node test of a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// A name test such as `item` or `x:item`, matched against the
    /// qualified name.
    Name(String),
    /// `*`: any node of the axis' principal type.
    Wildcard,
    /// `prefix:*`: principal-type nodes whose name starts with `prefix:`.
    PrefixWildcard(String),
    /// `node()`
    Node,
    /// `text()`, which also matches CDATA sections.
    Text,
    /// `comment()`
    Comment,
    /// `processing-instruction()`, optionally restricted to one target.
    ProcessingInstruction(Option<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_names_round_trip() {
        for axis in [
            Axis::Child,
            Axis::DescendantOrSelf,
            Axis::PrecedingSibling,
            Axis::SelfAxis,
        ] {
            assert_eq!(Axis::parse(axis.as_str()), Some(axis));
        }
        assert_eq!(Axis::parse("namespace"), None);
    }

    #[test]
    fn test_reverse_axes() {
        assert!(Axis::Ancestor.is_reverse());
        assert!(Axis::Preceding.is_reverse());
        assert!(!Axis::Following.is_reverse());
        assert!(!Axis::Attribute.is_reverse());
    }

    #[test]
    fn test_binary_op_display() {
        assert_eq!(BinaryOp::Lte.to_string(), "<=");
        assert_eq!(BinaryOp::Mod.to_string(), "mod");
    }
}
