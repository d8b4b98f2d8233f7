//! `XPath` 1.0 values and errors.
//!
//! The four data types of `XPath` 1.0 (boolean, number, string, node-set)
//! and the conversions that need no document access. Conversions of node
//! sets to strings and numbers go through string-values, so they live on
//! the evaluator.

use std::fmt;

use crate::tree::NodeId;

/// The result of evaluating an `XPath` expression.
#[derive(Debug, Clone, PartialEq)]
pub enum XPathValue {
    /// A boolean value.
    Boolean(bool),
    /// An IEEE 754 double.
    Number(f64),
    /// A string value.
    String(String),
    /// Nodes in document order, without duplicates.
    NodeSet(Vec<NodeId>),
}

impl XPathValue {
    /// Converts to a boolean per `XPath` 1.0 §4.3 `boolean()`.
    #[must_use]
    pub fn to_boolean(&self) -> bool {
        match self {
            Self::Boolean(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::NodeSet(nodes) => !nodes.is_empty(),
        }
    }

    /// Returns the nodes if this value is a node-set.
    #[must_use]
    pub fn as_node_set(&self) -> Option<&[NodeId]> {
        match self {
            Self::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    /// Returns the `XPath` name of this value's type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::NodeSet(_) => "node-set",
        }
    }
}

impl fmt::Display for XPathValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => f.write_str(&format_xpath_number(*n)),
            Self::String(s) => f.write_str(s),
            Self::NodeSet(nodes) => write!(f, "<node-set of {} nodes>", nodes.len()),
        }
    }
}

/// Formats a number per `XPath` 1.0 §4.2 `string()`.
///
/// Integers have no decimal point, `NaN` and the infinities are spelled out
/// and negative zero is `"0"`.
#[must_use]
pub fn format_xpath_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_owned();
    }
    if n.is_infinite() {
        return if n.is_sign_positive() {
            "Infinity"
        } else {
            "-Infinity"
        }
        .to_owned();
    }
    #[allow(clippy::float_cmp)]
    if n == 0.0 {
        return "0".to_owned();
    }
    #[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
    if n.fract() == 0.0 && n.abs() < 1e18 {
        return format!("{}", n as i64);
    }
    format!("{n}")
}

/// Parses a string per `XPath` 1.0 §4.4 `number()`.
///
/// Only optional whitespace, an optional minus sign, digits and at most one
/// decimal point are accepted; anything else is `NaN`.
pub(crate) fn parse_xpath_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(|c: char| matches!(c, ' ' | '\t' | '\r' | '\n'));
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let well_formed = !digits.is_empty()
        && digits != "."
        && digits.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        && digits.bytes().filter(|&b| b == b'.').count() <= 1;
    if well_formed {
        trimmed.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

/// Errors raised while compiling or evaluating an `XPath` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XPathError {
    /// The expression text is not valid `XPath` syntax.
    InvalidExpression {
        /// What went wrong.
        message: String,
        /// Byte offset into the expression where the problem was found.
        position: usize,
    },

    /// A value of the wrong type was used, e.g. a predicate applied to a
    /// string or a number where a node-set was required.
    TypeError {
        /// The type that was required.
        expected: String,
        /// The type that was supplied.
        found: String,
    },

    /// A function call names no known function.
    UndefinedFunction {
        /// The function name as written.
        name: String,
    },

    /// A function was called with the wrong number of arguments.
    InvalidArgCount {
        /// The function name.
        function: String,
        /// The accepted argument count, e.g. `"1"` or `"2 or 3"`.
        expected: String,
        /// The number of arguments supplied.
        found: usize,
    },
}

impl fmt::Display for XPathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidExpression { message, position } => {
                write!(f, "invalid XPath expression at position {position}: {message}")
            }
            Self::TypeError { expected, found } => {
                write!(f, "type error: expected {expected}, found {found}")
            }
            Self::UndefinedFunction { name } => write!(f, "undefined function: {name}()"),
            Self::InvalidArgCount {
                function,
                expected,
                found,
            } => write!(
                f,
                "invalid argument count for {function}(): expected {expected}, found {found}"
            ),
        }
    }
}

impl std::error::Error for XPathError {}
