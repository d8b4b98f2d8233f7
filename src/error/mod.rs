//! Error types shared across the crate.
//!
//! [`ParseError`] carries the source location of malformed input. [`Error`]
//! is the crate-level error returned by the loading and sorting entry points;
//! it wraps parse failures, I/O failures on a given path, and invalid `XPath`
//! expressions supplied as sort keys or exclusions.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::xpath::XPathError;

/// Source location within an XML document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in characters, not bytes).
    pub column: u32,
    /// 0-based byte offset from the start of the input.
    pub byte_offset: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The error type returned when XML parsing fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Human-readable error message.
    pub message: String,
    /// Where in the source the error occurred.
    pub location: SourceLocation,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at {}: {}", self.location, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Errors surfaced by the loader and the sorting entry points.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input is not well-formed XML.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A file could not be read or written.
    #[error("cannot access '{}': {source}", path.display())]
    Io {
        /// The path that failed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A sort-key or exclusion expression failed to compile or evaluate.
    #[error("invalid expression '{expression}': {source}")]
    Expression {
        /// The expression as supplied by the caller.
        expression: String,
        /// What went wrong.
        #[source]
        source: XPathError,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn expression(expression: &str, source: XPathError) -> Self {
        Self::Expression {
            expression: expression.to_owned(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_location_display() {
        let loc = SourceLocation {
            line: 10,
            column: 5,
            byte_offset: 42,
        };
        assert_eq!(loc.to_string(), "10:5");
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new(
            "unexpected end of input",
            SourceLocation {
                line: 1,
                column: 15,
                byte_offset: 14,
            },
        );
        assert_eq!(
            err.to_string(),
            "parse error at 1:15: unexpected end of input"
        );
    }

    #[test]
    fn test_crate_error_wraps_parse_error_transparently() {
        let err: Error = ParseError::new("missing root element", SourceLocation::default()).into();
        assert_eq!(err.to_string(), "parse error at 0:0: missing root element");
    }

    #[test]
    fn test_expression_error_names_the_expression() {
        let err = Error::expression(
            "@@id",
            XPathError::InvalidExpression {
                message: "expected a node test".to_string(),
                position: 1,
            },
        );
        let text = err.to_string();
        assert!(text.starts_with("invalid expression '@@id'"), "{text}");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_io_error_mentions_path() {
        let err = Error::io(
            "missing.xml",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(err.to_string(), "cannot access 'missing.xml': no such file");
    }
}
