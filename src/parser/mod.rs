//! XML 1.0 loader.
//!
//! A hand-rolled recursive descent parser that builds a [`Document`]. It
//! covers what the sorter needs to read and write back faithfully: the XML
//! declaration, comments, processing instructions, a DOCTYPE (kept as a node,
//! internal subset verbatim), elements, attributes, text with the predefined
//! entities and character references, and CDATA sections.
//!
//! There is no DTD processing and no external entity loading.

pub(crate) mod input;
mod xml;

use std::path::Path;

use tracing::debug;

use crate::error::{Error, ParseError, SourceLocation};
use crate::tree::Document;

const DEFAULT_MAX_DEPTH: u32 = 256;
const DEFAULT_MAX_ATTRIBUTES: u32 = 256;
const DEFAULT_MAX_NAME_LENGTH: usize = 50_000;

/// Parse options controlling parser behavior and resource limits.
///
/// Use the builder pattern to configure options:
///
/// ```
/// use xmlsort::parser::ParseOptions;
///
/// let opts = ParseOptions::default()
///     .no_blanks(true)
///     .max_depth(128);
/// ```
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// If true, drop text nodes that consist only of whitespace.
    pub no_blanks: bool,
    /// Maximum element nesting depth (default: 256).
    pub max_depth: u32,
    /// Maximum number of attributes on a single element (default: 256).
    pub max_attributes: u32,
    /// Maximum length in bytes of an element or attribute name (default: 50,000).
    pub max_name_length: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            no_blanks: false,
            max_depth: DEFAULT_MAX_DEPTH,
            max_attributes: DEFAULT_MAX_ATTRIBUTES,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
        }
    }
}

impl ParseOptions {
    /// Enables or disables stripping of whitespace-only text nodes.
    #[must_use]
    pub fn no_blanks(mut self, yes: bool) -> Self {
        self.no_blanks = yes;
        self
    }

    /// Sets the maximum element nesting depth.
    #[must_use]
    pub fn max_depth(mut self, max: u32) -> Self {
        self.max_depth = max;
        self
    }

    /// Sets the maximum number of attributes per element.
    #[must_use]
    pub fn max_attributes(mut self, max: u32) -> Self {
        self.max_attributes = max;
        self
    }

    /// Sets the maximum element/attribute name length in bytes.
    #[must_use]
    pub fn max_name_length(mut self, max: usize) -> Self {
        self.max_name_length = max;
        self
    }
}

/// Parses an XML string with default options.
///
/// # Errors
///
/// Returns `ParseError` if the input is not well-formed XML.
pub fn parse_str(input: &str) -> Result<Document, ParseError> {
    parse_str_with_options(input, &ParseOptions::default())
}

/// Parses an XML string with the given options.
///
/// A leading BOM (U+FEFF) is ignored.
///
/// # Errors
///
/// Returns `ParseError` if the input is not well-formed XML or exceeds one
/// of the configured limits.
pub fn parse_str_with_options(input: &str, options: &ParseOptions) -> Result<Document, ParseError> {
    let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
    xml::XmlParser::new(input, options).parse()
}

/// Decodes raw bytes (see [`crate::encoding::decode_to_utf8`]) and parses
/// them with the given options.
///
/// # Errors
///
/// Returns `ParseError` if the bytes cannot be decoded or are not
/// well-formed XML.
pub fn parse_bytes(input: &[u8], options: &ParseOptions) -> Result<Document, ParseError> {
    let text = crate::encoding::decode_to_utf8(input)
        .map_err(|e| ParseError::new(e.to_string(), SourceLocation::default()))?;
    parse_str_with_options(&text, options)
}

/// Reads and parses the XML file at `path`.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read and [`Error::Parse`]
/// if its content is not well-formed XML.
///
/// # Examples
///
/// ```no_run
/// use xmlsort::parser::{parse_file, ParseOptions};
///
/// let doc = parse_file("catalog.xml", &ParseOptions::default().no_blanks(true))?;
/// # Ok::<(), xmlsort::Error>(())
/// ```
pub fn parse_file(path: impl AsRef<Path>, options: &ParseOptions) -> Result<Document, Error> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    debug!(path = %path.display(), bytes = bytes.len(), "loaded input");
    Ok(parse_bytes(&bytes, options)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_str_ignores_bom() {
        let doc = parse_str("\u{FEFF}<r/>").unwrap();
        assert_eq!(doc.node_name(doc.root_element().unwrap()), "r");
    }

    #[test]
    fn test_parse_bytes_reports_encoding_errors() {
        let err = parse_bytes(b"<r>\xFF</r>", &ParseOptions::default()).unwrap_err();
        assert!(err.message.starts_with("encoding error"), "{err}");
    }

    #[test]
    fn test_parse_file_reads_declared_encoding() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<?xml version=\"1.0\" encoding=\"EUC-JP\"?><r>\xC6\xFC</r>")
            .unwrap();
        let doc = parse_file(file.path(), &ParseOptions::default()).unwrap();
        assert_eq!(doc.text_content(doc.root_element().unwrap()), "日");
        assert_eq!(doc.encoding.as_deref(), Some("EUC-JP"));
    }

    #[test]
    fn test_parse_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.xml");
        let err = parse_file(&missing, &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Io { ref path, .. } if *path == missing));
    }
}
