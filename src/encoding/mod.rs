//! Encoding detection and transcoding.
//!
//! Input files may be in any encoding `encoding_rs` knows about. The
//! encoding is chosen in this order (XML 1.0 §4.3.3 and Appendix F):
//!
//! 1. A byte order mark, if present.
//! 2. The `encoding` pseudo-attribute of the XML declaration. The
//!    declaration itself is ASCII, so it can be read before decoding.
//! 3. UTF-8.
//!
//! Everything downstream of this module works on UTF-8 text.

use std::fmt;

use encoding_rs::{Encoding, UTF_8};

/// An error that occurs during encoding detection or transcoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingError {
    /// A human-readable description of the encoding error.
    pub message: String,
}

impl EncodingError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "encoding error: {}", self.message)
    }
}

impl std::error::Error for EncodingError {}

/// Detects the encoding of an XML byte stream from its byte order mark.
///
/// Returns the encoding and the number of BOM bytes to skip, or `None` if
/// the input has no BOM.
///
/// # Examples
///
/// ```
/// use xmlsort::encoding::detect_bom;
///
/// let (enc, skip) = detect_bom(b"\xEF\xBB\xBF<r/>").unwrap();
/// assert_eq!(enc.name(), "UTF-8");
/// assert_eq!(skip, 3);
/// assert!(detect_bom(b"<r/>").is_none());
/// ```
#[must_use]
pub fn detect_bom(bytes: &[u8]) -> Option<(&'static Encoding, usize)> {
    Encoding::for_bom(bytes)
}

/// Returns the `encoding` value of a leading XML declaration, read from the
/// raw bytes.
///
/// Only ASCII-compatible input can carry a readable declaration; anything
/// else yields `None`.
#[must_use]
pub fn declared_encoding(bytes: &[u8]) -> Option<&str> {
    let decl = bytes.strip_prefix(b"<?xml")?;
    let end = decl.windows(2).position(|w| w == b"?>")?;
    let decl = &decl[..end];

    let at = decl.windows(8).position(|w| w == b"encoding")?;
    let rest = trim_ascii_start(&decl[at + 8..]);
    let rest = trim_ascii_start(rest.strip_prefix(b"=")?);
    let (&quote, rest) = rest.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let close = rest.iter().position(|&b| b == quote)?;
    std::str::from_utf8(&rest[..close]).ok()
}

fn trim_ascii_start(bytes: &[u8]) -> &[u8] {
    let skip = bytes
        .iter()
        .take_while(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
        .count();
    &bytes[skip..]
}

/// Transcodes a byte slice from the named encoding into a UTF-8 `String`.
///
/// The label is looked up with `encoding_rs::Encoding::for_label`
/// (case-insensitive, WHATWG aliases accepted).
///
/// # Errors
///
/// Returns `EncodingError` if the label is unknown or the bytes are
/// malformed for that encoding.
///
/// # Examples
///
/// ```
/// use xmlsort::encoding::transcode;
///
/// assert_eq!(transcode(b"caf\xE9", "ISO-8859-1").unwrap(), "café");
/// ```
pub fn transcode(bytes: &[u8], label: &str) -> Result<String, EncodingError> {
    let encoding = Encoding::for_label(label.as_bytes())
        .ok_or_else(|| EncodingError::new(format!("unsupported encoding: {label}")))?;
    decode_with(encoding, bytes)
}

fn decode_with(encoding: &'static Encoding, bytes: &[u8]) -> Result<String, EncodingError> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(std::borrow::Cow::into_owned)
        .ok_or_else(|| {
            EncodingError::new(format!(
                "malformed byte sequence for encoding {}",
                encoding.name()
            ))
        })
}

/// Decodes raw XML bytes into a UTF-8 string, detecting the encoding.
///
/// The returned text never starts with a BOM.
///
/// # Errors
///
/// Returns `EncodingError` if the declared encoding is unknown or the bytes
/// are malformed for the detected encoding.
///
/// # Examples
///
/// ```
/// use xmlsort::encoding::decode_to_utf8;
///
/// let xml = b"<?xml version=\"1.0\" encoding=\"Shift_JIS\"?><r>\x93\xfa</r>";
/// assert!(decode_to_utf8(xml).unwrap().ends_with("<r>日</r>"));
/// ```
pub fn decode_to_utf8(bytes: &[u8]) -> Result<String, EncodingError> {
    if let Some((encoding, skip)) = detect_bom(bytes) {
        return decode_with(encoding, &bytes[skip..]);
    }
    match declared_encoding(bytes) {
        Some(label) => transcode(bytes, label),
        None => decode_with(UTF_8, bytes),
    }
}
