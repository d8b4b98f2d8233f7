//! Character-level scanning for the XML loader.
//!
//! [`ParserInput`] is a cursor over the (already UTF-8) source text. It
//! keeps the line and column of the cursor for error reporting, counts
//! element nesting against the configured limit, and reads the lexical
//! pieces the tree builder is made of: names, references, quoted values and
//! the delimited constructs (comments, CDATA, PIs, the XML declaration).
//!
//! Only the five predefined entities and character references are
//! recognized. Nothing is ever loaded from outside the input.

use crate::error::{ParseError, SourceLocation};

use super::ParseOptions;

// -------------------------------------------------------------------------
// Character classes (XML 1.0 §2.2, §2.3)
// -------------------------------------------------------------------------

/// Non-ASCII ranges allowed to start a name.
const NAME_START_RANGES: &[(char, char)] = &[
    ('\u{C0}', '\u{D6}'),
    ('\u{D8}', '\u{F6}'),
    ('\u{F8}', '\u{2FF}'),
    ('\u{370}', '\u{37D}'),
    ('\u{37F}', '\u{1FFF}'),
    ('\u{200C}', '\u{200D}'),
    ('\u{2070}', '\u{218F}'),
    ('\u{2C00}', '\u{2FEF}'),
    ('\u{3001}', '\u{D7FF}'),
    ('\u{F900}', '\u{FDCF}'),
    ('\u{FDF0}', '\u{FFFD}'),
    ('\u{10000}', '\u{EFFFF}'),
];

/// Non-ASCII ranges allowed inside a name but not at its start.
const NAME_TAIL_RANGES: &[(char, char)] = &[
    ('\u{B7}', '\u{B7}'),
    ('\u{300}', '\u{36F}'),
    ('\u{203F}', '\u{2040}'),
];

fn in_ranges(c: char, ranges: &[(char, char)]) -> bool {
    ranges.iter().any(|&(lo, hi)| (lo..=hi).contains(&c))
}

/// `Char` (production `[2]`): the characters a document may contain.
pub(crate) fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | ' '..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

/// `NameStartChar` (production `[4]`).
pub(crate) fn is_name_start_char(c: char) -> bool {
    if c.is_ascii() {
        c.is_ascii_alphabetic() || c == '_' || c == ':'
    } else {
        in_ranges(c, NAME_START_RANGES)
    }
}

/// `NameChar` (production `[4a]`).
pub(crate) fn is_name_char(c: char) -> bool {
    if c.is_ascii() {
        c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-' | '.')
    } else {
        in_ranges(c, NAME_START_RANGES) || in_ranges(c, NAME_TAIL_RANGES)
    }
}

/// `S` (production `[3]`).
fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

// -------------------------------------------------------------------------
// Cursor
// -------------------------------------------------------------------------

/// Cursor over the source text.
pub(crate) struct ParserInput<'a> {
    text: &'a str,
    pos: usize,
    line: u32,
    column: u32,
    depth: u32,
    max_depth: u32,
    max_name_length: usize,
}

impl<'a> ParserInput<'a> {
    pub fn new(text: &'a str, options: &ParseOptions) -> Self {
        Self {
            text,
            pos: 0,
            line: 1,
            column: 1,
            depth: 0,
            max_depth: options.max_depth,
            max_name_length: options.max_name_length,
        }
    }

    /// Records that an element was opened. Fails once more elements are
    /// open than `max_depth` allows.
    pub fn enter_element(&mut self) -> Result<(), ParseError> {
        if self.depth >= self.max_depth {
            return Err(self.fatal(format!(
                "elements nested deeper than {} levels",
                self.max_depth
            )));
        }
        self.depth += 1;
        Ok(())
    }

    /// Records that the innermost open element was closed.
    pub fn leave_element(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            byte_offset: self.pos,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    /// Source text between two byte offsets already passed by the cursor.
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[start..end]
    }

    pub fn peek(&self) -> Option<u8> {
        self.rest().bytes().next()
    }

    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.rest().bytes().nth(offset)
    }

    pub fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn looking_at(&self, s: &[u8]) -> bool {
        self.rest().as_bytes().starts_with(s)
    }

    /// Moves past one character, keeping line and column current.
    pub fn advance_char(&mut self, ch: char) {
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    /// Moves past `count` characters (or to the end of input).
    pub fn advance(&mut self, count: usize) {
        for _ in 0..count {
            let Some(ch) = self.peek_char() else { return };
            self.advance_char(ch);
        }
    }

    /// Reads one character of document text. `\r\n` and a lone `\r` both
    /// come back as `\n`; characters outside `Char` are rejected.
    pub fn next_char(&mut self) -> Result<char, ParseError> {
        let ch = self
            .peek_char()
            .ok_or_else(|| self.fatal("unexpected end of input"))?;
        if !is_xml_char(ch) {
            return Err(self.fatal(format!("invalid XML character: U+{:04X}", u32::from(ch))));
        }
        self.advance_char(ch);
        if ch != '\r' {
            return Ok(ch);
        }
        if self.peek() == Some(b'\n') {
            self.advance(1);
        }
        Ok('\n')
    }

    pub fn expect_byte(&mut self, expected: u8) -> Result<(), ParseError> {
        let expected = char::from(expected);
        match self.peek_char() {
            Some(ch) if ch == expected => {
                self.advance_char(ch);
                Ok(())
            }
            Some(ch) => Err(self.fatal(format!("expected '{expected}', found '{ch}'"))),
            None => Err(self.fatal(format!("expected '{expected}', found end of input"))),
        }
    }

    pub fn expect_str(&mut self, expected: &[u8]) -> Result<(), ParseError> {
        if self.looking_at(expected) {
            self.advance(expected.len());
            return Ok(());
        }
        Err(self.fatal(format!(
            "expected '{}'",
            String::from_utf8_lossy(expected)
        )))
    }

    /// Skips `S`. Returns whether anything was skipped.
    pub fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(is_space) {
            self.advance(1);
        }
        self.pos > start
    }

    pub fn skip_whitespace_required(&mut self) -> Result<(), ParseError> {
        if self.skip_whitespace() {
            Ok(())
        } else {
            Err(self.fatal("whitespace required"))
        }
    }

    /// Consumes the longest run of ASCII bytes matching `pred`.
    fn take_ascii(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let len = self
            .rest()
            .bytes()
            .take_while(|&b| b.is_ascii() && pred(b))
            .count();
        let taken = &self.rest()[..len];
        self.advance(len);
        taken
    }

    /// Reads document text up to `terminator` and consumes the terminator.
    /// `what` names the construct in the end-of-input error.
    fn take_until(&mut self, terminator: &[u8], what: &str) -> Result<String, ParseError> {
        let mut content = String::new();
        while !self.looking_at(terminator) {
            if self.at_end() {
                return Err(self.fatal(format!("unexpected end of input in {what}")));
            }
            content.push(self.next_char()?);
        }
        self.advance(terminator.len());
        Ok(content)
    }

    /// `Name` (production `[5]`), bounded by `max_name_length` bytes.
    pub fn parse_name(&mut self) -> Result<String, ParseError> {
        let mut chars = self.rest().char_indices();
        match chars.next() {
            None => return Err(self.fatal("expected name, found end of input")),
            Some((_, c)) if !is_name_start_char(c) => {
                return Err(self.fatal(format!("invalid name start character: '{c}'")));
            }
            Some(_) => {}
        }
        let len = chars
            .find(|&(_, c)| !is_name_char(c))
            .map_or(self.rest().len(), |(i, _)| i);
        if len > self.max_name_length {
            return Err(self.fatal(format!(
                "name length ({len}) exceeds maximum ({})",
                self.max_name_length
            )));
        }
        let name = &self.rest()[..len];
        self.pos += len;
        self.column += u32::try_from(name.chars().count()).unwrap_or(u32::MAX);
        Ok(name.to_owned())
    }

    /// Reads `&name;`, `&#N;` or `&#xN;` and returns the character it stands
    /// for.
    pub fn parse_reference(&mut self) -> Result<char, ParseError> {
        self.expect_byte(b'&')?;
        if self.peek() == Some(b'#') {
            self.advance(1);
            return self.parse_char_reference();
        }
        let name = self.parse_name()?;
        self.expect_byte(b';')?;
        predefined_entity(&name)
            .ok_or_else(|| self.fatal(format!("unknown entity reference: &{name};")))
    }

    /// Digits and `;` of a character reference, after `&#`.
    fn parse_char_reference(&mut self) -> Result<char, ParseError> {
        let (digits, radix) = if self.peek() == Some(b'x') {
            self.advance(1);
            (self.take_ascii(|b| b.is_ascii_hexdigit()), 16)
        } else {
            (self.take_ascii(|b| b.is_ascii_digit()), 10)
        };
        let value = u32::from_str_radix(digits, radix)
            .map_err(|_| self.fatal(format!("malformed character reference '{digits}'")))?;
        self.expect_byte(b';')?;
        char::from_u32(value).filter(|&c| is_xml_char(c)).ok_or_else(|| {
            self.fatal(format!(
                "character reference &#x{value:X}; is not an allowed character"
            ))
        })
    }

    fn open_quote(&mut self) -> Result<u8, ParseError> {
        match self.peek() {
            Some(q @ (b'"' | b'\'')) => {
                self.advance(1);
                Ok(q)
            }
            _ => Err(self.fatal("expected a quoted value")),
        }
    }

    /// `AttValue` (production `[10]`) with references replaced and each
    /// tab or line end turned into a space (§3.3.3).
    pub fn parse_attribute_value(&mut self) -> Result<String, ParseError> {
        let quote = self.open_quote()?;
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.fatal("unexpected end of input in attribute value")),
                Some(b) if b == quote => break,
                Some(b'<') => return Err(self.fatal("'<' not allowed in attribute values")),
                Some(b'&') => value.push(self.parse_reference()?),
                Some(_) => match self.next_char()? {
                    '\t' | '\n' => value.push(' '),
                    ch => value.push(ch),
                },
            }
        }
        self.advance(1);
        Ok(value)
    }

    /// A quoted literal taken as-is: pseudo-attributes of the XML
    /// declaration, DOCTYPE identifiers.
    pub fn parse_quoted_value(&mut self) -> Result<String, ParseError> {
        let quote = char::from(self.open_quote()?);
        let len = self
            .rest()
            .find(quote)
            .ok_or_else(|| self.fatal("unterminated quoted value"))?;
        let value = &self.rest()[..len];
        for ch in value.chars() {
            self.advance_char(ch);
        }
        self.advance(1);
        Ok(value.to_owned())
    }

    /// A `ParseError` at the cursor.
    pub fn fatal(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.location())
    }
}

/// The five entities every XML document may use without declaring them.
fn predefined_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "apos" => '\'',
        "quot" => '"',
        _ => return None,
    })
}

// -------------------------------------------------------------------------
// Delimited constructs
// -------------------------------------------------------------------------

/// `<!-- ... -->`, returning the text between the delimiters. `--` may not
/// occur inside, and the text may not end with `-`.
pub(crate) fn parse_comment_content(input: &mut ParserInput<'_>) -> Result<String, ParseError> {
    input.expect_str(b"<!--")?;
    let start = input.location();
    let content = input.take_until(b"-->", "comment")?;
    if content.contains("--") || content.ends_with('-') {
        return Err(ParseError::new("'--' not allowed inside comments", start));
    }
    Ok(content)
}

/// `<![CDATA[ ... ]]>`, returning the text between the delimiters.
pub(crate) fn parse_cdata_content(input: &mut ParserInput<'_>) -> Result<String, ParseError> {
    input.expect_str(b"<![CDATA[")?;
    input.take_until(b"]]>", "CDATA section")
}

/// `<?target data?>`, returning the target and the data (`None` when there
/// is none).
pub(crate) fn parse_pi_content(
    input: &mut ParserInput<'_>,
) -> Result<(String, Option<String>), ParseError> {
    input.expect_str(b"<?")?;
    let target = input.parse_name()?;
    if target.eq_ignore_ascii_case("xml") {
        return Err(input.fatal("PI target 'xml' is reserved"));
    }
    if input.looking_at(b"?>") {
        input.advance(2);
        return Ok((target, None));
    }
    input.skip_whitespace_required()?;
    let data = input.take_until(b"?>", "processing instruction")?;
    Ok((target, Some(data).filter(|d| !d.is_empty())))
}

/// What an XML declaration says about the document.
#[derive(Debug, Clone)]
pub(crate) struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<bool>,
}

/// `<?xml version="..." encoding="..." standalone="..."?>` (production
/// `[23]`). The pseudo-attributes must appear in that order.
pub(crate) fn parse_xml_decl(input: &mut ParserInput<'_>) -> Result<XmlDeclaration, ParseError> {
    input.expect_str(b"<?xml")?;
    let spaced = input.skip_whitespace();
    let version = pseudo_attribute(input, "version", spaced)?
        .ok_or_else(|| input.fatal("XML declaration has no version"))?;
    if !is_version_num(&version) {
        return Err(input.fatal(format!("invalid version number: '{version}'")));
    }

    let mut spaced = input.skip_whitespace();
    let encoding = pseudo_attribute(input, "encoding", spaced)?;
    if let Some(enc) = &encoding {
        if !is_enc_name(enc) {
            return Err(input.fatal(format!("invalid encoding name: '{enc}'")));
        }
        spaced = input.skip_whitespace();
    }

    let standalone = match pseudo_attribute(input, "standalone", spaced)?.as_deref() {
        None => None,
        Some("yes") => Some(true),
        Some("no") => Some(false),
        Some(_) => return Err(input.fatal("standalone must be 'yes' or 'no'")),
    };

    input.skip_whitespace();
    input.expect_str(b"?>")?;
    Ok(XmlDeclaration {
        version,
        encoding,
        standalone,
    })
}

/// `name = "value"` inside the XML declaration, or `None` if the next
/// token is not `name`. `spaced` says whether whitespace preceded it.
fn pseudo_attribute(
    input: &mut ParserInput<'_>,
    name: &str,
    spaced: bool,
) -> Result<Option<String>, ParseError> {
    if !input.looking_at(name.as_bytes()) {
        return Ok(None);
    }
    if !spaced {
        return Err(input.fatal(format!("whitespace required before {name}")));
    }
    input.expect_str(name.as_bytes())?;
    input.skip_whitespace();
    input.expect_byte(b'=')?;
    input.skip_whitespace();
    input.parse_quoted_value().map(Some)
}

/// `VersionNum ::= '1.' [0-9]+`
fn is_version_num(s: &str) -> bool {
    s.strip_prefix("1.")
        .is_some_and(|minor| !minor.is_empty() && minor.bytes().all(|b| b.is_ascii_digit()))
}

/// `EncName ::= [A-Za-z] ([A-Za-z0-9._] | '-')*`
fn is_enc_name(s: &str) -> bool {
    let mut bytes = s.bytes();
    bytes.next().is_some_and(|b| b.is_ascii_alphabetic())
        && bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn scan(text: &str) -> ParserInput<'_> {
        ParserInput::new(text, &ParseOptions::default())
    }

    #[test]
    fn test_name_classes() {
        assert!(is_name_start_char('é'));
        assert!(is_name_start_char('日'));
        assert!(!is_name_start_char('-'));
        assert!(!is_name_start_char('\u{B7}'));
        assert!(is_name_char('\u{B7}'));
        assert!(is_name_char('9'));
        assert!(!is_name_char(' '));
        assert!(!is_xml_char('\u{1}'));
        assert!(!is_xml_char('\u{FFFE}'));
    }

    #[test]
    fn test_peek_and_advance() {
        let mut input = scan("xyz");
        assert_eq!((input.peek(), input.peek_at(2)), (Some(b'x'), Some(b'z')));
        input.advance(2);
        assert_eq!(input.peek_char(), Some('z'));
        input.advance(5);
        assert!(input.at_end());
        assert_eq!(input.peek(), None);
    }

    #[test]
    fn test_location_counts_lines_and_characters() {
        let mut input = scan("日本\nx");
        assert_eq!(input.next_char().unwrap(), '日');
        assert_eq!(input.next_char().unwrap(), '本');
        let loc = input.location();
        assert_eq!((loc.line, loc.column, loc.byte_offset), (1, 3, 6));
        input.advance(1);
        let loc = input.location();
        assert_eq!((loc.line, loc.column), (2, 1));
    }

    #[test]
    fn test_next_char_normalizes_line_ends() {
        let mut input = scan("a\r\nb\rc");
        let read: String = (0..5).map(|_| input.next_char().unwrap()).collect();
        assert_eq!(read, "a\nb\nc");
        assert!(input.at_end());
    }

    #[test]
    fn test_parse_name() {
        let mut input = scan("sort-key.1 rest");
        assert_eq!(input.parse_name().unwrap(), "sort-key.1");
        assert_eq!(input.location().column, 11);
        assert!(scan("1abc").parse_name().is_err());

        let long_name = "n".repeat(100);
        let opts = ParseOptions::default().max_name_length(50);
        let err = ParserInput::new(&long_name, &opts).parse_name().unwrap_err();
        assert!(err.message.contains("name length"), "{err}");
    }

    #[test]
    fn test_parse_reference() {
        for (src, expected) in [("&amp;", '&'), ("&lt;", '<'), ("&#65;", 'A'), ("&#x3042;", 'あ')]
        {
            assert_eq!(scan(src).parse_reference().unwrap(), expected, "{src}");
        }
        let err = scan("&nbsp;").parse_reference().unwrap_err();
        assert_eq!(err.message, "unknown entity reference: &nbsp;");
    }

    #[test]
    fn test_parse_reference_rejects_bad_char_refs() {
        for src in ["&#;", "&#x;", "&#99999999999;", "&#0;", "&#xD800;", "&#65"] {
            assert!(scan(src).parse_reference().is_err(), "{src}");
        }
    }

    #[test]
    fn test_element_depth_limit() {
        let opts = ParseOptions::default().max_depth(2);
        let mut input = ParserInput::new("", &opts);
        input.enter_element().unwrap();
        input.enter_element().unwrap();
        assert!(input.enter_element().is_err());
        input.leave_element();
        input.enter_element().unwrap();
    }

    #[test]
    fn test_attribute_values() {
        let mut input = scan("\"a\tb\r\nc &amp; d\" ");
        assert_eq!(input.parse_attribute_value().unwrap(), "a b c & d");
        assert_eq!(input.peek(), Some(b' '));
        assert!(scan("'a<b'").parse_attribute_value().is_err());
        assert!(scan("'open").parse_attribute_value().is_err());
        assert!(scan("bare").parse_attribute_value().is_err());
    }

    #[test]
    fn test_quoted_value_is_literal() {
        let mut input = scan("'a&amp;\"b'>");
        assert_eq!(input.parse_quoted_value().unwrap(), "a&amp;\"b");
        assert_eq!(input.peek(), Some(b'>'));
        assert!(scan("\"open").parse_quoted_value().is_err());
    }

    #[test]
    fn test_comment_content() {
        let mut input = scan("<!-- keep - me -->x");
        assert_eq!(parse_comment_content(&mut input).unwrap(), " keep - me ");
        assert_eq!(input.peek(), Some(b'x'));
        for bad in ["<!-- a -- b -->", "<!-- a --->", "<!-- open"] {
            assert!(parse_comment_content(&mut scan(bad)).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_cdata_content() {
        let mut input = scan("<![CDATA[<a>&amp;]]>");
        assert_eq!(parse_cdata_content(&mut input).unwrap(), "<a>&amp;");
        assert!(input.at_end());
    }

    #[test]
    fn test_pi_content() {
        let (target, data) = parse_pi_content(&mut scan("<?sort keys='name'?>")).unwrap();
        assert_eq!(target, "sort");
        assert_eq!(data.as_deref(), Some("keys='name'"));
        assert_eq!(parse_pi_content(&mut scan("<?marker?>")).unwrap().1, None);
        assert!(parse_pi_content(&mut scan("<?xml-ok?>")).is_ok());
        assert!(parse_pi_content(&mut scan("<?XML x?>")).is_err());
    }

    #[test]
    fn test_xml_decl() {
        let decl = parse_xml_decl(&mut scan(
            "<?xml version='1.0' encoding=\"Shift_JIS\" standalone='yes'?>",
        ))
        .unwrap();
        assert_eq!(decl.version, "1.0");
        assert_eq!(decl.encoding.as_deref(), Some("Shift_JIS"));
        assert_eq!(decl.standalone, Some(true));

        let decl = parse_xml_decl(&mut scan("<?xml version=\"1.1\" standalone=\"no\" ?>")).unwrap();
        assert_eq!((decl.encoding, decl.standalone), (None, Some(false)));
    }

    #[test]
    fn test_xml_decl_errors() {
        for bad in [
            "<?xml version='2.0'?>",
            "<?xml encoding='UTF-8'?>",
            "<?xml version='1.0'encoding='UTF-8'?>",
            "<?xml version='1.0' encoding='8bit'?>",
            "<?xml version='1.0' standalone='maybe'?>",
        ] {
            assert!(parse_xml_decl(&mut scan(bad)).is_err(), "{bad}");
        }
    }
}
