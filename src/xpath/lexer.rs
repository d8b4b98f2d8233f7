//! `XPath` 1.0 expression tokenizer.
//!
//! Turns an expression string into [`Token`]s in a single pass, applying the
//! disambiguation rules of `XPath` 1.0 §3.7 as it goes:
//!
//! - If there is a preceding token and it is not one of `@`, `::`, `(`, `[`,
//!   `,` or an operator, then `*` is the multiply operator and a name must be
//!   one of the operator names `and`, `or`, `mod`, `div`.
//! - A name followed by `(` is a function name or a node type.
//! - A name followed by `::` is an axis name.
//!
//! Names may contain any XML name characters, so element names outside
//! ASCII can be selected directly.

use std::fmt;

use super::types::XPathError;
use crate::parser::input::{is_name_char, is_name_start_char};

const NODE_TYPE_NAMES: &[&str] = &["comment", "text", "processing-instruction", "node"];

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `.`
    Dot,
    /// `..`
    DotDot,
    /// `@`
    At,
    /// `,`
    Comma,
    /// `::`
    ColonColon,
    /// `/`
    Slash,
    /// `//`
    DoubleSlash,
    /// `|`
    Pipe,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*` in operator position.
    Multiply,
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanEqual,
    /// `and`
    And,
    /// `or`
    Or,
    /// `mod`
    Mod,
    /// `div`
    Div,
    /// A numeric literal.
    Number(f64),
    /// A string literal, quotes removed.
    Literal(String),
    /// A name test such as `item` or `x:item`.
    Name(String),
    /// `*` in name-test position.
    Wildcard,
    /// `prefix:*`
    PrefixWildcard(String),
    /// A name followed by `(` that is not a node type.
    FunctionName(String),
    /// `node`, `text`, `comment` or `processing-instruction` followed by `(`.
    NodeType(String),
    /// A name followed by `::`.
    AxisName(String),
}

impl Token {
    fn is_operator(&self) -> bool {
        matches!(
            self,
            Self::And
                | Self::Or
                | Self::Mod
                | Self::Div
                | Self::Multiply
                | Self::Slash
                | Self::DoubleSlash
                | Self::Pipe
                | Self::Plus
                | Self::Minus
                | Self::Equal
                | Self::NotEqual
                | Self::LessThan
                | Self::LessThanEqual
                | Self::GreaterThan
                | Self::GreaterThanEqual
        )
    }

    /// True if an operand may start right after this token.
    fn expects_operand(&self) -> bool {
        self.is_operator()
            || matches!(
                self,
                Self::At | Self::ColonColon | Self::LeftParen | Self::LeftBracket | Self::Comma
            )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LeftParen => f.write_str("("),
            Self::RightParen => f.write_str(")"),
            Self::LeftBracket => f.write_str("["),
            Self::RightBracket => f.write_str("]"),
            Self::Dot => f.write_str("."),
            Self::DotDot => f.write_str(".."),
            Self::At => f.write_str("@"),
            Self::Comma => f.write_str(","),
            Self::ColonColon => f.write_str("::"),
            Self::Slash => f.write_str("/"),
            Self::DoubleSlash => f.write_str("//"),
            Self::Pipe => f.write_str("|"),
            Self::Plus => f.write_str("+"),
            Self::Minus => f.write_str("-"),
            Self::Multiply | Self::Wildcard => f.write_str("*"),
            Self::Equal => f.write_str("="),
            Self::NotEqual => f.write_str("!="),
            Self::LessThan => f.write_str("<"),
            Self::LessThanEqual => f.write_str("<="),
            Self::GreaterThan => f.write_str(">"),
            Self::GreaterThanEqual => f.write_str(">="),
            Self::And => f.write_str("and"),
            Self::Or => f.write_str("or"),
            Self::Mod => f.write_str("mod"),
            Self::Div => f.write_str("div"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Literal(s) => write!(f, "\"{s}\""),
            Self::Name(s) | Self::FunctionName(s) | Self::NodeType(s) | Self::AxisName(s) => {
                f.write_str(s)
            }
            Self::PrefixWildcard(p) => write!(f, "{p}:*"),
        }
    }
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    /// The token.
    pub token: Token,
    /// Byte offset into the expression.
    pub position: usize,
}

/// Tokenizer over an expression string.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    tokens: Vec<Spanned>,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer for `input`.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            tokens: Vec::new(),
        }
    }

    /// Tokenizes the whole input.
    ///
    /// # Errors
    ///
    /// Returns [`XPathError::InvalidExpression`] on an unexpected character,
    /// an unterminated literal or a name where an operator is required.
    pub fn tokenize(mut self) -> Result<Vec<Spanned>, XPathError> {
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let Some(c) = self.peek() else { break };
            let token = self.next_token(c)?;
            self.tokens.push(Spanned {
                token,
                position: start,
            });
        }
        Ok(self.tokens)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\n')) {
            self.pos += 1;
        }
    }

    fn error(&self, message: impl Into<String>, position: usize) -> XPathError {
        XPathError::InvalidExpression {
            message: message.into(),
            position,
        }
    }

    fn operator_expected(&self) -> bool {
        self.tokens
            .last()
            .is_some_and(|prev| !prev.token.expects_operand())
    }

    fn next_token(&mut self, c: char) -> Result<Token, XPathError> {
        let start = self.pos;
        let token = match c {
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            '[' => self.single(Token::LeftBracket),
            ']' => self.single(Token::RightBracket),
            '@' => self.single(Token::At),
            ',' => self.single(Token::Comma),
            '|' => self.single(Token::Pipe),
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '=' => self.single(Token::Equal),
            '*' => {
                if self.operator_expected() {
                    self.single(Token::Multiply)
                } else {
                    self.single(Token::Wildcard)
                }
            }
            '/' => {
                self.pos += 1;
                if self.peek() == Some('/') {
                    self.pos += 1;
                    Token::DoubleSlash
                } else {
                    Token::Slash
                }
            }
            '<' | '>' => {
                self.pos += 1;
                let or_equal = self.peek() == Some('=');
                if or_equal {
                    self.pos += 1;
                }
                match (c, or_equal) {
                    ('<', false) => Token::LessThan,
                    ('<', true) => Token::LessThanEqual,
                    (_, false) => Token::GreaterThan,
                    (_, true) => Token::GreaterThanEqual,
                }
            }
            '!' => {
                if self.peek_nth(1) != Some('=') {
                    return Err(self.error("expected '=' after '!'", start));
                }
                self.pos += 2;
                Token::NotEqual
            }
            ':' => {
                if self.peek_nth(1) != Some(':') {
                    return Err(self.error("unexpected ':'", start));
                }
                self.pos += 2;
                Token::ColonColon
            }
            '.' => match self.peek_nth(1) {
                Some('.') => {
                    self.pos += 2;
                    Token::DotDot
                }
                Some(d) if d.is_ascii_digit() => self.number(),
                _ => self.single(Token::Dot),
            },
            '"' | '\'' => self.literal(c)?,
            '$' => return Err(self.error("variable references are not supported", start)),
            d if d.is_ascii_digit() => self.number(),
            n if is_ncname_start(n) => self.name()?,
            other => return Err(self.error(format!("unexpected character '{other}'"), start)),
        };
        Ok(token)
    }

    fn single(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }

    fn number(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        // Digits with at most one '.' always parse.
        Token::Number(self.input[start..self.pos].parse().unwrap_or(f64::NAN))
    }

    fn literal(&mut self, quote: char) -> Result<Token, XPathError> {
        let start = self.pos;
        self.pos += 1;
        let body_start = self.pos;
        match self.input[body_start..].find(quote) {
            Some(len) => {
                self.pos = body_start + len + 1;
                Ok(Token::Literal(self.input[body_start..body_start + len].to_owned()))
            }
            None => Err(self.error("unterminated string literal", start)),
        }
    }

    fn ncname(&mut self) -> &'a str {
        let start = self.pos;
        if self.peek().is_some_and(is_ncname_start) {
            self.bump();
            while self.peek().is_some_and(is_ncname_char) {
                self.bump();
            }
        }
        &self.input[start..self.pos]
    }

    fn name(&mut self) -> Result<Token, XPathError> {
        let start = self.pos;
        let prefix = self.ncname();

        if self.operator_expected() {
            return match prefix {
                "and" => Ok(Token::And),
                "or" => Ok(Token::Or),
                "mod" => Ok(Token::Mod),
                "div" => Ok(Token::Div),
                other => Err(self.error(format!("expected operator, found '{other}'"), start)),
            };
        }

        if self.peek() == Some(':') && self.peek_nth(1) != Some(':') {
            match self.peek_nth(1) {
                Some('*') => {
                    self.pos += 2;
                    return Ok(Token::PrefixWildcard(prefix.to_owned()));
                }
                Some(c) if is_ncname_start(c) => {
                    self.pos += 1;
                    self.ncname();
                    return Ok(Token::Name(self.input[start..self.pos].to_owned()));
                }
                _ => return Err(self.error("malformed qualified name", start)),
            }
        }

        let after = self.input[self.pos..].trim_start_matches([' ', '\t', '\r', '\n']);
        let name = prefix.to_owned();
        if after.starts_with('(') {
            if NODE_TYPE_NAMES.contains(&prefix) {
                Ok(Token::NodeType(name))
            } else {
                Ok(Token::FunctionName(name))
            }
        } else if after.starts_with("::") {
            Ok(Token::AxisName(name))
        } else {
            Ok(Token::Name(name))
        }
    }
}

fn is_ncname_start(c: char) -> bool {
    c != ':' && is_name_start_char(c)
}

fn is_ncname_char(c: char) -> bool {
    c != ':' && is_name_char(c)
}

/// Tokenizes `input`.
///
/// # Errors
///
/// See [`Lexer::tokenize`].
pub fn tokenize(input: &str) -> Result<Vec<Spanned>, XPathError> {
    Lexer::new(input).tokenize()
}
