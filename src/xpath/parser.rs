//! `XPath` 1.0 expression parser.
//!
//! A recursive descent parser over the [`Spanned`] tokens produced by the
//! lexer, one method per production of the `XPath` 1.0 grammar
//! (<https://www.w3.org/TR/xpath-10/#section-Grammar>).
//!
//! # Operator Precedence
//!
//! From lowest to highest:
//! 1. `or`
//! 2. `and`
//! 3. `=`, `!=`
//! 4. `<`, `<=`, `>`, `>=`
//! 5. `+`, `-`
//! 6. `*`, `div`, `mod`
//! 7. Unary `-`
//! 8. `|`
//! 9. Path and filter expressions

use super::ast::{Axis, BinaryOp, Expr, NodeTest, PathStart, Step};
use super::lexer::{tokenize, Spanned, Token};
use super::types::XPathError;

/// Deepest nesting of sub-expressions accepted. Parentheses, predicates,
/// function arguments, unary minus and each binary operator in a chain all
/// count one level.
const MAX_NESTING_DEPTH: usize = 128;

/// Parses an `XPath` expression string into an [`Expr`].
///
/// # Errors
///
/// Returns [`XPathError::InvalidExpression`] with the byte offset of the
/// offending token if `input` is not a valid `XPath` 1.0 expression.
///
/// # Examples
///
/// ```
/// use xmlsort::xpath::parser::parse;
///
/// assert!(parse("/xml/item[@id = 'a']").is_ok());
/// assert!(parse("/xml/item[").is_err());
/// ```
pub fn parse(input: &str) -> Result<Expr, XPathError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(XPathError::InvalidExpression {
            message: "empty expression".to_owned(),
            position: 0,
        });
    }

    let mut parser = Parser::new(tokens, input.len());
    let expr = parser.parse_expr()?;
    if let Some(token) = parser.peek() {
        return Err(parser.error(&format!("unexpected '{token}' after expression")));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Reported position for errors at the end of input.
    end: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>, end: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end,
            depth: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Token access helpers
    // -----------------------------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), XPathError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(&format!(
                "expected '{token}', found {}",
                self.describe_current()
            )))
        }
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos)?.token.clone();
        self.pos += 1;
        Some(token)
    }

    fn describe_current(&self) -> String {
        self.peek()
            .map_or_else(|| "end of expression".to_owned(), |t| format!("'{t}'"))
    }

    fn error(&self, message: &str) -> XPathError {
        XPathError::InvalidExpression {
            message: message.to_owned(),
            position: self.tokens.get(self.pos).map_or(self.end, |s| s.position),
        }
    }

    /// Enters one nesting level. Callers restore `depth` when done.
    fn descend(&mut self) -> Result<(), XPathError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(self.error(&format!(
                "expression nested too deeply (limit {MAX_NESTING_DEPTH})"
            )));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Operators
    // -----------------------------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, XPathError> {
        self.descend()?;
        let expr = self.parse_or_expr()?;
        self.depth -= 1;
        Ok(expr)
    }

    /// Parses one precedence level: `next (op next)*`, left associative.
    fn parse_binary_level(
        &mut self,
        ops: &[(Token, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, XPathError>,
    ) -> Result<Expr, XPathError> {
        let depth = self.depth;
        let mut left = next(self)?;
        'outer: loop {
            for (token, op) in ops {
                if self.eat(token) {
                    self.descend()?;
                    let right = next(self)?;
                    left = Expr::BinaryOp {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue 'outer;
                }
            }
            self.depth = depth;
            return Ok(left);
        }
    }

    fn parse_or_expr(&mut self) -> Result<Expr, XPathError> {
        self.parse_binary_level(&[(Token::Or, BinaryOp::Or)], Self::parse_and_expr)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, XPathError> {
        self.parse_binary_level(&[(Token::And, BinaryOp::And)], Self::parse_equality_expr)
    }

    fn parse_equality_expr(&mut self) -> Result<Expr, XPathError> {
        self.parse_binary_level(
            &[
                (Token::Equal, BinaryOp::Eq),
                (Token::NotEqual, BinaryOp::Neq),
            ],
            Self::parse_relational_expr,
        )
    }

    fn parse_relational_expr(&mut self) -> Result<Expr, XPathError> {
        self.parse_binary_level(
            &[
                (Token::LessThan, BinaryOp::Lt),
                (Token::LessThanEqual, BinaryOp::Lte),
                (Token::GreaterThan, BinaryOp::Gt),
                (Token::GreaterThanEqual, BinaryOp::Gte),
            ],
            Self::parse_additive_expr,
        )
    }

    fn parse_additive_expr(&mut self) -> Result<Expr, XPathError> {
        self.parse_binary_level(
            &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
            Self::parse_multiplicative_expr,
        )
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr, XPathError> {
        self.parse_binary_level(
            &[
                (Token::Multiply, BinaryOp::Mul),
                (Token::Div, BinaryOp::Div),
                (Token::Mod, BinaryOp::Mod),
            ],
            Self::parse_unary_expr,
        )
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, XPathError> {
        if self.eat(&Token::Minus) {
            self.descend()?;
            let operand = self.parse_unary_expr()?;
            self.depth -= 1;
            return Ok(Expr::UnaryNeg(Box::new(operand)));
        }
        self.parse_union_expr()
    }

    fn parse_union_expr(&mut self) -> Result<Expr, XPathError> {
        let depth = self.depth;
        let mut left = self.parse_path_expr()?;
        while self.eat(&Token::Pipe) {
            self.descend()?;
            let right = self.parse_path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    // -----------------------------------------------------------------------
    // Paths
    // -----------------------------------------------------------------------

    /// ```text
    /// PathExpr ::= LocationPath
    ///            | FilterExpr
    ///            | FilterExpr '/' RelativeLocationPath
    ///            | FilterExpr '//' RelativeLocationPath
    /// ```
    fn parse_path_expr(&mut self) -> Result<Expr, XPathError> {
        match self.peek() {
            Some(Token::Slash) => {
                self.advance();
                let steps = if self.is_step_start() {
                    self.parse_relative_location_path(Vec::new())?
                } else {
                    Vec::new()
                };
                Ok(Expr::Path {
                    start: PathStart::Root,
                    steps,
                })
            }
            Some(Token::DoubleSlash) => {
                self.advance();
                let steps = self.parse_relative_location_path(vec![Step::descendant_or_self_node()])?;
                Ok(Expr::Path {
                    start: PathStart::Root,
                    steps,
                })
            }
            _ if self.is_step_start() => {
                let steps = self.parse_relative_location_path(Vec::new())?;
                Ok(Expr::Path {
                    start: PathStart::Context,
                    steps,
                })
            }
            _ => {
                let filter = self.parse_filter_expr()?;
                let mut steps = Vec::new();
                if self.eat(&Token::Slash) {
                    steps = self.parse_relative_location_path(steps)?;
                } else if self.eat(&Token::DoubleSlash) {
                    steps = self.parse_relative_location_path(vec![Step::descendant_or_self_node()])?;
                } else {
                    return Ok(filter);
                }
                Ok(Expr::Path {
                    start: PathStart::Expr(Box::new(filter)),
                    steps,
                })
            }
        }
    }

    /// ```text
    /// RelativeLocationPath ::= Step (('/' | '//') Step)*
    /// ```
    ///
    /// Steps are appended to `steps`, which may already hold the expansion
    /// of a leading `//`.
    fn parse_relative_location_path(
        &mut self,
        mut steps: Vec<Step>,
    ) -> Result<Vec<Step>, XPathError> {
        steps.push(self.parse_step()?);
        loop {
            if self.eat(&Token::Slash) {
                steps.push(self.parse_step()?);
            } else if self.eat(&Token::DoubleSlash) {
                steps.push(Step::descendant_or_self_node());
                steps.push(self.parse_step()?);
            } else {
                return Ok(steps);
            }
        }
    }

    fn is_step_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Dot
                    | Token::DotDot
                    | Token::At
                    | Token::AxisName(_)
                    | Token::Name(_)
                    | Token::Wildcard
                    | Token::PrefixWildcard(_)
                    | Token::NodeType(_)
            )
        )
    }

    /// ```text
    /// Step ::= AxisSpecifier NodeTest Predicate* | '.' | '..'
    /// ```
    fn parse_step(&mut self) -> Result<Step, XPathError> {
        if self.eat(&Token::Dot) {
            return Ok(Step::new(Axis::SelfAxis, NodeTest::Node));
        }
        if self.eat(&Token::DotDot) {
            return Ok(Step::new(Axis::Parent, NodeTest::Node));
        }

        let axis = self.parse_axis_specifier()?;
        let node_test = self.parse_node_test()?;
        let predicates = self.parse_predicates()?;
        Ok(Step {
            axis,
            node_test,
            predicates,
        })
    }

    fn parse_axis_specifier(&mut self) -> Result<Axis, XPathError> {
        match self.peek() {
            Some(Token::At) => {
                self.advance();
                Ok(Axis::Attribute)
            }
            Some(Token::AxisName(name)) => {
                let axis = Axis::parse(name)
                    .ok_or_else(|| self.error(&format!("unknown axis '{name}'")))?;
                self.advance();
                self.expect(&Token::ColonColon)?;
                Ok(axis)
            }
            _ => Ok(Axis::Child),
        }
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, XPathError> {
        match self.peek().cloned() {
            Some(Token::Name(name)) => {
                self.advance();
                Ok(NodeTest::Name(name))
            }
            Some(Token::Wildcard) => {
                self.advance();
                Ok(NodeTest::Wildcard)
            }
            Some(Token::PrefixWildcard(prefix)) => {
                self.advance();
                Ok(NodeTest::PrefixWildcard(prefix))
            }
            Some(Token::NodeType(kind)) => {
                self.advance();
                self.expect(&Token::LeftParen)?;
                let test = match kind.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => {
                        let target = match self.peek() {
                            Some(Token::Literal(target)) => {
                                let target = target.clone();
                                self.advance();
                                Some(target)
                            }
                            _ => None,
                        };
                        NodeTest::ProcessingInstruction(target)
                    }
                };
                self.expect(&Token::RightParen)?;
                Ok(test)
            }
            _ => Err(self.error(&format!(
                "expected a node test, found {}",
                self.describe_current()
            ))),
        }
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, XPathError> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LeftBracket) {
            predicates.push(self.parse_expr()?);
            self.expect(&Token::RightBracket)?;
        }
        Ok(predicates)
    }

    // -----------------------------------------------------------------------
    // Primary expressions
    // -----------------------------------------------------------------------

    /// ```text
    /// FilterExpr ::= PrimaryExpr Predicate*
    /// ```
    fn parse_filter_expr(&mut self) -> Result<Expr, XPathError> {
        let primary = self.parse_primary_expr()?;
        let predicates = self.parse_predicates()?;
        if predicates.is_empty() {
            Ok(primary)
        } else {
            Ok(Expr::Filter {
                expr: Box::new(primary),
                predicates,
            })
        }
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, XPathError> {
        match self.peek().cloned() {
            Some(Token::LeftParen) => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&Token::RightParen)?;
                Ok(inner)
            }
            Some(Token::Literal(s)) => {
                self.advance();
                Ok(Expr::String(s))
            }
            Some(Token::Number(n)) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Some(Token::FunctionName(name)) => {
                self.advance();
                self.parse_function_args(name)
            }
            _ => Err(self.error(&format!(
                "expected an expression, found {}",
                self.describe_current()
            ))),
        }
    }

    fn parse_function_args(&mut self, name: String) -> Result<Expr, XPathError> {
        self.expect(&Token::LeftParen)?;
        let mut args = Vec::new();
        if !self.eat(&Token::RightParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.eat(&Token::RightParen) {
                    break;
                }
                self.expect(&Token::Comma)?;
            }
        }
        Ok(Expr::FunctionCall { name, args })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn p(input: &str) -> Expr {
        parse(input).unwrap()
    }

    fn child(name: &str) -> Step {
        Step::new(Axis::Child, NodeTest::Name(name.to_owned()))
    }

    fn error_position(input: &str) -> usize {
        match parse(input).unwrap_err() {
            XPathError::InvalidExpression { position, .. } => position,
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_parse_root_only() {
        assert_eq!(
            p("/"),
            Expr::Path {
                start: PathStart::Root,
                steps: vec![]
            }
        );
    }

    #[test]
    fn test_parse_absolute_path() {
        assert_eq!(
            p("/xml/item"),
            Expr::Path {
                start: PathStart::Root,
                steps: vec![child("xml"), child("item")]
            }
        );
    }

    #[test]
    fn test_parse_double_slash() {
        assert_eq!(
            p("//item"),
            Expr::Path {
                start: PathStart::Root,
                steps: vec![Step::descendant_or_self_node(), child("item")]
            }
        );
    }

    #[test]
    fn test_parse_abbreviations() {
        assert_eq!(
            p("./@id"),
            Expr::Path {
                start: PathStart::Context,
                steps: vec![
                    Step::new(Axis::SelfAxis, NodeTest::Node),
                    Step::new(Axis::Attribute, NodeTest::Name("id".to_owned())),
                ]
            }
        );
        assert_eq!(
            p(".."),
            Expr::Path {
                start: PathStart::Context,
                steps: vec![Step::new(Axis::Parent, NodeTest::Node)]
            }
        );
    }

    #[test]
    fn test_parse_explicit_axis_and_node_types() {
        assert_eq!(
            p("following-sibling::processing-instruction('x')"),
            Expr::Path {
                start: PathStart::Context,
                steps: vec![Step::new(
                    Axis::FollowingSibling,
                    NodeTest::ProcessingInstruction(Some("x".to_owned()))
                )]
            }
        );
        assert_eq!(
            p("text()"),
            Expr::Path {
                start: PathStart::Context,
                steps: vec![Step::new(Axis::Child, NodeTest::Text)]
            }
        );
    }

    #[test]
    fn test_parse_predicates() {
        let Expr::Path { steps, .. } = p("item[@id='a'][2]") else {
            panic!("expected a path");
        };
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].predicates.len(), 2);
        assert_eq!(steps[0].predicates[1], Expr::Number(2.0));
    }

    #[test]
    fn test_parse_filter_then_steps() {
        assert_eq!(
            p("(a | b)/c"),
            Expr::Path {
                start: PathStart::Expr(Box::new(Expr::Union(
                    Box::new(Expr::Path {
                        start: PathStart::Context,
                        steps: vec![child("a")]
                    }),
                    Box::new(Expr::Path {
                        start: PathStart::Context,
                        steps: vec![child("b")]
                    }),
                ))),
                steps: vec![child("c")]
            }
        );
    }

    #[test]
    fn test_parse_filter_with_predicate() {
        assert!(matches!(p("(//a)[1]"), Expr::Filter { .. }));
    }

    #[test]
    fn test_parse_operator_precedence() {
        assert_eq!(
            p("1 + 2 * 3"),
            Expr::BinaryOp {
                op: BinaryOp::Add,
                left: Box::new(Expr::Number(1.0)),
                right: Box::new(Expr::BinaryOp {
                    op: BinaryOp::Mul,
                    left: Box::new(Expr::Number(2.0)),
                    right: Box::new(Expr::Number(3.0)),
                }),
            }
        );
        assert!(matches!(
            p("a or b and c"),
            Expr::BinaryOp {
                op: BinaryOp::Or,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_left_associative() {
        assert_eq!(
            p("8 - 4 - 2"),
            Expr::BinaryOp {
                op: BinaryOp::Sub,
                left: Box::new(Expr::BinaryOp {
                    op: BinaryOp::Sub,
                    left: Box::new(Expr::Number(8.0)),
                    right: Box::new(Expr::Number(4.0)),
                }),
                right: Box::new(Expr::Number(2.0)),
            }
        );
    }

    #[test]
    fn test_parse_function_calls() {
        assert_eq!(
            p("concat('a', name(), 1)"),
            Expr::FunctionCall {
                name: "concat".to_owned(),
                args: vec![
                    Expr::String("a".to_owned()),
                    Expr::FunctionCall {
                        name: "name".to_owned(),
                        args: vec![]
                    },
                    Expr::Number(1.0),
                ]
            }
        );
    }

    #[test]
    fn test_parse_double_negation() {
        assert_eq!(
            p("--1"),
            Expr::UnaryNeg(Box::new(Expr::UnaryNeg(Box::new(Expr::Number(1.0)))))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(error_position(""), 0);
        assert_eq!(error_position("/xml/item["), 10);
        assert_eq!(error_position("count(a"), 7);
        assert_eq!(error_position("a]"), 1);
        assert_eq!(error_position("bogus::a"), 0);
        assert_eq!(error_position("@"), 1);
    }

    fn nesting_error(input: &str) -> String {
        match parse(input).unwrap_err() {
            XPathError::InvalidExpression { message, .. } => message,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_rejects_deep_nesting() {
        let parens = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        let predicates = format!("a{}", "[a".repeat(10_000));
        let negations = format!("{}1", "-".repeat(10_000));
        let chain = format!("1{}", " + 1".repeat(10_000));
        let unions = format!("a{}", " | a".repeat(10_000));
        for input in [&parens, &predicates, &negations, &chain, &unions] {
            assert!(
                nesting_error(input).contains("nested too deeply"),
                "{}",
                &input[..20]
            );
        }
    }

    #[test]
    fn test_parse_accepts_moderate_nesting() {
        let parens = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(p(&parens), Expr::Number(1.0));
        let args = format!("{}'x'{}", "concat(".repeat(50), ", 'y')".repeat(50));
        assert!(parse(&args).is_ok());
        let chain = format!("1{}", " + 1".repeat(100));
        assert!(parse(&chain).is_ok());
    }
}
