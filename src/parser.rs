//! Recursive descent parser for frontmatter expressions
//!
//! Consumes the token stream from the lexer and builds an [`Expression`]. The
//! parser never rejects input: unknown functions, empty parentheses and
//! unbalanced parentheses become verbatim text in the tree, and so does
//! anything nested deeper than [`MAX_DEPTH`].

use crate::ast::{Expression, Operator, Segment, SourceSpan};
use crate::functions::{self, FunctionRegistry};
use crate::lexer::{self, Token, TokenKind};

/// Deepest call or group nesting parsed into the tree
///
/// Evaluation recurses once per level, including on rayon workers with small
/// stacks. Anything nested deeper is kept as literal text.
pub const MAX_DEPTH: usize = 64;

/// Parser over the tokens of one expression
pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    registry: &'a FunctionRegistry,
}

impl<'a> Parser<'a> {
    /// Create a parser that recognizes the built-in functions
    pub fn new(source: &'a str) -> Self {
        Self::with_registry(source, functions::registry())
    }

    /// Create a parser that recognizes the functions of `registry`
    pub fn with_registry(source: &'a str, registry: &'a FunctionRegistry) -> Self {
        Self {
            source,
            tokens: lexer::tokenize(source),
            registry,
        }
    }

    /// Parse the whole source
    pub fn parse(&self) -> Expression {
        self.parse_expression(0, self.tokens.len(), 0)
    }

    /// Parse `tokens[lo..hi]` as an operator chain or a single operand
    fn parse_expression(&self, lo: usize, hi: usize, depth: usize) -> Expression {
        let (lo, hi) = self.trim(lo, hi);
        if depth > MAX_DEPTH {
            tracing::debug!(depth, "nesting too deep, left as text");
            return Expression::Literal {
                text: self.text(lo, hi).to_string(),
                span: self.span(lo, hi),
            };
        }

        let mut operators = Vec::new();
        let mut bounds = Vec::new();
        let mut level: i32 = 0;
        let mut start = lo;
        for i in lo..hi {
            match self.tokens[i].kind {
                TokenKind::LeftParen => level += 1,
                TokenKind::RightParen => level -= 1,
                TokenKind::Plus | TokenKind::Minus if level == 0 => {
                    bounds.push((start, i));
                    operators.push(if self.tokens[i].kind == TokenKind::Plus {
                        Operator::Add
                    } else {
                        Operator::Subtract
                    });
                    start = i + 1;
                }
                _ => {}
            }
        }

        if operators.is_empty() {
            return self.parse_operand(lo, hi, depth);
        }

        // A dangling operator at the end has no right-hand operand.
        if start < hi {
            bounds.push((start, hi));
        }
        let operands = bounds
            .into_iter()
            .map(|(a, b)| {
                let (a, b) = self.trim(a, b);
                self.parse_operand(a, b, depth)
            })
            .collect();

        Expression::Chain {
            source: self.text(lo, hi).to_string(),
            operands,
            operators,
            span: self.span(lo, hi),
        }
    }

    /// Parse an operand: a whole call, a whole group, or a composite
    fn parse_operand(&self, lo: usize, hi: usize, depth: usize) -> Expression {
        if lo >= hi {
            return Expression::Literal {
                text: String::new(),
                span: self.span(lo, hi),
            };
        }

        if let Some(call) = self.parse_call(lo, hi, depth) {
            if call.1 == hi - 1 {
                return call.0;
            }
        }

        if self.tokens[lo].kind == TokenKind::LeftParen
            && self.matching_paren(lo, hi) == Some(hi - 1)
            && hi - lo > 2
        {
            return Expression::Group {
                inner: Box::new(self.parse_expression(lo + 1, hi - 1, depth + 1)),
                span: self.span(lo, hi),
            };
        }

        let segments = self.parse_segments(lo, hi, depth);
        if segments.iter().all(|s| matches!(s, Segment::Text(_))) {
            let text = segments
                .into_iter()
                .map(|s| match s {
                    Segment::Text(text) => text,
                    Segment::Expr(_) => String::new(),
                })
                .collect();
            return Expression::Literal {
                text,
                span: self.span(lo, hi),
            };
        }
        Expression::Composite {
            segments,
            span: self.span(lo, hi),
        }
    }

    /// Parse a known function call starting at `lo`
    ///
    /// Returns the call and the index of its closing parenthesis.
    fn parse_call(&self, lo: usize, hi: usize, depth: usize) -> Option<(Expression, usize)> {
        if lo + 1 >= hi
            || self.tokens[lo].kind != TokenKind::Identifier
            || self.tokens[lo + 1].kind != TokenKind::LeftParen
        {
            return None;
        }
        let name = self.text(lo, lo + 1);
        if !self.registry.has_function(name) {
            return None;
        }
        let close = self.matching_paren(lo + 1, hi)?;
        let args = self.parse_arguments(lo + 2, close, depth + 1);
        Some((
            Expression::Call {
                name: name.to_string(),
                args,
                span: self.span(lo, close + 1),
            },
            close,
        ))
    }

    /// Split call arguments on commas at depth zero
    ///
    /// An argument list ending in a comma has no trailing empty argument.
    fn parse_arguments(&self, lo: usize, hi: usize, depth: usize) -> Vec<Expression> {
        let mut args = Vec::new();
        let mut level: i32 = 0;
        let mut start = lo;
        for i in lo..hi {
            match self.tokens[i].kind {
                TokenKind::LeftParen => level += 1,
                TokenKind::RightParen => level -= 1,
                TokenKind::Comma if level == 0 => {
                    args.push(self.parse_expression(start, i, depth));
                    start = i + 1;
                }
                _ => {}
            }
        }
        if start < hi {
            args.push(self.parse_expression(start, hi, depth));
        }
        args
    }

    /// Break an operand into text, calls and groups
    fn parse_segments(&self, lo: usize, hi: usize, depth: usize) -> Vec<Segment> {
        let mut segments = Vec::new();
        if depth > MAX_DEPTH {
            push_text(&mut segments, self.text(lo, hi));
            return segments;
        }
        let mut i = lo;
        while i < hi {
            let token = &self.tokens[i];
            match token.kind {
                TokenKind::Identifier
                    if i + 1 < hi && self.tokens[i + 1].kind == TokenKind::LeftParen =>
                {
                    if let Some((call, close)) = self.parse_call(i, hi, depth) {
                        segments.push(Segment::Expr(call));
                        i = close + 1;
                    } else if let Some(close) = self.matching_paren(i + 1, hi) {
                        tracing::debug!(
                            name = self.text(i, i + 1),
                            "unknown function left as text"
                        );
                        push_text(&mut segments, self.text(i, i + 2));
                        for inner in self.parse_segments(i + 2, close, depth + 1) {
                            match inner {
                                Segment::Text(text) => push_text(&mut segments, &text),
                                expr => segments.push(expr),
                            }
                        }
                        push_text(&mut segments, self.text(close, close + 1));
                        i = close + 1;
                    } else {
                        push_text(&mut segments, self.text(i, i + 1));
                        i += 1;
                    }
                }
                TokenKind::LeftParen => match self.matching_paren(i, hi) {
                    Some(close) if close > i + 1 => {
                        segments.push(Segment::Expr(Expression::Group {
                            inner: Box::new(self.parse_expression(i + 1, close, depth + 1)),
                            span: self.span(i, close + 1),
                        }));
                        i = close + 1;
                    }
                    _ => {
                        push_text(&mut segments, self.text(i, i + 1));
                        i += 1;
                    }
                },
                _ => {
                    push_text(&mut segments, self.text(i, i + 1));
                    i += 1;
                }
            }
        }
        segments
    }

    /// Index of the parenthesis closing the one at `open`, searching before `hi`
    fn matching_paren(&self, open: usize, hi: usize) -> Option<usize> {
        let mut depth = 0usize;
        for i in open..hi {
            match self.tokens[i].kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Shrink a token range past leading and trailing whitespace
    fn trim(&self, mut lo: usize, mut hi: usize) -> (usize, usize) {
        while lo < hi && self.tokens[lo].kind == TokenKind::Whitespace {
            lo += 1;
        }
        while hi > lo && self.tokens[hi - 1].kind == TokenKind::Whitespace {
            hi -= 1;
        }
        (lo, hi)
    }

    /// Source text covered by `tokens[lo..hi]`
    fn text(&self, lo: usize, hi: usize) -> &'a str {
        if lo >= hi {
            return "";
        }
        &self.source[self.tokens[lo].span.start..self.tokens[hi - 1].span.end]
    }

    fn span(&self, lo: usize, hi: usize) -> SourceSpan {
        if lo >= hi {
            let offset = self
                .tokens
                .get(lo)
                .map(|t| t.span.start)
                .unwrap_or(self.source.len());
            return SourceSpan { offset, length: 0 };
        }
        let start = self.tokens[lo].span.start;
        SourceSpan {
            offset: start,
            length: self.tokens[hi - 1].span.end - start,
        }
    }
}

fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if let Some(Segment::Text(last)) = segments.last_mut() {
        last.push_str(text);
    } else {
        segments.push(Segment::Text(text.to_string()));
    }
}

/// Parse an expression with the built-in function set
pub fn parse(source: &str) -> Expression {
    let expression = Parser::new(source).parse();
    tracing::trace!(source, ?expression, "parsed expression");
    expression
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(expr: &Expression) -> &str {
        match expr {
            Expression::Literal { text, .. } => text,
            other => panic!("Expected literal, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_field_name() {
        assert_eq!(literal(&parse("  firstname ")), "firstname");
    }

    #[test]
    fn test_parse_function_call() {
        match parse("upper(firstname)") {
            Expression::Call { name, args, .. } => {
                assert_eq!(name, "upper");
                assert_eq!(args.len(), 1);
                assert_eq!(literal(&args[0]), "firstname");
            }
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_nested_call_arguments() {
        match parse("join(lowest(scores, 5, 25))") {
            Expression::Call { name, args, .. } => {
                assert_eq!(name, "join");
                assert_eq!(args.len(), 1);
                match &args[0] {
                    Expression::Call { name, args, .. } => {
                        assert_eq!(name, "lowest");
                        let texts: Vec<&str> = args.iter().map(literal).collect();
                        assert_eq!(texts, vec!["scores", "5", "25"]);
                    }
                    other => panic!("Expected inner call, got {:?}", other),
                }
            }
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_chain() {
        match parse("first(firstname) + last(lastname) - x") {
            Expression::Chain {
                operands,
                operators,
                source,
                ..
            } => {
                assert_eq!(source, "first(firstname) + last(lastname) - x");
                assert_eq!(operands.len(), 3);
                assert_eq!(operators, vec![Operator::Add, Operator::Subtract]);
                assert_eq!(operands[0].call_name(), Some("first"));
                assert_eq!(operands[1].call_name(), Some("last"));
                assert_eq!(literal(&operands[2]), "x");
            }
            other => panic!("Expected chain, got {:?}", other),
        }
    }

    #[test]
    fn test_operators_inside_calls_do_not_split() {
        let expr = parse("upper(friends - Bob)");
        assert_eq!(expr.call_name(), Some("upper"));
    }

    #[test]
    fn test_parse_group() {
        match parse("(friends - Bob)") {
            Expression::Group { inner, .. } => {
                assert!(matches!(*inner, Expression::Chain { .. }));
            }
            other => panic!("Expected group, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_function_is_text() {
        assert_eq!(literal(&parse("shout(firstname)")), "shout(firstname)");
    }

    #[test]
    fn test_known_call_inside_unknown_call_is_evaluated() {
        match parse("shout(upper(x))") {
            Expression::Composite { segments, .. } => {
                assert_eq!(segments.len(), 3);
                assert_eq!(segments[0], Segment::Text("shout(".to_string()));
                assert!(matches!(&segments[1], Segment::Expr(e) if e.call_name() == Some("upper")));
                assert_eq!(segments[2], Segment::Text(")".to_string()));
            }
            other => panic!("Expected composite, got {:?}", other),
        }
    }

    #[test]
    fn test_unbalanced_parens_are_text() {
        assert_eq!(literal(&parse("upper(firstname")), "upper(firstname");
        assert_eq!(literal(&parse("a)")), "a)");
        assert_eq!(literal(&parse("()")), "()");
    }

    #[test]
    fn test_operator_after_unmatched_close_does_not_split() {
        assert!(matches!(parse("a) + b"), Expression::Literal { .. }));
    }

    #[test]
    fn test_trailing_operator_keeps_single_operand() {
        match parse("firstname +") {
            Expression::Chain {
                operands,
                operators,
                ..
            } => {
                assert_eq!(operands.len(), 1);
                assert_eq!(operators.len(), 1);
            }
            other => panic!("Expected chain, got {:?}", other),
        }
    }

    #[test]
    fn test_trailing_comma_drops_empty_argument() {
        match parse("join(a,)") {
            Expression::Call { args, .. } => assert_eq!(args.len(), 1),
            other => panic!("Expected call, got {:?}", other),
        }
        match parse("join()") {
            Expression::Call { args, .. } => assert!(args.is_empty()),
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_display_round_trip() {
        let expr = parse("upper(friends - Bob) + join(a, b)");
        assert_eq!(expr.to_string(), "upper(friends - Bob) + join(a, b)");
        assert_eq!(expr.call_count(), 2);
    }

    #[test]
    fn test_spans() {
        let expr = parse("  upper(x) ");
        assert_eq!(expr.span(), SourceSpan { offset: 2, length: 8 });
    }

    fn call_depth(expr: &Expression) -> usize {
        match expr {
            Expression::Call { args, .. } => 1 + args.iter().map(call_depth).max().unwrap_or(0),
            _ => 0,
        }
    }

    #[test]
    fn test_deep_nesting_is_capped() {
        let depth = 10_000;
        let source = format!("{}x{}", "upper(".repeat(depth), ")".repeat(depth));
        let expr = parse(&source);
        assert_eq!(call_depth(&expr), MAX_DEPTH + 1);
        assert_eq!(expr.to_string(), source);
    }

    #[test]
    fn test_deep_groups_and_unknown_calls_are_capped() {
        let depth = 10_000;
        let groups = format!("{}x{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse(&groups).to_string(), groups);
        let unknown = format!("{}x{}", "shout(".repeat(depth), ")".repeat(depth));
        assert_eq!(literal(&parse(&unknown)), unknown);
    }
}

