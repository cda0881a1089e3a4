//! Abstract Syntax Tree for frontmatter expressions
//!
//! An expression is either a single operand or a left-to-right chain of
//! operands joined by `+`/`-`. Operands are literals, calls to built-in
//! functions, parenthesized groups, or composites: text with calls and groups
//! embedded in it whose results are spliced back before the text is resolved.

use serde::Serialize;
use std::fmt;

/// Source location of a node, as a byte offset and length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceSpan {
    pub offset: usize,
    pub length: usize,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operator {
    Add,
    Subtract,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Add => write!(f, "+"),
            Operator::Subtract => write!(f, "-"),
        }
    }
}

/// Expression (produces a value)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expression {
    /// Bare text: a field name, a number, or anything else echoed back
    Literal { text: String, span: SourceSpan },

    /// Built-in function call: `upper(firstname)`
    Call {
        name: String,
        args: Vec<Expression>,
        span: SourceSpan,
    },

    /// Parenthesized expression: `(friends - Bob)`
    Group {
        inner: Box<Expression>,
        span: SourceSpan,
    },

    /// Text with embedded calls or groups: `chapter(upper(x))`
    Composite {
        segments: Vec<Segment>,
        span: SourceSpan,
    },

    /// Operands combined left to right: `a + b - c`
    ///
    /// `operators[i]` joins `operands[i]` and `operands[i + 1]`. An expression
    /// ending in an operator keeps that operator with no right-hand operand.
    Chain {
        source: String,
        operands: Vec<Expression>,
        operators: Vec<Operator>,
        span: SourceSpan,
    },
}

/// Piece of a composite operand
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Segment {
    Text(String),
    Expr(Expression),
}

impl Expression {
    pub fn span(&self) -> SourceSpan {
        match self {
            Expression::Literal { span, .. }
            | Expression::Call { span, .. }
            | Expression::Group { span, .. }
            | Expression::Composite { span, .. }
            | Expression::Chain { span, .. } => *span,
        }
    }

    /// Name of the function when the whole expression is a single call
    pub fn call_name(&self) -> Option<&str> {
        match self {
            Expression::Call { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Count of calls anywhere in the tree
    pub fn call_count(&self) -> usize {
        match self {
            Expression::Literal { .. } => 0,
            Expression::Call { args, .. } => 1 + args.iter().map(Self::call_count).sum::<usize>(),
            Expression::Group { inner, .. } => inner.call_count(),
            Expression::Composite { segments, .. } => segments
                .iter()
                .map(|segment| match segment {
                    Segment::Text(_) => 0,
                    Segment::Expr(expr) => expr.call_count(),
                })
                .sum(),
            Expression::Chain { operands, .. } => operands.iter().map(Self::call_count).sum(),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal { text, .. } => write!(f, "{}", text),
            Expression::Call { name, args, .. } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expression::Group { inner, .. } => write!(f, "({})", inner),
            Expression::Composite { segments, .. } => {
                for segment in segments {
                    match segment {
                        Segment::Text(text) => write!(f, "{}", text)?,
                        Segment::Expr(expr) => write!(f, "{}", expr)?,
                    }
                }
                Ok(())
            }
            Expression::Chain {
                operands,
                operators,
                ..
            } => {
                for (i, operator) in operators.iter().enumerate() {
                    if let Some(operand) = operands.get(i) {
                        write!(f, "{} ", operand)?;
                    }
                    write!(f, "{}", operator)?;
                    if i + 1 < operands.len() {
                        write!(f, " ")?;
                    }
                }
                if let Some(last) = operands.get(operators.len()) {
                    write!(f, "{}", last)?;
                }
                Ok(())
            }
        }
    }
}
