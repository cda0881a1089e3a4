//! Lexer for frontmatter expressions
//!
//! Expressions are tokenized once before parsing. Every token keeps its byte
//! span so the parser can echo any region it does not understand verbatim.
//! Tokenizing never fails: characters with no special meaning are grouped into
//! `Text` runs.

use serde::Serialize;

/// Byte range of a token in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A token with its kind and position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Token types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier, // [A-Za-z_][A-Za-z0-9_]*
    LeftParen,  // (
    RightParen, // )
    Comma,      // ,
    Plus,       // +
    Minus,      // -
    Whitespace,
    Text,
}

/// Lexer that converts expression text to tokens
pub struct Lexer<'a> {
    source: &'a str,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            tokens: Vec::new(),
        }
    }

    /// Tokenize the whole source
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut chars = self.source.char_indices().peekable();

        while let Some((start, c)) = chars.next() {
            let kind = match c {
                '(' => TokenKind::LeftParen,
                ')' => TokenKind::RightParen,
                ',' => TokenKind::Comma,
                '+' => TokenKind::Plus,
                '-' => TokenKind::Minus,
                c if c.is_whitespace() => {
                    while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
                    TokenKind::Whitespace
                }
                c if is_identifier_start(c) => {
                    while chars.next_if(|(_, c)| is_identifier_char(*c)).is_some() {}
                    TokenKind::Identifier
                }
                _ => {
                    while chars.next_if(|(_, c)| is_text_char(*c)).is_some() {}
                    TokenKind::Text
                }
            };
            let end = chars
                .peek()
                .map(|(offset, _)| *offset)
                .unwrap_or(self.source.len());
            self.tokens.push(Token {
                kind,
                span: Span { start, end },
            });
        }

        self.tokens
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_text_char(c: char) -> bool {
    !matches!(c, '(' | ')' | ',' | '+' | '-') && !c.is_whitespace() && !is_identifier_start(c)
}

/// Convenience wrapper around [`Lexer::tokenize`]
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}
