use devcon_ast::span::Span;
use thiserror::Error;

/// Lexical errors. Every variant records the byte offset where it was found.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("invalid character {ch:?} at {pos}")]
    InvalidChar { ch: char, pos: u32 },
    #[error("unterminated string literal starting at {pos}")]
    UnterminatedString { pos: u32 },
    #[error("unterminated character literal starting at {pos}")]
    UnterminatedChar { pos: u32 },
    #[error("empty character literal at {pos}")]
    EmptyChar { pos: u32 },
    #[error("invalid number literal `{text}` at {pos}")]
    BadNumber { text: String, pos: u32 },
}

impl LexError {
    pub fn pos(&self) -> u32 {
        match self {
            LexError::InvalidChar { pos, .. }
            | LexError::UnterminatedString { pos }
            | LexError::UnterminatedChar { pos }
            | LexError::EmptyChar { pos }
            | LexError::BadNumber { pos, .. } => *pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected {expected}, found {found} at {}..{}", .span.start, .span.end)]
    Unexpected {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("expression nesting exceeds {limit} levels at {}", .span.start)]
    TooDeep { limit: usize, span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::Unexpected { span, .. } | ParseError::TooDeep { span, .. } => *span,
        }
    }
}

/// Anything that can go wrong turning source text into a program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}
