use devcon_ast::span::Span;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokKind {
    Eof,
    // punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Dot,
    // assignment
    Eq,
    // arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    // equality
    EqEq,
    BangEq,
    // relational
    Lt,
    Le,
    Gt,
    Ge,
    // logical
    AndAnd,
    OrOr,
    Bang,
    // idents / keywords
    Ident(String),
    KwTrue,
    KwFalse,
    KwNull,
    // literals
    Int(i32),
    Long(i64),
    Float(f64),
    Char(char),
    Str(String),
}

impl fmt::Display for TokKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokKind::Eof => write!(f, "end of input"),
            TokKind::LParen => write!(f, "`(`"),
            TokKind::RParen => write!(f, "`)`"),
            TokKind::LBrace => write!(f, "`{{`"),
            TokKind::RBrace => write!(f, "`}}`"),
            TokKind::Comma => write!(f, "`,`"),
            TokKind::Semicolon => write!(f, "`;`"),
            TokKind::Dot => write!(f, "`.`"),
            TokKind::Eq => write!(f, "`=`"),
            TokKind::Plus => write!(f, "`+`"),
            TokKind::Minus => write!(f, "`-`"),
            TokKind::Star => write!(f, "`*`"),
            TokKind::Slash => write!(f, "`/`"),
            TokKind::Percent => write!(f, "`%`"),
            TokKind::EqEq => write!(f, "`==`"),
            TokKind::BangEq => write!(f, "`!=`"),
            TokKind::Lt => write!(f, "`<`"),
            TokKind::Le => write!(f, "`<=`"),
            TokKind::Gt => write!(f, "`>`"),
            TokKind::Ge => write!(f, "`>=`"),
            TokKind::AndAnd => write!(f, "`&&`"),
            TokKind::OrOr => write!(f, "`||`"),
            TokKind::Bang => write!(f, "`!`"),
            TokKind::Ident(s) => write!(f, "identifier `{s}`"),
            TokKind::KwTrue => write!(f, "`true`"),
            TokKind::KwFalse => write!(f, "`false`"),
            TokKind::KwNull => write!(f, "`null`"),
            TokKind::Int(v) => write!(f, "integer `{v}`"),
            TokKind::Long(v) => write!(f, "integer `{v}L`"),
            TokKind::Float(v) => write!(f, "float `{v}`"),
            TokKind::Char(c) => write!(f, "char {c:?}"),
            TokKind::Str(s) => write!(f, "string {s:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tok {
    pub kind: TokKind,
    pub span: Span,
}
