use crate::error::LexError;
use crate::token::{Tok, TokKind};
use devcon_ast::span::Span;

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            done: false,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek2(&self) -> Option<char> {
        let mut it = self.src[self.pos..].chars();
        it.next();
        it.next()
    }

    fn span(&self, start: usize) -> Span {
        Span {
            start: start as u32,
            end: self.pos as u32,
        }
    }

    fn tok(&self, kind: TokKind, start: usize) -> Tok {
        Tok {
            kind,
            span: self.span(start),
        }
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            while matches!(self.peek(), Some(c) if c.is_whitespace()) {
                self.bump();
            }
            // line comment: //
            if self.peek() == Some('/') && self.peek2() == Some('/') {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
                continue;
            }
            break;
        }
    }

    pub fn next_tok(&mut self) -> Result<Tok, LexError> {
        self.skip_ws_and_comments();
        let start = self.pos;
        let Some(c) = self.bump() else {
            return Ok(self.tok(TokKind::Eof, start));
        };

        // 2-char operators first
        let double = match (c, self.peek()) {
            ('&', Some('&')) => Some(TokKind::AndAnd),
            ('|', Some('|')) => Some(TokKind::OrOr),
            ('=', Some('=')) => Some(TokKind::EqEq),
            ('!', Some('=')) => Some(TokKind::BangEq),
            ('<', Some('=')) => Some(TokKind::Le),
            ('>', Some('=')) => Some(TokKind::Ge),
            _ => None,
        };
        if let Some(k) = double {
            self.bump();
            return Ok(self.tok(k, start));
        }

        // 1-char punctuation/operators
        let single = match c {
            '(' => Some(TokKind::LParen),
            ')' => Some(TokKind::RParen),
            '{' => Some(TokKind::LBrace),
            '}' => Some(TokKind::RBrace),
            ',' => Some(TokKind::Comma),
            ';' => Some(TokKind::Semicolon),
            '.' => Some(TokKind::Dot),
            '=' => Some(TokKind::Eq),
            '+' => Some(TokKind::Plus),
            '-' => Some(TokKind::Minus),
            '*' => Some(TokKind::Star),
            '/' => Some(TokKind::Slash),
            '%' => Some(TokKind::Percent),
            '<' => Some(TokKind::Lt),
            '>' => Some(TokKind::Gt),
            '!' => Some(TokKind::Bang),
            _ => None,
        };
        if let Some(k) = single {
            return Ok(self.tok(k, start));
        }

        if c == '"' {
            return self.lex_string(start);
        }
        if c == '\'' {
            return self.lex_char(start);
        }
        if c.is_ascii_digit() {
            return self.lex_number(c, start);
        }

        // ident / keywords
        if c.is_alphabetic() || c == '_' {
            let mut s = String::from(c);
            while let Some(ch) = self.peek() {
                if ch.is_alphanumeric() || ch == '_' {
                    s.push(ch);
                    self.bump();
                } else {
                    break;
                }
            }
            let kind = match s.as_str() {
                "true" => TokKind::KwTrue,
                "false" => TokKind::KwFalse,
                "null" => TokKind::KwNull,
                _ => TokKind::Ident(s),
            };
            return Ok(self.tok(kind, start));
        }

        Err(LexError::InvalidChar {
            ch: c,
            pos: start as u32,
        })
    }

    fn lex_string(&mut self, start: usize) -> Result<Tok, LexError> {
        let mut s = String::new();
        loop {
            let Some(ch) = self.bump() else {
                return Err(LexError::UnterminatedString { pos: start as u32 });
            };
            match ch {
                '"' => break,
                '\\' => {
                    let Some(esc) = self.bump() else {
                        return Err(LexError::UnterminatedString { pos: start as u32 });
                    };
                    s.push(escape(esc));
                }
                _ => s.push(ch),
            }
        }
        Ok(self.tok(TokKind::Str(s), start))
    }

    fn lex_char(&mut self, start: usize) -> Result<Tok, LexError> {
        let value = match self.bump() {
            None | Some('\n') => return Err(LexError::UnterminatedChar { pos: start as u32 }),
            Some('\'') => return Err(LexError::EmptyChar { pos: start as u32 }),
            Some('\\') => match self.bump() {
                Some(esc) => escape(esc),
                None => return Err(LexError::UnterminatedChar { pos: start as u32 }),
            },
            Some(ch) => ch,
        };
        if self.bump() != Some('\'') {
            return Err(LexError::UnterminatedChar { pos: start as u32 });
        }
        Ok(self.tok(TokKind::Char(value), start))
    }

    fn lex_number(&mut self, first: char, start: usize) -> Result<Tok, LexError> {
        let mut s = String::from(first);
        let mut dot = false;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                s.push(ch);
                self.bump();
            } else if ch == '.' && !dot && matches!(self.peek2(), Some(d) if d.is_ascii_digit()) {
                // `1.5` is a float; `1.foo` is a member access on `1`
                dot = true;
                s.push('.');
                self.bump();
            } else {
                break;
            }
        }

        let wide = !dot && matches!(self.peek(), Some('l' | 'L'));
        if wide {
            self.bump();
        }

        // trailing identifier characters make the literal malformed: `12ab`
        if matches!(self.peek(), Some(ch) if ch.is_alphanumeric() || ch == '_') {
            while let Some(ch) = self.peek() {
                if ch.is_alphanumeric() || ch == '_' {
                    s.push(ch);
                    self.bump();
                } else {
                    break;
                }
            }
            return Err(LexError::BadNumber {
                text: s,
                pos: start as u32,
            });
        }

        let bad = |s: &str| LexError::BadNumber {
            text: s.to_string(),
            pos: start as u32,
        };
        let kind = if dot {
            TokKind::Float(s.parse().map_err(|_| bad(&s))?)
        } else if wide {
            TokKind::Long(s.parse().map_err(|_| bad(&s))?)
        } else {
            TokKind::Int(s.parse().map_err(|_| bad(&s))?)
        };
        Ok(self.tok(kind, start))
    }
}

fn escape(esc: char) -> char {
    match esc {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        _ => esc,
    }
}

/// The lexer is a finite, single-pass token stream. It yields `Eof` once
/// and then stops; after an error it yields nothing further.
impl Iterator for Lexer<'_> {
    type Item = Result<Tok, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let tok = self.next_tok();
        match &tok {
            Ok(Tok {
                kind: TokKind::Eof, ..
            })
            | Err(_) => self.done = true,
            Ok(_) => {}
        }
        Some(tok)
    }
}

/// Lex a whole source string, ending with an `Eof` token.
pub fn tokenize(src: &str) -> Result<Vec<Tok>, LexError> {
    Lexer::new(src).collect()
}
