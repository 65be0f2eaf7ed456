use crate::error::{LexError, ParseError, SyntaxError};
use crate::lexer::Lexer;
use crate::token::{Tok, TokKind};
use devcon_ast::ast::{BinOp, Expr, Ident, Lit, Program, UnOp};
use devcon_ast::span::Span;
use std::collections::VecDeque;
use std::rc::Rc;

/// Maximum expression nesting depth. Every link of a left-associative chain
/// (`a + b + c`, `f()()`, `a.b.c`) counts as one level.
pub const MAX_NESTING: usize = 128;

/// Parse console source text into a program.
pub fn parse_str(src: &str) -> Result<Program, SyntaxError> {
    let mut p = Parser::new(Lexer::new(src));
    p.parse_program()
}

/// Parse an already-lexed token sequence.
pub fn parse_tokens(tokens: Vec<Tok>) -> Result<Program, SyntaxError> {
    let mut p = Parser::new(tokens.into_iter().map(Ok));
    p.parse_program()
}

struct Parser<I: Iterator<Item = Result<Tok, LexError>>> {
    toks: I,
    /// Tokens pulled from the stream but not yet consumed; `buf[0]` is current.
    buf: VecDeque<Tok>,
    last_end: u32,
    /// End of the most recently consumed token.
    prev_end: u32,
    depth: usize,
}

type PResult<T> = Result<T, SyntaxError>;

impl<I: Iterator<Item = Result<Tok, LexError>>> Parser<I> {
    fn new(toks: I) -> Self {
        Self {
            toks,
            buf: VecDeque::new(),
            last_end: 0,
            prev_end: 0,
            depth: 0,
        }
    }

    /// Ensure at least `n + 1` tokens are buffered. A stream that ends
    /// without `Eof` is padded with one.
    fn fill(&mut self, n: usize) -> PResult<()> {
        while self.buf.len() <= n {
            let tok = match self.toks.next() {
                Some(t) => t?,
                None => Tok {
                    kind: TokKind::Eof,
                    span: Span::new(self.last_end, self.last_end),
                },
            };
            self.last_end = tok.span.end;
            self.buf.push_back(tok);
        }
        Ok(())
    }

    fn peek(&mut self, n: usize) -> PResult<&Tok> {
        self.fill(n)?;
        Ok(&self.buf[n])
    }

    fn cur(&mut self) -> PResult<&Tok> {
        self.peek(0)
    }

    fn at(&mut self, k: &TokKind) -> PResult<bool> {
        let cur = self.cur()?;
        Ok(std::mem::discriminant(&cur.kind) == std::mem::discriminant(k))
    }

    fn bump(&mut self) -> PResult<Tok> {
        self.fill(0)?;
        let tok = self.buf.pop_front().ok_or_else(|| {
            SyntaxError::Parse(ParseError::Unexpected {
                expected: "token".into(),
                found: "end of input".into(),
                span: Span::new(self.last_end, self.last_end),
            })
        })?;
        self.prev_end = tok.span.end;
        Ok(tok)
    }

    fn unexpected<T>(&mut self, expected: &str) -> PResult<T> {
        let cur = self.cur()?;
        Err(SyntaxError::Parse(ParseError::Unexpected {
            expected: expected.to_string(),
            found: cur.kind.to_string(),
            span: cur.span,
        }))
    }

    fn expect(&mut self, k: TokKind) -> PResult<Tok> {
        if self.at(&k)? {
            self.bump()
        } else {
            self.unexpected(&k.to_string())
        }
    }

    // ======= program / statements =======

    fn parse_program(&mut self) -> PResult<Program> {
        let start = self.cur()?.span.start;
        let mut stmts = Vec::new();
        while !self.at(&TokKind::Eof)? {
            stmts.push(self.parse_stmt()?);
            self.expect(TokKind::Semicolon)?;
        }
        let end = self.cur()?.span.end;
        Ok(Program {
            stmts,
            span: Span::new(start, end),
        })
    }

    /// `statement := assignment | expression`
    fn parse_stmt(&mut self) -> PResult<Expr> {
        let is_assign = matches!(self.cur()?.kind, TokKind::Ident(_))
            && matches!(self.peek(1)?.kind, TokKind::Eq);
        if !is_assign {
            return self.parse_expr_bp(0);
        }
        let name = self.parse_ident()?;
        self.expect(TokKind::Eq)?;
        let value = self.parse_expr_bp(0)?;
        let span = name.span.to(value.span());
        Ok(Expr::Assign {
            name,
            value: Box::new(value),
            span,
        })
    }

    fn parse_ident(&mut self) -> PResult<Ident> {
        let TokKind::Ident(text) = self.cur()?.kind.clone() else {
            return self.unexpected("identifier");
        };
        let tok = self.bump()?;
        Ok(Ident {
            text,
            span: tok.span,
        })
    }

    // ======= function literals =======

    /// At `(`: decide whether this opens a function literal rather than a
    /// parenthesized expression. `()`, `(a,` and `(a) {` are function heads.
    fn at_func_literal(&mut self) -> PResult<bool> {
        let k1 = self.peek(1)?.kind.clone();
        match k1 {
            TokKind::RParen => Ok(true),
            TokKind::Ident(_) => {
                let k2 = self.peek(2)?.kind.clone();
                match k2 {
                    TokKind::Comma => Ok(true),
                    TokKind::RParen => Ok(matches!(self.peek(3)?.kind, TokKind::LBrace)),
                    _ => Ok(false),
                }
            }
            _ => Ok(false),
        }
    }

    fn parse_func(&mut self) -> PResult<Expr> {
        let start = self.expect(TokKind::LParen)?.span.start;

        let mut params = Vec::new();
        if !self.at(&TokKind::RParen)? {
            params.push(self.parse_ident()?);
            while self.at(&TokKind::Comma)? {
                self.bump()?;
                params.push(self.parse_ident()?);
            }
        }
        self.expect(TokKind::RParen)?;

        self.expect(TokKind::LBrace)?;
        let mut body = Vec::new();
        while !self.at(&TokKind::RBrace)? {
            body.push(self.parse_stmt()?);
            self.expect(TokKind::Semicolon)?;
        }
        let end_tok = self.expect(TokKind::RBrace)?;

        Ok(Expr::Func {
            params,
            body: Rc::new(body),
            span: Span::new(start, end_tok.span.end),
        })
    }

    // ======= expressions (Pratt parser) =======
    //
    // Precedence (low -> high):
    //   1:  ||
    //   3:  &&
    //   5:  == !=
    //   7:  < <= > >=
    //   10: + -
    //   20: * / %
    // prefix (unary) binds at 100; call and `.member` postfixes bind tightest

    fn parse_expr_bp(&mut self, min_bp: u8) -> PResult<Expr> {
        let entry = self.depth;
        let result = self
            .nest()
            .and_then(|()| self.parse_expr_inner(min_bp));
        self.depth = entry;
        result
    }

    /// Go one level deeper, failing past [`MAX_NESTING`].
    fn nest(&mut self) -> PResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            let span = self.cur()?.span;
            return Err(SyntaxError::Parse(ParseError::TooDeep {
                limit: MAX_NESTING,
                span,
            }));
        }
        Ok(())
    }

    /// Chain links stay counted until `parse_expr_bp` restores the depth.
    fn parse_expr_inner(&mut self, min_bp: u8) -> PResult<Expr> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let kind = self.cur()?.kind.clone();
            let (op, lbp, rbp) = match kind {
                // logical
                TokKind::OrOr => (BinOp::Or, 1, 2),
                TokKind::AndAnd => (BinOp::And, 3, 4),
                // equality
                TokKind::EqEq => (BinOp::Eq, 5, 6),
                TokKind::BangEq => (BinOp::Ne, 5, 6),
                // relational
                TokKind::Lt => (BinOp::Lt, 7, 8),
                TokKind::Le => (BinOp::Le, 7, 8),
                TokKind::Gt => (BinOp::Gt, 7, 8),
                TokKind::Ge => (BinOp::Ge, 7, 8),
                // arithmetic
                TokKind::Plus => (BinOp::Add, 10, 11),
                TokKind::Minus => (BinOp::Sub, 10, 11),
                TokKind::Star => (BinOp::Mul, 20, 21),
                TokKind::Slash => (BinOp::Div, 20, 21),
                TokKind::Percent => (BinOp::Rem, 20, 21),
                // call application (tightest, left-associative: f()())
                TokKind::LParen => {
                    self.nest()?;
                    let args = self.parse_call_args()?;
                    let span = Span::new(lhs.span().start, self.prev_end);
                    lhs = Expr::Call {
                        callee: Box::new(lhs),
                        args,
                        span,
                    };
                    continue;
                }
                // member access
                TokKind::Dot => {
                    self.nest()?;
                    self.bump()?;
                    let name = self.parse_ident()?;
                    let span = lhs.span().to(name.span);
                    lhs = Expr::Member {
                        target: Box::new(lhs),
                        name,
                        span,
                    };
                    continue;
                }
                _ => break,
            };

            if lbp < min_bp {
                break;
            }
            self.nest()?;
            self.bump()?; // consume operator
            let rhs = self.parse_expr_bp(rbp)?;
            let span = lhs.span().to(rhs.span());
            lhs = Expr::Binary {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
                span,
            };
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> PResult<Expr> {
        // Snapshot current token to avoid borrow issues when bumping
        let tok = self.cur()?.clone();

        match tok.kind {
            // unary prefix
            TokKind::Bang | TokKind::Minus => {
                self.bump()?;
                let op = if tok.kind == TokKind::Bang {
                    UnOp::Not
                } else {
                    UnOp::Neg
                };
                let inner = self.parse_expr_bp(100)?;
                let span = tok.span.to(inner.span());
                Ok(Expr::Unary {
                    op,
                    expr: Box::new(inner),
                    span,
                })
            }

            // primaries
            TokKind::Int(v) => self.lit(Lit::Int(v)),
            TokKind::Long(v) => self.lit(Lit::Long(v)),
            TokKind::Float(v) => self.lit(Lit::Float(v)),
            TokKind::Char(c) => self.lit(Lit::Char(c)),
            TokKind::Str(s) => self.lit(Lit::Str(s)),
            TokKind::KwTrue => self.lit(Lit::Bool(true)),
            TokKind::KwFalse => self.lit(Lit::Bool(false)),
            TokKind::KwNull => self.lit(Lit::Null),

            TokKind::Ident(_) => Ok(Expr::Var(self.parse_ident()?)),

            TokKind::Dot => self.parse_host_path(),

            TokKind::LParen => {
                if self.at_func_literal()? {
                    return self.parse_func();
                }
                self.bump()?; // '('
                let inner = self.parse_expr_bp(0)?;
                let end_tok = self.expect(TokKind::RParen)?;
                Ok(Expr::Paren {
                    inner: Box::new(inner),
                    span: Span::new(tok.span.start, end_tok.span.end),
                })
            }

            _ => self.unexpected("expression"),
        }
    }

    fn lit(&mut self, lit: Lit) -> PResult<Expr> {
        let tok = self.bump()?;
        Ok(Expr::Lit(lit, tok.span))
    }

    /// `host-path := '.' identifier ('.' identifier)*`
    fn parse_host_path(&mut self) -> PResult<Expr> {
        let start = self.expect(TokKind::Dot)?.span.start;
        let mut segments = vec![self.parse_ident()?];
        while self.at(&TokKind::Dot)? && matches!(self.peek(1)?.kind, TokKind::Ident(_)) {
            self.bump()?;
            segments.push(self.parse_ident()?);
        }
        let end = segments.last().map_or(start, |s| s.span.end);
        Ok(Expr::HostPath {
            segments,
            span: Span::new(start, end),
        })
    }

    fn parse_call_args(&mut self) -> PResult<Vec<Expr>> {
        self.expect(TokKind::LParen)?; // we are at '('
        let mut args = Vec::new();
        if !self.at(&TokKind::RParen)? {
            loop {
                args.push(self.parse_expr_bp(0)?);
                if self.at(&TokKind::Comma)? {
                    self.bump()?;
                    continue;
                }
                break;
            }
        }
        self.expect(TokKind::RParen)?;
        Ok(args)
    }
}
