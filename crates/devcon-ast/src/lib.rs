pub mod span {
    use serde::Serialize;

    /// Byte range into the source text.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
    pub struct Span {
        pub start: u32,
        pub end: u32,
    }

    impl Span {
        pub fn new(start: u32, end: u32) -> Self {
            Self { start, end }
        }

        /// Smallest span covering both `self` and `other`.
        pub fn to(self, other: Span) -> Span {
            Span {
                start: self.start.min(other.start),
                end: self.end.max(other.end),
            }
        }
    }
}

pub mod ast {
    use super::span::Span;
    use serde::Serialize;
    use std::rc::Rc;

    /// A parsed console program: every statement was terminated by `;`.
    #[derive(Debug, Clone, Serialize)]
    pub struct Program {
        pub stmts: Vec<Expr>,
        pub span: Span,
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct Ident {
        pub text: String,
        pub span: Span,
    }

    #[derive(Debug, Clone, Serialize)]
    pub enum Expr {
        Lit(Lit, Span),
        Var(Ident),
        /// `name = value` always binds in the innermost frame.
        Assign {
            name: Ident,
            value: Box<Expr>,
            span: Span,
        },
        /// `(a, b) { stmt; stmt; }`
        Func {
            params: Vec<Ident>,
            body: Rc<Vec<Expr>>,
            span: Span,
        },
        Call {
            callee: Box<Expr>,
            args: Vec<Expr>,
            span: Span,
        },
        /// `.pkg.Type.member`, resolved through the host bridge.
        HostPath {
            segments: Vec<Ident>,
            span: Span,
        },
        /// `target.name`
        Member {
            target: Box<Expr>,
            name: Ident,
            span: Span,
        },
        Unary {
            op: UnOp,
            expr: Box<Expr>,
            span: Span,
        },
        Binary {
            lhs: Box<Expr>,
            op: BinOp,
            rhs: Box<Expr>,
            span: Span,
        },
        Paren {
            inner: Box<Expr>,
            span: Span,
        },
    }

    impl Expr {
        pub fn span(&self) -> Span {
            match self {
                Expr::Lit(_, sp) => *sp,
                Expr::Var(id) => id.span,
                Expr::Assign { span, .. }
                | Expr::Func { span, .. }
                | Expr::Call { span, .. }
                | Expr::HostPath { span, .. }
                | Expr::Member { span, .. }
                | Expr::Unary { span, .. }
                | Expr::Binary { span, .. }
                | Expr::Paren { span, .. } => *span,
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub enum UnOp {
        Not,
        Neg,
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub enum Lit {
        Int(i32),
        /// Integer literal with an `L` suffix.
        Long(i64),
        Float(f64),
        Char(char),
        Str(String),
        Bool(bool),
        Null,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub enum BinOp {
        // logical
        Or,
        And,
        // equality
        Eq,
        Ne,
        // relational
        Lt,
        Le,
        Gt,
        Ge,
        // arithmetic
        Add,
        Sub,
        Mul,
        Div,
        Rem,
    }

    impl BinOp {
        pub fn symbol(self) -> &'static str {
            match self {
                BinOp::Or => "||",
                BinOp::And => "&&",
                BinOp::Eq => "==",
                BinOp::Ne => "!=",
                BinOp::Lt => "<",
                BinOp::Le => "<=",
                BinOp::Gt => ">",
                BinOp::Ge => ">=",
                BinOp::Add => "+",
                BinOp::Sub => "-",
                BinOp::Mul => "*",
                BinOp::Div => "/",
                BinOp::Rem => "%",
            }
        }
    }
}
