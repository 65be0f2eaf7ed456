//! Runtime values of the console language.

use std::fmt;
use std::rc::Rc;

use devcon_ast::ast::Expr;

use crate::env::Env;
use crate::error::EvalResult;
use crate::eval::{ControlFlow, Runtime};
use crate::host::{HostClass, HostObject};

/// A dynamically-typed console value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    /// Wide integer (`123L` literals).
    Long(i64),
    Float(f64),
    Char(char),
    Str(String),
    /// Finite, immutable sequence.
    List(Rc<Vec<Value>>),
    /// User function closing over its defining frame
    Function(Rc<Closure>),
    /// Native primitive from the builtins library
    Builtin(Builtin),
    /// Host type reference (`.game.Player`)
    Class(Rc<HostClass>),
    /// Host instance, compared by identity
    Object(HostObject),
}

/// A function literal paired with the frame active at its definition site.
pub struct Closure {
    pub params: Vec<String>,
    pub body: Rc<Vec<Expr>>,
    pub env: Env,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("params", &self.params)
            .field("stmts", &self.body.len())
            .finish()
    }
}

/// Signature of a builtin: the caller's environment plus evaluated arguments.
pub type BuiltinFn = fn(&mut Runtime, &Env, Vec<Value>) -> EvalResult<ControlFlow>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Between(usize, usize),
}

impl Arity {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exact(k) => n == k,
            Arity::AtLeast(k) => n >= k,
            Arity::Between(lo, hi) => (lo..=hi).contains(&n),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(k) => write!(f, "{k}"),
            Arity::AtLeast(k) => write!(f, "at least {k}"),
            Arity::Between(lo, hi) => write!(f, "{lo} to {hi}"),
        }
    }
}

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: Arity,
    pub func: BuiltinFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}

impl Value {
    /// Truthiness used by every boolean-context builtin and operator.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Long(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Char(c) => *c != '\0',
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Function(_)
            | Value::Builtin(_)
            | Value::Class(_)
            | Value::Object(_) => true,
        }
    }

    /// Short kind name used in error messages and by `typeOf`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin",
            Value::Class(_) => "class",
            Value::Object(_) => "object",
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Function(_) | Value::Builtin(_) | Value::Class(_)
        )
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(items))
    }

    /// Integer view of `Int`/`Long` values.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(i64::from(*n)),
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view of `Int`/`Long`/`Float` values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(f64::from(*n)),
            Value::Long(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Value equality as exposed by `eql` and `==`.
    ///
    /// Numbers compare across `Int`/`Long`/`Float`, strings by content,
    /// lists element-wise, functions, classes and host objects by identity.
    pub fn eql(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                Rc::ptr_eq(a, b) || (a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.eql(y)))
            }
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a.name == b.name,
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => a.same(b),
            (a, b) => match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => x == y,
                _ => match (a.as_f64(), b.as_f64()) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                },
            },
        }
    }

    /// Source-like rendering: strings and chars are quoted.
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("{s:?}"),
            Value::Char(c) => format!("{c:?}"),
            Value::Long(n) => format!("{n}L"),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Long(n) => write!(f, "{n}"),
            Value::Float(v) => {
                if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
                    write!(f, "{v:.1}")
                } else {
                    write!(f, "{v}")
                }
            }
            Value::Char(c) => write!(f, "{c}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item.repr())?;
                }
                write!(f, "]")
            }
            Value::Function(c) => write!(f, "<fn({})>", c.params.join(", ")),
            Value::Builtin(b) => write!(f, "<builtin {}>", b.name),
            Value::Class(c) => write!(f, "<class {}>", c.name()),
            Value::Object(o) => write!(f, "{}", o.describe()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repr())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<HostObject> for Value {
    fn from(o: HostObject) -> Self {
        Value::Object(o)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_table() {
        assert!(!Value::Null.truthy());
        assert!(!Value::Int(0).truthy());
        assert!(!Value::Long(0).truthy());
        assert!(!Value::Float(0.0).truthy());
        assert!(!Value::from("").truthy());
        assert!(!Value::list(vec![]).truthy());
        assert!(Value::Int(-3).truthy());
        assert!(Value::from("x").truthy());
        assert!(Value::Bool(true).truthy());
        assert!(!Value::Bool(false).truthy());
    }

    #[test]
    fn numeric_equality_crosses_types() {
        assert!(Value::Int(3).eql(&Value::Long(3)));
        assert!(Value::Int(3).eql(&Value::Float(3.0)));
        assert!(Value::Long(1 << 40).eql(&Value::Long(1 << 40)));
        assert!(!Value::Int(3).eql(&Value::Float(3.5)));
        assert!(!Value::Int(0).eql(&Value::Null));
        assert!(!Value::from("3").eql(&Value::Int(3)));
    }

    #[test]
    fn list_equality_is_elementwise() {
        let a = Value::list(vec![Value::Int(1), Value::from("a")]);
        let b = Value::list(vec![Value::Long(1), Value::from("a")]);
        assert!(a.eql(&b));
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(12.5).to_string(), "12.5");
        assert_eq!(Value::Long(7).to_string(), "7");
        assert_eq!(Value::Long(7).repr(), "7L");
        assert_eq!(Value::from("hi").repr(), "\"hi\"");
        assert_eq!(
            Value::list(vec![Value::Int(1), Value::from("a")]).to_string(),
            "[1, \"a\"]"
        );
    }
}
