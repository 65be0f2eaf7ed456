//! Tree-walking evaluator.
//!
//! Every expression evaluates to a [`ControlFlow`]: either a plain value or a
//! `Return` signal unwinding toward an enclosing user-function call. Errors
//! travel separately as [`EvalError`].

use std::rc::Rc;

use devcon_ast::ast::{BinOp, Expr, Ident, Lit, Program, UnOp};
use tracing::trace;

use crate::console::Console;
use crate::env::Env;
use crate::error::{EvalError, EvalResult};
use crate::host::HostRegistry;
use crate::stack::ensure_sufficient_stack;
use crate::trace::TraceEmitter;
use crate::value::{Closure, Value};

/// Default limit on nested user-function calls.
pub const DEFAULT_MAX_CALL_DEPTH: u32 = 200;

/// Result of evaluating an expression.
#[derive(Debug, Clone)]
pub enum ControlFlow {
    Value(Value),
    /// Non-local exit through `depth` user-function call frames.
    Return { depth: u32, value: Value },
}

impl ControlFlow {
    pub fn into_value(self) -> Value {
        match self {
            ControlFlow::Value(v) | ControlFlow::Return { value: v, .. } => v,
        }
    }
}

/// Unwrap a plain value, propagating errors and return signals.
macro_rules! flow {
    ($e:expr) => {
        match $e? {
            $crate::eval::ControlFlow::Value(v) => v,
            signal => return Ok(signal),
        }
    };
}
pub(crate) use flow;

/// Interpreter state shared by every call during one shell's lifetime.
pub struct Runtime {
    pub host: HostRegistry,
    pub console: Box<dyn Console>,
    pub tracer: TraceEmitter,
    depth: u32,
    max_depth: u32,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("host", &self.host)
            .field("depth", &self.depth)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl Runtime {
    pub fn new(host: HostRegistry, console: Box<dyn Console>, max_depth: u32) -> Self {
        Runtime {
            host,
            console,
            tracer: TraceEmitter::disabled(),
            depth: 0,
            max_depth,
        }
    }

    pub(crate) fn reset_depth(&mut self) {
        self.depth = 0;
    }
}

/// Evaluate a program's statements in order in `env`. A return signal that
/// escapes every call frame ends the program with its value.
pub fn eval_program(rt: &mut Runtime, env: &Env, program: &Program) -> EvalResult<Value> {
    Ok(eval_body(rt, env, &program.stmts)?.into_value())
}

/// Statements in order; the value of the last one, `null` when empty.
fn eval_body(rt: &mut Runtime, env: &Env, stmts: &[Expr]) -> EvalResult<ControlFlow> {
    let mut last = Value::Null;
    for stmt in stmts {
        last = flow!(eval_expr(rt, env, stmt));
    }
    Ok(ControlFlow::Value(last))
}

/// Evaluate one expression. Nested calls grow the stack on demand, so only
/// the call-depth limit bounds recursion.
pub fn eval_expr(rt: &mut Runtime, env: &Env, expr: &Expr) -> EvalResult<ControlFlow> {
    ensure_sufficient_stack(|| eval_expr_inner(rt, env, expr))
}

fn eval_expr_inner(rt: &mut Runtime, env: &Env, expr: &Expr) -> EvalResult<ControlFlow> {
    let v = match expr {
        Expr::Lit(lit, _) => lit_value(lit),
        Expr::Var(id) => env.get(&id.text)?,
        Expr::Assign { name, value, .. } => {
            let v = flow!(eval_expr(rt, env, value));
            env.define(name.text.clone(), v.clone());
            v
        }
        Expr::Func { params, body, .. } => Value::Function(Rc::new(Closure {
            params: params.iter().map(|p| p.text.clone()).collect(),
            body: Rc::clone(body),
            env: env.clone(),
        })),
        Expr::Call { callee, args, .. } => return eval_call(rt, env, callee, args),
        Expr::HostPath { segments, .. } => eval_host_path(rt, segments)?,
        Expr::Member { target, name, .. } => {
            let target = flow!(eval_expr(rt, env, target));
            rt.host.get_member(&target, &name.text)?
        }
        Expr::Unary { op, expr, .. } => {
            let v = flow!(eval_expr(rt, env, expr));
            unary(*op, &v)?
        }
        Expr::Binary { lhs, op, rhs, .. } => return eval_binary(rt, env, *op, lhs, rhs),
        Expr::Paren { inner, .. } => return eval_expr(rt, env, inner),
    };
    Ok(ControlFlow::Value(v))
}

fn lit_value(lit: &Lit) -> Value {
    match lit {
        Lit::Int(n) => Value::Int(*n),
        Lit::Long(n) => Value::Long(*n),
        Lit::Float(f) => Value::Float(*f),
        Lit::Char(c) => Value::Char(*c),
        Lit::Str(s) => Value::Str(s.clone()),
        Lit::Bool(b) => Value::Bool(*b),
        Lit::Null => Value::Null,
    }
}

/// `.a.b.C` yields the class; trailing segments read static fields.
fn eval_host_path(rt: &mut Runtime, segments: &[Ident]) -> EvalResult<Value> {
    let names: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
    let (class, used) = rt.host.resolve_path(&names)?;
    let mut v = Value::Class(class);
    for seg in &names[used..] {
        v = rt.host.get_member(&v, seg)?;
    }
    Ok(v)
}

/// Evaluate arguments left to right. A return signal raised by an argument
/// abandons the call and is handed back as `Err`.
pub fn eval_args(
    rt: &mut Runtime,
    env: &Env,
    args: &[Expr],
) -> EvalResult<Result<Vec<Value>, ControlFlow>> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        match eval_expr(rt, env, arg)? {
            ControlFlow::Value(v) => out.push(v),
            signal => return Ok(Err(signal)),
        }
    }
    Ok(Ok(out))
}

fn eval_call(rt: &mut Runtime, env: &Env, callee: &Expr, args: &[Expr]) -> EvalResult<ControlFlow> {
    match callee {
        // obj.m(args) / .a.b.C.m(args) with a value target
        Expr::Member { target, name, .. } => {
            let target = flow!(eval_expr(rt, env, target));
            let args = match eval_args(rt, env, args)? {
                Ok(a) => a,
                Err(signal) => return Ok(signal),
            };
            let v = rt.host.invoke(&target, &name.text, args, &mut rt.tracer)?;
            Ok(ControlFlow::Value(v))
        }
        Expr::HostPath { segments, .. } => {
            let names: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
            let (class, used) = rt.host.resolve_path(&names)?;
            let args = match eval_args(rt, env, args)? {
                Ok(a) => a,
                Err(signal) => return Ok(signal),
            };
            let v = match names[used..].split_last() {
                None => rt.host.construct(&class, args, &mut rt.tracer)?,
                Some((method, path)) => {
                    let mut target = Value::Class(class);
                    for seg in path {
                        target = rt.host.get_member(&target, seg)?;
                    }
                    rt.host.invoke(&target, method, args, &mut rt.tracer)?
                }
            };
            Ok(ControlFlow::Value(v))
        }
        _ => {
            let f = flow!(eval_expr(rt, env, callee));
            let args = match eval_args(rt, env, args)? {
                Ok(a) => a,
                Err(signal) => return Ok(signal),
            };
            call_value(rt, env, &f, args)
        }
    }
}

/// Apply a callable value. `env` is the caller's frame, visible to builtins
/// that inspect scope.
pub fn call_value(
    rt: &mut Runtime,
    env: &Env,
    callee: &Value,
    args: Vec<Value>,
) -> EvalResult<ControlFlow> {
    match callee {
        Value::Function(closure) => call_closure(rt, closure, args),
        Value::Builtin(b) => {
            if !b.arity.accepts(args.len()) {
                return Err(EvalError::Arity {
                    callee: b.name.to_string(),
                    expected: b.arity.to_string(),
                    found: args.len(),
                });
            }
            (b.func)(rt, env, args)
        }
        Value::Class(class) => {
            let v = rt.host.construct(class, args, &mut rt.tracer)?;
            Ok(ControlFlow::Value(v))
        }
        other => Err(EvalError::NotCallable(other.kind_name())),
    }
}

/// Run a user function in a fresh frame whose parent is its captured scope.
///
/// This is the only place a `Return` signal is absorbed: depth 1 becomes the
/// call's value, deeper signals lose one level and keep unwinding.
pub fn call_closure(
    rt: &mut Runtime,
    closure: &Rc<Closure>,
    args: Vec<Value>,
) -> EvalResult<ControlFlow> {
    if args.len() != closure.params.len() {
        return Err(EvalError::Arity {
            callee: Value::Function(Rc::clone(closure)).to_string(),
            expected: closure.params.len().to_string(),
            found: args.len(),
        });
    }
    if rt.depth >= rt.max_depth {
        return Err(EvalError::CallDepthExceeded(rt.max_depth));
    }

    let frame = closure.env.child();
    for (param, arg) in closure.params.iter().zip(args) {
        frame.define(param.clone(), arg);
    }

    rt.depth += 1;
    trace!(depth = rt.depth, params = closure.params.len(), "call");
    let result = eval_body(rt, &frame, &closure.body);
    rt.depth -= 1;

    Ok(match result? {
        ControlFlow::Return { depth, value } if depth <= 1 => ControlFlow::Value(value),
        ControlFlow::Return { depth, value } => ControlFlow::Return {
            depth: depth - 1,
            value,
        },
        cf => cf,
    })
}

fn eval_binary(
    rt: &mut Runtime,
    env: &Env,
    op: BinOp,
    lhs: &Expr,
    rhs: &Expr,
) -> EvalResult<ControlFlow> {
    let l = flow!(eval_expr(rt, env, lhs));
    // short-circuit forms never evaluate the right side needlessly
    match op {
        BinOp::And if !l.truthy() => return Ok(ControlFlow::Value(Value::Bool(false))),
        BinOp::Or if l.truthy() => return Ok(ControlFlow::Value(Value::Bool(true))),
        BinOp::And | BinOp::Or => {
            let r = flow!(eval_expr(rt, env, rhs));
            return Ok(ControlFlow::Value(Value::Bool(r.truthy())));
        }
        _ => {}
    }
    let r = flow!(eval_expr(rt, env, rhs));
    Ok(ControlFlow::Value(binary(op, &l, &r)?))
}

/// Apply a strict binary operator to two evaluated operands.
pub fn binary(op: BinOp, l: &Value, r: &Value) -> EvalResult<Value> {
    match op {
        BinOp::Eq => Ok(Value::Bool(l.eql(r))),
        BinOp::Ne => Ok(Value::Bool(!l.eql(r))),
        BinOp::And => Ok(Value::Bool(l.truthy() && r.truthy())),
        BinOp::Or => Ok(Value::Bool(l.truthy() || r.truthy())),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => compare(op, l, r),
        BinOp::Add if matches!(l, Value::Str(_)) || matches!(r, Value::Str(_)) => {
            Ok(Value::Str(format!("{l}{r}")))
        }
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => arith(op, l, r),
    }
}

macro_rules! checked_int {
    ($op:expr, $a:expr, $b:expr) => {{
        let (a, b) = ($a, $b);
        let overflow = || EvalError::Arithmetic(format!("integer overflow in `{}`", $op.symbol()));
        match $op {
            BinOp::Add => a.checked_add(b).ok_or_else(overflow),
            BinOp::Sub => a.checked_sub(b).ok_or_else(overflow),
            BinOp::Mul => a.checked_mul(b).ok_or_else(overflow),
            BinOp::Div if b == 0 => Err(EvalError::Arithmetic("division by zero".into())),
            BinOp::Div => a.checked_div(b).ok_or_else(overflow),
            BinOp::Rem if b == 0 => Err(EvalError::Arithmetic("remainder by zero".into())),
            _ => a.checked_rem(b).ok_or_else(overflow),
        }
    }};
}

/// Arithmetic with promotion `Int < Long < Float`.
fn arith(op: BinOp, l: &Value, r: &Value) -> EvalResult<Value> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => checked_int!(op, *a, *b).map(Value::Int),
        _ => {
            if let (Some(a), Some(b)) = (l.as_i64(), r.as_i64()) {
                return checked_int!(op, a, b).map(Value::Long);
            }
            let (Some(a), Some(b)) = (l.as_f64(), r.as_f64()) else {
                return Err(operand_error(op, l, r));
            };
            Ok(Value::Float(match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div => a / b,
                _ => a % b,
            }))
        }
    }
}

fn compare(op: BinOp, l: &Value, r: &Value) -> EvalResult<Value> {
    let ord = match (l, r) {
        (Value::Char(a), Value::Char(b)) => a.cmp(b),
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        _ => match (l.as_i64(), r.as_i64()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => match (l.as_f64(), r.as_f64()) {
                (Some(a), Some(b)) => match a.partial_cmp(&b) {
                    Some(ord) => ord,
                    // NaN is unordered
                    None => return Ok(Value::Bool(false)),
                },
                _ => return Err(operand_error(op, l, r)),
            },
        },
    };
    Ok(Value::Bool(match op {
        BinOp::Lt => ord.is_lt(),
        BinOp::Le => ord.is_le(),
        BinOp::Gt => ord.is_gt(),
        _ => ord.is_ge(),
    }))
}

fn unary(op: UnOp, v: &Value) -> EvalResult<Value> {
    let overflow = || EvalError::Arithmetic("integer overflow in `-`".into());
    match (op, v) {
        (UnOp::Not, v) => Ok(Value::Bool(!v.truthy())),
        (UnOp::Neg, Value::Int(n)) => n.checked_neg().map(Value::Int).ok_or_else(overflow),
        (UnOp::Neg, Value::Long(n)) => n.checked_neg().map(Value::Long).ok_or_else(overflow),
        (UnOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnOp::Neg, other) => Err(EvalError::type_err(format!(
            "cannot negate a {} value",
            other.kind_name()
        ))),
    }
}

fn operand_error(op: BinOp, l: &Value, r: &Value) -> EvalError {
    EvalError::type_err(format!(
        "cannot apply `{}` to {} and {}",
        op.symbol(),
        l.kind_name(),
        r.kind_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;
    use crate::console::BufferConsole;
    use devcon_parse::parse_str;

    fn run_with(src: &str, max_depth: u32) -> EvalResult<Value> {
        let program = parse_str(src).expect("parse");
        let mut rt = Runtime::new(
            HostRegistry::new(),
            Box::new(BufferConsole::new()),
            max_depth,
        );
        let env = Env::new_global();
        builtins::install(&env);
        let result = eval_program(&mut rt, &env, &program);
        env.clear();
        result
    }

    fn run(src: &str) -> EvalResult<Value> {
        run_with(src, 40)
    }

    fn assert_value(src: &str, expected: Value) {
        let v = run(src).unwrap();
        assert!(v.eql(&expected), "{src} => {v:?}, expected {expected:?}");
    }

    #[test]
    fn empty_program_is_null() {
        assert!(matches!(run("").unwrap(), Value::Null));
    }

    #[test]
    fn literals() {
        assert_value("42;", Value::Int(42));
        assert_value("42L;", Value::Long(42));
        assert_value("'c';", Value::Char('c'));
        assert_value("\"hi\";", Value::from("hi"));
        assert_value("true;", Value::Bool(true));
        assert!(matches!(run("null;").unwrap(), Value::Null));
    }

    #[test]
    fn assignment_yields_value() {
        assert_value("x = 5;", Value::Int(5));
        assert_value("x = 5; x;", Value::Int(5));
    }

    #[test]
    fn arithmetic_promotion() {
        assert!(matches!(run("1 + 2;").unwrap(), Value::Int(3)));
        assert!(matches!(run("1 + 2L;").unwrap(), Value::Long(3)));
        assert!(matches!(run("1 + 2.5;").unwrap(), Value::Float(f) if f == 3.5));
        assert!(matches!(run("7 / 2;").unwrap(), Value::Int(3)));
        assert!(matches!(run("-7 % 3;").unwrap(), Value::Int(-1)));
    }

    #[test]
    fn string_concatenation() {
        assert_value("\"n=\" + 1;", Value::from("n=1"));
        assert_value("1.0 + \"x\";", Value::from("1.0x"));
    }

    #[test]
    fn integer_faults() {
        assert!(matches!(run("1 / 0;"), Err(EvalError::Arithmetic(_))));
        assert!(matches!(run("5 % 0;"), Err(EvalError::Arithmetic(_))));
        assert!(matches!(run("2147483647 + 1;"), Err(EvalError::Arithmetic(_))));
        assert!(matches!(run("2147483647L + 1;").unwrap(), Value::Long(2_147_483_648)));
    }

    #[test]
    fn comparisons() {
        assert_value("1 < 2L;", Value::Bool(true));
        assert_value("2.5 >= 2;", Value::Bool(true));
        assert_value("'a' < 'b';", Value::Bool(true));
        assert_value("\"abc\" > \"abd\";", Value::Bool(false));
        assert!(matches!(run("1 < \"a\";"), Err(EvalError::Type(_))));
    }

    #[test]
    fn logical_operators_short_circuit() {
        assert_value("false && nope;", Value::Bool(false));
        assert_value("1 || nope;", Value::Bool(true));
        assert_value("\"\" || 0;", Value::Bool(false));
        assert_value("!0;", Value::Bool(true));
    }

    #[test]
    fn closures_capture_definition_site() {
        let src = "mk = (n) { (x) { x + n; }; }; add2 = mk(2); n = 100; add2(1);";
        assert_value(src, Value::Int(3));
    }

    #[test]
    fn function_body_value_is_last_statement() {
        assert_value("f = () { 1; 2; }; f();", Value::Int(2));
        assert!(matches!(run("f = () {}; f();").unwrap(), Value::Null));
    }

    #[test]
    fn assignment_in_call_stays_local() {
        assert_value("x = 1; f = () { x = 2; }; f(); x;", Value::Int(1));
    }

    #[test]
    fn arity_is_checked() {
        let err = run("f = (a, b) { a; }; f(1);").unwrap_err();
        assert!(matches!(err, EvalError::Arity { found: 1, .. }));
    }

    #[test]
    fn calling_a_non_function() {
        assert!(matches!(run("x = 3; x();"), Err(EvalError::NotCallable("int"))));
    }

    #[test]
    fn unbound_name() {
        assert!(matches!(run("nope;"), Err(EvalError::UnboundName(n)) if n == "nope"));
    }

    #[test]
    fn return_exits_one_frame() {
        assert_value("f = () { return(1); 2; }; f();", Value::Int(1));
    }

    #[test]
    fn return_n_unwinds_several_frames() {
        let src = "outer = () { inner = () { returnN(2, \"out\"); }; inner(); \"after\"; }; outer();";
        assert_value(src, Value::from("out"));
        let src = "outer = () { inner = () { returnN(1, \"in\"); }; inner(); \"after\"; }; outer();";
        assert_value(src, Value::from("after"));
    }

    #[test]
    fn top_level_return_ends_program() {
        assert_value("return(7); 8;", Value::Int(7));
    }

    #[test]
    fn call_depth_is_bounded() {
        let err = run_with("f = () { f(); }; f();", 25).unwrap_err();
        assert!(matches!(err, EvalError::CallDepthExceeded(25)));
    }

    #[test]
    fn default_depth_limit_fits_a_small_worker_stack() {
        fn outcome(src: &str) -> Result<String, &'static str> {
            run_with(src, DEFAULT_MAX_CALL_DEPTH)
                .map(|v| v.to_string())
                .map_err(|e| e.kind())
        }
        let worker = std::thread::Builder::new()
            .stack_size(512 * 1024)
            .spawn(|| {
                (
                    outcome("c = (n) { (n <= 0) || c(n - 1); }; c(199);"),
                    outcome("c = (n) { (n <= 0) || c(n - 1); }; c(200);"),
                )
            })
            .unwrap();
        let (within, beyond) = worker.join().unwrap();
        assert_eq!(within, Ok("true".to_string()));
        assert_eq!(beyond, Err("CallDepthError"));
    }

    #[test]
    fn recursion_within_limit() {
        let src = "fact = (n) { ifElse(n <= 1, () { 1; }, () { n * fact(n - 1); }); }; fact(10);";
        assert_value(src, Value::Int(3_628_800));
    }

    #[test]
    fn unresolved_host_path() {
        assert!(matches!(run(".nope.Type;"), Err(EvalError::HostResolution(_))));
    }
}
