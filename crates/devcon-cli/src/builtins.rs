//! Primitive functions installed into every shell's global frame.
//!
//! Control flow is expressed as ordinary calls taking thunks, so builtins
//! never absorb `Return` signals: a signal raised inside a thunk passes
//! straight through to the enclosing user-function call.

use tracing::debug;

use crate::env::Env;
use crate::error::{EvalError, EvalResult};
use crate::eval::{call_value, flow, ControlFlow, Runtime};
use crate::value::{Arity, Builtin, Value};

/// Largest list `Range` will materialize.
pub const MAX_RANGE_LEN: i64 = 10_000_000;

const BUILTINS: &[Builtin] = &[
    Builtin { name: "print", arity: Arity::AtLeast(0), func: print },
    Builtin { name: "if", arity: Arity::Exact(2), func: if_ },
    Builtin { name: "ifElse", arity: Arity::Exact(3), func: if_else },
    Builtin { name: "while", arity: Arity::Exact(2), func: while_ },
    Builtin { name: "forEach", arity: Arity::Exact(2), func: for_each },
    Builtin { name: "Range", arity: Arity::Exact(2), func: range },
    Builtin { name: "tryCatch", arity: Arity::Exact(2), func: try_catch },
    Builtin { name: "throw", arity: Arity::Exact(1), func: throw },
    Builtin { name: "and", arity: Arity::Exact(2), func: and },
    Builtin { name: "or", arity: Arity::Exact(2), func: or },
    Builtin { name: "not", arity: Arity::Exact(1), func: not },
    Builtin { name: "eql", arity: Arity::Exact(2), func: eql },
    Builtin { name: "isNull", arity: Arity::Exact(1), func: is_null },
    Builtin { name: "isClass", arity: Arity::Exact(1), func: is_class },
    Builtin { name: "exists", arity: Arity::Exact(1), func: exists },
    Builtin { name: "setGlobal", arity: Arity::Exact(2), func: set_global },
    Builtin { name: "getGlobal", arity: Arity::Exact(1), func: get_global },
    Builtin { name: "getParentVar", arity: Arity::Exact(1), func: get_parent_var },
    Builtin { name: "return", arity: Arity::Between(0, 1), func: return_ },
    Builtin { name: "returnN", arity: Arity::Exact(2), func: return_n },
    Builtin { name: "str", arity: Arity::Exact(1), func: str_ },
    Builtin { name: "typeOf", arity: Arity::Exact(1), func: type_of },
    Builtin { name: "len", arity: Arity::Exact(1), func: len },
    Builtin { name: "list", arity: Arity::AtLeast(0), func: list },
    Builtin { name: "get", arity: Arity::Exact(2), func: get },
    Builtin { name: "locals", arity: Arity::Exact(0), func: locals },
    Builtin { name: "globals", arity: Arity::Exact(0), func: globals },
];

/// Bind every builtin in `env`. Later definitions may shadow them.
pub fn install(env: &Env) {
    for b in BUILTINS {
        env.define(b.name, Value::Builtin(*b));
    }
}

pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|b| b.name)
}

fn value(v: impl Into<Value>) -> EvalResult<ControlFlow> {
    Ok(ControlFlow::Value(v.into()))
}

fn null() -> EvalResult<ControlFlow> {
    Ok(ControlFlow::Value(Value::Null))
}

fn name_arg<'a>(builtin: &str, v: &'a Value) -> EvalResult<&'a str> {
    v.as_str().ok_or_else(|| {
        EvalError::type_err(format!(
            "{builtin} expects a string name, got {}",
            v.kind_name()
        ))
    })
}

fn int_arg(builtin: &str, v: &Value) -> EvalResult<i64> {
    v.as_i64().ok_or_else(|| {
        EvalError::type_err(format!(
            "{builtin} expects an integer, got {}",
            v.kind_name()
        ))
    })
}

fn size(n: usize) -> Value {
    match i32::try_from(n) {
        Ok(n) => Value::Int(n),
        Err(_) => Value::Long(n as i64),
    }
}

// ---------------------------------------------------------------------------
// output
// ---------------------------------------------------------------------------

fn print(rt: &mut Runtime, _env: &Env, args: Vec<Value>) -> EvalResult<ControlFlow> {
    let text: String = args.iter().map(ToString::to_string).collect();
    rt.console.print(&Value::Str(text));
    null()
}

// ---------------------------------------------------------------------------
// control flow
// ---------------------------------------------------------------------------

fn if_(rt: &mut Runtime, env: &Env, args: Vec<Value>) -> EvalResult<ControlFlow> {
    if args[0].truthy() {
        call_value(rt, env, &args[1], vec![])
    } else {
        null()
    }
}

fn if_else(rt: &mut Runtime, env: &Env, args: Vec<Value>) -> EvalResult<ControlFlow> {
    let chosen = if args[0].truthy() { &args[1] } else { &args[2] };
    call_value(rt, env, chosen, vec![])
}

fn while_(rt: &mut Runtime, env: &Env, args: Vec<Value>) -> EvalResult<ControlFlow> {
    let (cond, body) = (&args[0], &args[1]);
    loop {
        let c = flow!(call_value(rt, env, cond, vec![]));
        if !c.truthy() {
            return null();
        }
        flow!(call_value(rt, env, body, vec![]));
    }
}

fn for_each(rt: &mut Runtime, env: &Env, args: Vec<Value>) -> EvalResult<ControlFlow> {
    let items: Vec<Value> = match &args[0] {
        Value::List(items) => items.to_vec(),
        Value::Str(s) => s.chars().map(Value::Char).collect(),
        Value::Object(o) => o.elements().ok_or_else(|| {
            EvalError::type_err(format!("{} is not iterable", o.class().name()))
        })?,
        other => {
            return Err(EvalError::type_err(format!(
                "forEach expects a list, string or iterable host object, got {}",
                other.kind_name()
            )))
        }
    };
    for item in items {
        flow!(call_value(rt, env, &args[1], vec![item]));
    }
    null()
}

/// Inclusive ascending `a..=b`; empty when `a > b`.
fn range(_rt: &mut Runtime, _env: &Env, args: Vec<Value>) -> EvalResult<ControlFlow> {
    let lo = int_arg("Range", &args[0])?;
    let hi = int_arg("Range", &args[1])?;
    if lo > hi {
        return value(Value::list(vec![]));
    }
    let count = hi.saturating_sub(lo).saturating_add(1);
    if count > MAX_RANGE_LEN {
        return Err(EvalError::type_err(format!(
            "Range of {count} elements exceeds the limit of {MAX_RANGE_LEN}"
        )));
    }
    let narrow = matches!((&args[0], &args[1]), (Value::Int(_), Value::Int(_)));
    let items = (lo..=hi)
        .map(|n| match i32::try_from(n) {
            Ok(small) if narrow => Value::Int(small),
            _ => Value::Long(n),
        })
        .collect();
    value(Value::list(items))
}

/// Errors raised by the thunk reach `catchFn` as a `devcon.Error` object,
/// except `throw`n values which are handed over as-is.
fn try_catch(rt: &mut Runtime, env: &Env, args: Vec<Value>) -> EvalResult<ControlFlow> {
    match call_value(rt, env, &args[0], vec![]) {
        Ok(cf) => Ok(cf),
        Err(err) => {
            debug!(kind = err.kind(), error = %err, "tryCatch caught");
            let caught = match err {
                EvalError::Thrown(v) => v,
                other => rt.host.error_object(&other),
            };
            call_value(rt, env, &args[1], vec![caught])
        }
    }
}

fn throw(_rt: &mut Runtime, _env: &Env, mut args: Vec<Value>) -> EvalResult<ControlFlow> {
    Err(EvalError::Thrown(args.remove(0)))
}

fn return_(_rt: &mut Runtime, _env: &Env, args: Vec<Value>) -> EvalResult<ControlFlow> {
    Ok(ControlFlow::Return {
        depth: 1,
        value: args.into_iter().next().unwrap_or(Value::Null),
    })
}

fn return_n(_rt: &mut Runtime, _env: &Env, mut args: Vec<Value>) -> EvalResult<ControlFlow> {
    let depth = int_arg("returnN", &args[0])?;
    let depth = u32::try_from(depth)
        .ok()
        .filter(|d| *d >= 1)
        .ok_or_else(|| EvalError::type_err(format!("returnN depth must be at least 1, got {depth}")))?;
    Ok(ControlFlow::Return {
        depth,
        value: args.remove(1),
    })
}

// ---------------------------------------------------------------------------
// logic and predicates
// ---------------------------------------------------------------------------

fn and(_rt: &mut Runtime, _env: &Env, args: Vec<Value>) -> EvalResult<ControlFlow> {
    value(args[0].truthy() && args[1].truthy())
}

fn or(_rt: &mut Runtime, _env: &Env, args: Vec<Value>) -> EvalResult<ControlFlow> {
    value(args[0].truthy() || args[1].truthy())
}

fn not(_rt: &mut Runtime, _env: &Env, args: Vec<Value>) -> EvalResult<ControlFlow> {
    value(!args[0].truthy())
}

fn eql(_rt: &mut Runtime, _env: &Env, args: Vec<Value>) -> EvalResult<ControlFlow> {
    value(args[0].eql(&args[1]))
}

fn is_null(_rt: &mut Runtime, _env: &Env, args: Vec<Value>) -> EvalResult<ControlFlow> {
    value(matches!(args[0], Value::Null))
}

fn is_class(_rt: &mut Runtime, _env: &Env, args: Vec<Value>) -> EvalResult<ControlFlow> {
    value(matches!(args[0], Value::Class(_)))
}

// ---------------------------------------------------------------------------
// scope
// ---------------------------------------------------------------------------

fn exists(_rt: &mut Runtime, env: &Env, args: Vec<Value>) -> EvalResult<ControlFlow> {
    value(env.exists(name_arg("exists", &args[0])?))
}

fn set_global(_rt: &mut Runtime, env: &Env, mut args: Vec<Value>) -> EvalResult<ControlFlow> {
    let v = args.remove(1);
    let name = name_arg("setGlobal", &args[0])?;
    env.set_global(name, v.clone());
    value(v)
}

fn get_global(_rt: &mut Runtime, env: &Env, args: Vec<Value>) -> EvalResult<ControlFlow> {
    value(env.get_global(name_arg("getGlobal", &args[0])?)?)
}

fn get_parent_var(_rt: &mut Runtime, env: &Env, args: Vec<Value>) -> EvalResult<ControlFlow> {
    value(env.get_parent_var(name_arg("getParentVar", &args[0])?)?)
}

fn locals(_rt: &mut Runtime, env: &Env, _args: Vec<Value>) -> EvalResult<ControlFlow> {
    value(Value::list(env.local_names().into_iter().map(Value::Str).collect()))
}

fn globals(_rt: &mut Runtime, env: &Env, _args: Vec<Value>) -> EvalResult<ControlFlow> {
    let names = env.global().local_names();
    value(Value::list(names.into_iter().map(Value::Str).collect()))
}

// ---------------------------------------------------------------------------
// values
// ---------------------------------------------------------------------------

fn str_(_rt: &mut Runtime, _env: &Env, args: Vec<Value>) -> EvalResult<ControlFlow> {
    value(args[0].to_string())
}

fn type_of(_rt: &mut Runtime, _env: &Env, args: Vec<Value>) -> EvalResult<ControlFlow> {
    match &args[0] {
        Value::Object(o) => value(o.class().name()),
        other => value(other.kind_name()),
    }
}

fn len(_rt: &mut Runtime, _env: &Env, args: Vec<Value>) -> EvalResult<ControlFlow> {
    match &args[0] {
        Value::Str(s) => value(size(s.chars().count())),
        Value::List(items) => value(size(items.len())),
        Value::Object(o) => match o.elements() {
            Some(items) => value(size(items.len())),
            None => Err(EvalError::type_err(format!(
                "{} has no length",
                o.class().name()
            ))),
        },
        other => Err(EvalError::type_err(format!(
            "a {} value has no length",
            other.kind_name()
        ))),
    }
}

fn list(_rt: &mut Runtime, _env: &Env, args: Vec<Value>) -> EvalResult<ControlFlow> {
    value(Value::list(args))
}

/// `get(list, i)` / `get(string, i)`; negative indices count from the end.
fn get(_rt: &mut Runtime, _env: &Env, args: Vec<Value>) -> EvalResult<ControlFlow> {
    let i = int_arg("get", &args[1])?;
    let pick = |n: usize| -> EvalResult<usize> {
        let idx = if i < 0 { n as i64 + i } else { i };
        usize::try_from(idx)
            .ok()
            .filter(|idx| *idx < n)
            .ok_or_else(|| EvalError::type_err(format!("index {i} out of range for length {n}")))
    };
    match &args[0] {
        Value::List(items) => value(items[pick(items.len())?].clone()),
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            value(chars[pick(chars.len())?])
        }
        other => Err(EvalError::type_err(format!(
            "get expects a list or string, got {}",
            other.kind_name()
        ))),
    }
}
