//! Host bridge: the registry of host classes reachable from `.a.b.C` paths.
//!
//! The host describes each class explicitly with a [`HostClassBuilder`]:
//! constructors, methods, static methods and fields, each with a declared
//! parameter signature. Calls pick an overload by argument kind, see
//! [`select_overload`].

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{EvalError, EvalResult};
use crate::trace::{TraceEmitter, TraceOutput};
use crate::value::Value;

/// Name of the class backing error objects handed to `tryCatch` handlers.
pub const ERROR_CLASS: &str = "devcon.Error";

/// Failure reported by a host callable.
#[derive(Debug, Clone, Error)]
pub enum HostError {
    #[error("bad argument: {0}")]
    BadArgument(String),
    #[error("{0}")]
    Failed(String),
}

/// Declared parameter kind of a host callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Any,
    Bool,
    Int,
    Long,
    Float,
    Char,
    Str,
    List,
    Function,
    Class,
    /// Instance of the named host class.
    Object(String),
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Any => write!(f, "any"),
            ParamType::Bool => write!(f, "bool"),
            ParamType::Int => write!(f, "int"),
            ParamType::Long => write!(f, "long"),
            ParamType::Float => write!(f, "float"),
            ParamType::Char => write!(f, "char"),
            ParamType::Str => write!(f, "string"),
            ParamType::List => write!(f, "list"),
            ParamType::Function => write!(f, "function"),
            ParamType::Class => write!(f, "class"),
            ParamType::Object(name) => write!(f, "{name}"),
        }
    }
}

const EXACT: u32 = 0;
const WIDENING: u32 = 1;
const ANY: u32 = 2;

impl ParamType {
    /// Cost of passing `v` for this parameter, with the converted value.
    /// `None` when not assignable.
    fn accept(&self, v: &Value) -> Option<(u32, Value)> {
        let exact = || Some((EXACT, v.clone()));
        match (self, v) {
            (ParamType::Any, _) => Some((ANY, v.clone())),
            (ParamType::Bool, Value::Bool(_))
            | (ParamType::Int, Value::Int(_))
            | (ParamType::Long, Value::Long(_))
            | (ParamType::Float, Value::Float(_))
            | (ParamType::Char, Value::Char(_))
            | (ParamType::Str, Value::Str(_))
            | (ParamType::List, Value::List(_))
            | (ParamType::Function, Value::Function(_) | Value::Builtin(_))
            | (ParamType::Class, Value::Class(_)) => exact(),
            (ParamType::Object(name), Value::Object(o)) if o.class().name() == name => exact(),

            (ParamType::Long, Value::Int(n)) => Some((WIDENING, Value::Long(i64::from(*n)))),
            (ParamType::Float, Value::Int(n)) => Some((WIDENING, Value::Float(f64::from(*n)))),
            (ParamType::Float, Value::Long(n)) => Some((WIDENING, Value::Float(*n as f64))),
            (ParamType::Str, Value::Char(c)) => Some((WIDENING, Value::Str(c.to_string()))),
            (
                ParamType::Str
                | ParamType::Object(_)
                | ParamType::Function
                | ParamType::List
                | ParamType::Class,
                Value::Null,
            ) => Some((WIDENING, Value::Null)),
            _ => None,
        }
    }
}

pub type CtorFn = Rc<dyn Fn(&Rc<HostClass>, &[Value]) -> Result<Value, HostError>>;
pub type MethodFn = Rc<dyn Fn(&HostObject, &[Value]) -> Result<Value, HostError>>;
pub type StaticFn = Rc<dyn Fn(&[Value]) -> Result<Value, HostError>>;
pub type FieldFn = Rc<dyn Fn(&HostObject) -> Value>;
pub type StaticFieldFn = Rc<dyn Fn() -> Value>;
type DisplayFn = Rc<dyn Fn(&HostObject) -> String>;
type IterFn = Rc<dyn Fn(&HostObject) -> Vec<Value>>;

/// One signature of a possibly-overloaded member.
pub struct Overload<F> {
    pub params: Vec<ParamType>,
    pub func: F,
}

/// Pick the overload for `args`.
///
/// Candidates have exactly `args.len()` parameters. Each argument costs 0
/// for an exact kind match, 1 for a widening conversion and 2 for `Any`;
/// the unique cheapest candidate wins and receives the converted
/// arguments. An empty candidate set or a tie at the minimum is an error.
pub fn select_overload<'a, F>(
    what: &str,
    candidates: &'a [Overload<F>],
    args: &[Value],
) -> EvalResult<(&'a F, Vec<Value>)> {
    let mut best: Option<(u32, &'a Overload<F>, Vec<Value>)> = None;
    let mut tied = false;

    for cand in candidates.iter().filter(|c| c.params.len() == args.len()) {
        let mut total = 0;
        let mut converted = Vec::with_capacity(args.len());
        let applicable = cand.params.iter().zip(args).all(|(p, a)| match p.accept(a) {
            Some((cost, v)) => {
                total += cost;
                converted.push(v);
                true
            }
            None => false,
        });
        if !applicable {
            continue;
        }
        match best.as_ref().map(|b| b.0) {
            Some(cost) if total > cost => {}
            Some(cost) if total == cost => tied = true,
            _ => {
                best = Some((total, cand, converted));
                tied = false;
            }
        }
    }

    let kinds = args
        .iter()
        .map(Value::kind_name)
        .collect::<Vec<_>>()
        .join(", ");
    match best {
        None => Err(EvalError::HostInvocation(format!(
            "no overload of `{what}` accepts ({kinds})"
        ))),
        Some(_) if tied => Err(EvalError::HostInvocation(format!(
            "ambiguous call to `{what}` with ({kinds})"
        ))),
        Some((_, cand, converted)) => Ok((&cand.func, converted)),
    }
}

/// A host type: its members and how instances render.
pub struct HostClass {
    name: String,
    constructors: Vec<Overload<CtorFn>>,
    methods: BTreeMap<String, Vec<Overload<MethodFn>>>,
    static_methods: BTreeMap<String, Vec<Overload<StaticFn>>>,
    fields: BTreeMap<String, FieldFn>,
    static_fields: BTreeMap<String, StaticFieldFn>,
    display: Option<DisplayFn>,
    iterable: Option<IterFn>,
}

impl fmt::Debug for HostClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostClass")
            .field("name", &self.name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("static_methods", &self.static_methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl HostClass {
    pub fn builder(name: impl Into<String>) -> HostClassBuilder {
        HostClassBuilder {
            class: HostClass {
                name: name.into(),
                constructors: Vec::new(),
                methods: BTreeMap::new(),
                static_methods: BTreeMap::new(),
                fields: BTreeMap::new(),
                static_fields: BTreeMap::new(),
                display: None,
                iterable: None,
            },
        }
    }

    /// Fully-qualified dotted name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn has_static_method(&self, name: &str) -> bool {
        self.static_methods.contains_key(name)
    }
}

pub struct HostClassBuilder {
    class: HostClass,
}

impl HostClassBuilder {
    pub fn constructor<F>(mut self, params: &[ParamType], f: F) -> Self
    where
        F: Fn(&Rc<HostClass>, &[Value]) -> Result<Value, HostError> + 'static,
    {
        self.class.constructors.push(Overload {
            params: params.to_vec(),
            func: Rc::new(f),
        });
        self
    }

    pub fn method<F>(mut self, name: &str, params: &[ParamType], f: F) -> Self
    where
        F: Fn(&HostObject, &[Value]) -> Result<Value, HostError> + 'static,
    {
        self.class
            .methods
            .entry(name.to_string())
            .or_default()
            .push(Overload {
                params: params.to_vec(),
                func: Rc::new(f),
            });
        self
    }

    pub fn static_method<F>(mut self, name: &str, params: &[ParamType], f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, HostError> + 'static,
    {
        self.class
            .static_methods
            .entry(name.to_string())
            .or_default()
            .push(Overload {
                params: params.to_vec(),
                func: Rc::new(f),
            });
        self
    }

    pub fn field<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&HostObject) -> Value + 'static,
    {
        self.class.fields.insert(name.to_string(), Rc::new(f));
        self
    }

    pub fn static_field<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn() -> Value + 'static,
    {
        self.class.static_fields.insert(name.to_string(), Rc::new(f));
        self
    }

    pub fn display<F>(mut self, f: F) -> Self
    where
        F: Fn(&HostObject) -> String + 'static,
    {
        self.class.display = Some(Rc::new(f));
        self
    }

    /// Make instances usable as `forEach` sources.
    pub fn iterable<F>(mut self, f: F) -> Self
    where
        F: Fn(&HostObject) -> Vec<Value> + 'static,
    {
        self.class.iterable = Some(Rc::new(f));
        self
    }

    pub fn build(self) -> Rc<HostClass> {
        Rc::new(self.class)
    }
}

/// Opaque handle to a host instance. Equality is identity.
#[derive(Clone)]
pub struct HostObject {
    class: Rc<HostClass>,
    state: Rc<dyn Any>,
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostObject({})", self.class.name)
    }
}

impl HostObject {
    /// Wrap host state. Mutable state belongs in a `RefCell`/`Cell` inside `T`.
    pub fn new<T: Any>(class: &Rc<HostClass>, state: T) -> Self {
        HostObject {
            class: Rc::clone(class),
            state: Rc::new(state),
        }
    }

    pub fn class(&self) -> &Rc<HostClass> {
        &self.class
    }

    pub fn downcast<T: Any>(&self) -> Option<&T> {
        self.state.downcast_ref::<T>()
    }

    pub fn same(&self, other: &HostObject) -> bool {
        std::ptr::eq(
            Rc::as_ptr(&self.state) as *const (),
            Rc::as_ptr(&other.state) as *const (),
        )
    }

    pub fn describe(&self) -> String {
        match &self.class.display {
            Some(f) => f(self),
            None => format!("<{}>", self.class.name),
        }
    }

    /// Elements for iteration, when the class declares itself iterable.
    pub fn elements(&self) -> Option<Vec<Value>> {
        self.class.iterable.as_ref().map(|f| f(self))
    }
}

/// State behind `devcon.Error` objects.
#[derive(Debug)]
struct ErrorInfo {
    kind: String,
    message: String,
}

fn error_class() -> Rc<HostClass> {
    fn info(o: &HostObject) -> Option<&ErrorInfo> {
        o.downcast::<ErrorInfo>()
    }
    HostClass::builder(ERROR_CLASS)
        .field("kind", |o| Value::from(info(o).map(|i| i.kind.clone())))
        .field("message", |o| Value::from(info(o).map(|i| i.message.clone())))
        .display(|o| match info(o) {
            Some(i) => format!("{}: {}", i.kind, i.message),
            None => format!("<{ERROR_CLASS}>"),
        })
        .build()
}

/// Classes reachable from host paths. Injected into the shell.
pub struct HostRegistry {
    classes: BTreeMap<String, Rc<HostClass>>,
}

impl fmt::Debug for HostRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostRegistry")
            .field("classes", &self.classes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for HostRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HostRegistry {
    /// A registry holding only the interpreter's own `devcon.Error` class.
    pub fn new() -> Self {
        let mut reg = Self {
            classes: BTreeMap::new(),
        };
        reg.register(error_class());
        reg
    }

    /// Add or replace a class under its fully-qualified name.
    pub fn register(&mut self, class: Rc<HostClass>) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn class(&self, name: &str) -> Option<Rc<HostClass>> {
        self.classes.get(name).cloned()
    }

    /// Resolve the longest registered class prefix of `segments`, returning
    /// the class and how many segments it consumed.
    pub fn resolve_path<S: AsRef<str>>(&self, segments: &[S]) -> EvalResult<(Rc<HostClass>, usize)> {
        let parts: Vec<&str> = segments.iter().map(AsRef::as_ref).collect();
        for n in (1..=parts.len()).rev() {
            if let Some(class) = self.classes.get(&parts[..n].join(".")) {
                return Ok((Rc::clone(class), n));
            }
        }
        Err(EvalError::HostResolution(format!(
            "no host type matches `.{}`",
            parts.join(".")
        )))
    }

    /// Read a field: static fields on class references, instance fields on
    /// objects (falling back to the class's static fields).
    pub fn get_member(&self, target: &Value, name: &str) -> EvalResult<Value> {
        match target {
            Value::Class(class) => match class.static_fields.get(name) {
                Some(f) => Ok(f()),
                None => Err(missing_member(class, name, class.has_static_method(name))),
            },
            Value::Object(obj) => {
                let class = obj.class();
                if let Some(f) = class.fields.get(name) {
                    return Ok(f(obj));
                }
                match class.static_fields.get(name) {
                    Some(f) => Ok(f()),
                    None => Err(missing_member(
                        class,
                        name,
                        class.has_method(name) || class.has_static_method(name),
                    )),
                }
            }
            other => Err(EvalError::type_err(format!(
                "cannot read `{name}` of a {} value",
                other.kind_name()
            ))),
        }
    }

    /// Call a method: static methods on class references, instance methods
    /// (then static methods) on objects.
    pub fn invoke(
        &self,
        target: &Value,
        member: &str,
        args: Vec<Value>,
        tracer: &mut TraceEmitter,
    ) -> EvalResult<Value> {
        match target {
            Value::Class(class) => {
                let Some(cands) = class.static_methods.get(member) else {
                    return Err(no_method(class, member));
                };
                let what = format!("{}.{member}", class.name);
                let (func, converted) = select_overload(&what, cands, &args)?;
                traced(tracer, class, member, &args, || func(&converted))
            }
            Value::Object(obj) => {
                let class = obj.class();
                let what = format!("{}.{member}", class.name);
                if let Some(cands) = class.methods.get(member) {
                    let (func, converted) = select_overload(&what, cands, &args)?;
                    traced(tracer, class, member, &args, || func(obj, &converted))
                } else if let Some(cands) = class.static_methods.get(member) {
                    let (func, converted) = select_overload(&what, cands, &args)?;
                    traced(tracer, class, member, &args, || func(&converted))
                } else {
                    Err(no_method(class, member))
                }
            }
            other => Err(EvalError::type_err(format!(
                "cannot call `{member}` on a {} value",
                other.kind_name()
            ))),
        }
    }

    pub fn construct(
        &self,
        class: &Rc<HostClass>,
        args: Vec<Value>,
        tracer: &mut TraceEmitter,
    ) -> EvalResult<Value> {
        if class.constructors.is_empty() {
            return Err(EvalError::HostInvocation(format!(
                "`{}` has no constructor",
                class.name
            )));
        }
        let (func, converted) = select_overload(&class.name, &class.constructors, &args)?;
        traced(tracer, class, "new", &args, || func(class, &converted))
    }

    /// Wrap an evaluation error for a `tryCatch` handler.
    pub fn error_object(&self, err: &EvalError) -> Value {
        let class = self.class(ERROR_CLASS).unwrap_or_else(error_class);
        Value::Object(HostObject::new(
            &class,
            ErrorInfo {
                kind: err.kind().to_string(),
                message: err.to_string(),
            },
        ))
    }
}

fn missing_member(class: &HostClass, name: &str, is_method: bool) -> EvalError {
    if is_method {
        EvalError::HostInvocation(format!(
            "`{}.{name}` is a method and must be called",
            class.name
        ))
    } else {
        EvalError::HostInvocation(format!("`{}` has no field `{name}`", class.name))
    }
}

fn no_method(class: &HostClass, name: &str) -> EvalError {
    EvalError::HostInvocation(format!("`{}` has no method `{name}`", class.name))
}

/// Run one host call, recording it on the tracer.
fn traced(
    tracer: &mut TraceEmitter,
    class: &HostClass,
    member: &str,
    args: &[Value],
    call: impl FnOnce() -> Result<Value, HostError>,
) -> EvalResult<Value> {
    debug!(target_class = %class.name, member, argc = args.len(), "host invoke");
    let start = Instant::now();
    let result = call();
    let duration = start.elapsed();

    let output = match &result {
        Ok(v) => TraceOutput::ok(v),
        Err(e) => TraceOutput::error(&e.to_string()),
    };
    if let Err(e) = tracer.emit(&class.name, member, args, output, duration) {
        warn!(error = %e, "dropping host-call trace record");
    }

    result.map_err(|e| EvalError::HostInvocation(format!("{}.{member}: {e}", class.name)))
}

// Argument accessors for host callables. Overload selection has already
// converted arguments to the declared kinds, so a mismatch is a host bug
// surfaced as `BadArgument`.

pub fn arg_int(args: &[Value], i: usize) -> Result<i32, HostError> {
    match args.get(i) {
        Some(Value::Int(n)) => Ok(*n),
        other => Err(bad_arg(i, "int", other)),
    }
}

pub fn arg_float(args: &[Value], i: usize) -> Result<f64, HostError> {
    args.get(i)
        .and_then(Value::as_f64)
        .ok_or_else(|| bad_arg(i, "float", args.get(i)))
}

pub fn arg_str(args: &[Value], i: usize) -> Result<&str, HostError> {
    match args.get(i) {
        Some(Value::Str(s)) => Ok(s),
        other => Err(bad_arg(i, "string", other)),
    }
}

pub fn arg_object<T: Any>(args: &[Value], i: usize) -> Result<&T, HostError> {
    match args.get(i) {
        Some(Value::Object(o)) => o
            .downcast::<T>()
            .ok_or_else(|| bad_arg(i, o.class().name(), args.get(i))),
        other => Err(bad_arg(i, "object", other)),
    }
}

fn bad_arg(i: usize, want: &str, got: Option<&Value>) -> HostError {
    HostError::BadArgument(format!(
        "argument {} should be {want}, got {}",
        i + 1,
        got.map_or("nothing", Value::kind_name)
    ))
}
