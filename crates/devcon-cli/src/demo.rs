//! A small host model for the CLI and tests: the "game" a console session
//! pokes at.
//!
//! | class | members |
//! |---|---|
//! | `game.Vec2` | `(x, y)`; fields `x`, `y`; `add(Vec2)`, `scale(Float)`, `length()` |
//! | `game.Player` | `(name)`; fields `name`, `health`, `position`, `alive`; `damage`, `heal`, `moveBy`; static `count()` |
//! | `std.Math` | `abs`, `max`, `sign`, `sqrt` overloads; static field `PI` |

use std::cell::Cell;
use std::rc::Rc;

use crate::error::{EvalError, EvalResult};
use crate::host::{
    arg_float, arg_int, arg_object, arg_str, HostClass, HostError, HostObject, HostRegistry,
    ParamType,
};
use crate::trace::TraceEmitter;
use crate::value::Value;

pub const VEC2: &str = "game.Vec2";
pub const PLAYER: &str = "game.Player";
pub const MATH: &str = "std.Math";

pub const MAX_HEALTH: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug)]
pub struct Player {
    pub name: String,
    pub health: Cell<i32>,
    pub position: Cell<Vec2>,
}

/// Registry holding the demo classes.
pub fn registry() -> HostRegistry {
    let mut reg = HostRegistry::new();
    let vec2 = vec2_class();
    reg.register(player_class(&vec2));
    reg.register(vec2);
    reg.register(math_class());
    reg
}

/// Construct a `game.Player` through the registry, as `.game.Player(name)`
/// would.
pub fn spawn_player(host: &HostRegistry, name: &str) -> EvalResult<Value> {
    let class = host
        .class(PLAYER)
        .ok_or_else(|| EvalError::HostResolution(format!("no host type `{PLAYER}`")))?;
    host.construct(&class, vec![Value::from(name)], &mut TraceEmitter::disabled())
}

fn vec2_value(class: &Rc<HostClass>, v: Vec2) -> Value {
    Value::Object(HostObject::new(class, v))
}

fn vec2_of(o: &HostObject) -> Vec2 {
    o.downcast::<Vec2>().copied().unwrap_or(Vec2 { x: 0.0, y: 0.0 })
}

fn vec2_class() -> Rc<HostClass> {
    let vec2 = ParamType::Object(VEC2.to_string());
    HostClass::builder(VEC2)
        .constructor(&[ParamType::Float, ParamType::Float], |class, args| {
            let v = Vec2 {
                x: arg_float(args, 0)?,
                y: arg_float(args, 1)?,
            };
            Ok(vec2_value(class, v))
        })
        .field("x", |o| Value::Float(vec2_of(o).x))
        .field("y", |o| Value::Float(vec2_of(o).y))
        .method("add", &[vec2], |o, args| {
            let (a, b) = (vec2_of(o), arg_object::<Vec2>(args, 0)?);
            Ok(vec2_value(
                o.class(),
                Vec2 {
                    x: a.x + b.x,
                    y: a.y + b.y,
                },
            ))
        })
        .method("scale", &[ParamType::Float], |o, args| {
            let (a, k) = (vec2_of(o), arg_float(args, 0)?);
            Ok(vec2_value(o.class(), Vec2 { x: a.x * k, y: a.y * k }))
        })
        .method("length", &[], |o, _| {
            let a = vec2_of(o);
            Ok(Value::Float(a.x.hypot(a.y)))
        })
        .display(|o| {
            let a = vec2_of(o);
            format!("Vec2({}, {})", Value::Float(a.x), Value::Float(a.y))
        })
        .iterable(|o| {
            let a = vec2_of(o);
            vec![Value::Float(a.x), Value::Float(a.y)]
        })
        .build()
}

fn player_of(o: &HostObject) -> Result<&Player, HostError> {
    o.downcast::<Player>()
        .ok_or_else(|| HostError::Failed(format!("{} is not a player", o.class().name())))
}

fn player_class(vec2: &Rc<HostClass>) -> Rc<HostClass> {
    let spawned = Rc::new(Cell::new(0_i32));
    let counter = Rc::clone(&spawned);
    let vec2_for_field = Rc::clone(vec2);
    let vec2_for_move = Rc::clone(vec2);
    let vec2_for_move_by = Rc::clone(vec2);

    HostClass::builder(PLAYER)
        .constructor(&[ParamType::Str], move |class, args| {
            let name = arg_str(args, 0)?;
            if name.is_empty() {
                return Err(HostError::BadArgument("player name is empty".into()));
            }
            counter.set(counter.get() + 1);
            Ok(Value::Object(HostObject::new(
                class,
                Player {
                    name: name.to_string(),
                    health: Cell::new(MAX_HEALTH),
                    position: Cell::new(Vec2 { x: 0.0, y: 0.0 }),
                },
            )))
        })
        .static_method("count", &[], move |_| Ok(Value::Int(spawned.get())))
        .field("name", |o| {
            Value::from(o.downcast::<Player>().map(|p| p.name.clone()))
        })
        .field("health", |o| {
            Value::from(o.downcast::<Player>().map(|p| p.health.get()))
        })
        .field("alive", |o| {
            Value::Bool(o.downcast::<Player>().is_some_and(|p| p.health.get() > 0))
        })
        .field("position", move |o| match o.downcast::<Player>() {
            Some(p) => vec2_value(&vec2_for_field, p.position.get()),
            None => Value::Null,
        })
        .method("damage", &[ParamType::Int], |o, args| {
            let p = player_of(o)?;
            let amount = arg_int(args, 0)?;
            if amount < 0 {
                return Err(HostError::BadArgument("damage must not be negative".into()));
            }
            p.health.set(p.health.get().saturating_sub(amount).max(0));
            Ok(Value::Int(p.health.get()))
        })
        .method("heal", &[ParamType::Int], |o, args| {
            let p = player_of(o)?;
            let amount = arg_int(args, 0)?;
            p.health
                .set(p.health.get().saturating_add(amount).clamp(0, MAX_HEALTH));
            Ok(Value::Int(p.health.get()))
        })
        .method(
            "moveBy",
            &[ParamType::Float, ParamType::Float],
            move |o, args| {
                let delta = Vec2 {
                    x: arg_float(args, 0)?,
                    y: arg_float(args, 1)?,
                };
                move_player(o, delta, &vec2_for_move)
            },
        )
        .method(
            "moveBy",
            &[ParamType::Object(VEC2.to_string())],
            move |o, args| {
                let delta = *arg_object::<Vec2>(args, 0)?;
                move_player(o, delta, &vec2_for_move_by)
            },
        )
        .display(|o| match o.downcast::<Player>() {
            Some(p) => format!("<Player {} hp={}>", p.name, p.health.get()),
            None => format!("<{PLAYER}>"),
        })
        .build()
}

fn move_player(o: &HostObject, delta: Vec2, vec2: &Rc<HostClass>) -> Result<Value, HostError> {
    let p = player_of(o)?;
    let at = p.position.get();
    let to = Vec2 {
        x: at.x + delta.x,
        y: at.y + delta.y,
    };
    p.position.set(to);
    Ok(vec2_value(vec2, to))
}

fn math_class() -> Rc<HostClass> {
    HostClass::builder(MATH)
        .static_field("PI", || Value::Float(std::f64::consts::PI))
        .static_method("abs", &[ParamType::Int], |args| {
            arg_int(args, 0)?
                .checked_abs()
                .map(Value::Int)
                .ok_or_else(|| HostError::Failed("abs overflows int".into()))
        })
        .static_method("abs", &[ParamType::Float], |args| {
            Ok(Value::Float(arg_float(args, 0)?.abs()))
        })
        .static_method("max", &[ParamType::Int, ParamType::Int], |args| {
            Ok(Value::Int(arg_int(args, 0)?.max(arg_int(args, 1)?)))
        })
        .static_method("max", &[ParamType::Float, ParamType::Float], |args| {
            Ok(Value::Float(arg_float(args, 0)?.max(arg_float(args, 1)?)))
        })
        .static_method("sign", &[ParamType::Long], |args| {
            let n = args.first().and_then(Value::as_i64).unwrap_or_default();
            Ok(Value::Long(n.signum()))
        })
        .static_method("sign", &[ParamType::Float], |args| {
            let f = arg_float(args, 0)?;
            Ok(Value::Float(if f == 0.0 { 0.0 } else { f.signum() }))
        })
        .static_method("sqrt", &[ParamType::Float], |args| {
            let f = arg_float(args, 0)?;
            if f < 0.0 {
                return Err(HostError::Failed(format!("sqrt of negative number {f}")));
            }
            Ok(Value::Float(f.sqrt()))
        })
        .build()
}
