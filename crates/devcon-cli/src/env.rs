//! Lexically-scoped environment chain.
//!
//! An [`Env`] is a shared handle to a [`Frame`]. Cloning the handle is cheap
//! and shares the frame, which is how closures keep their defining scope
//! alive after the call that created it has returned.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{EvalError, EvalResult};
use crate::value::Value;

#[derive(Default)]
pub struct Frame {
    vars: HashMap<String, Value>,
    parent: Option<Env>,
}

#[derive(Clone)]
pub struct Env(Rc<RefCell<Frame>>);

impl fmt::Debug for Env {
    // Frames can be captured by closures stored inside them; print shape only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frame = self.0.borrow();
        f.debug_struct("Env")
            .field("vars", &frame.vars.len())
            .field("global", &frame.parent.is_none())
            .finish()
    }
}

impl Env {
    /// A fresh root frame.
    pub fn new_global() -> Self {
        Env(Rc::new(RefCell::new(Frame::default())))
    }

    /// A new frame whose parent is `self`.
    pub fn child(&self) -> Self {
        Env(Rc::new(RefCell::new(Frame {
            vars: HashMap::new(),
            parent: Some(self.clone()),
        })))
    }

    fn parent(&self) -> Option<Env> {
        self.0.borrow().parent.clone()
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        let mut cur = Some(self.clone());
        while let Some(env) = cur {
            let frame = env.0.borrow();
            if let Some(v) = frame.vars.get(name) {
                return Some(v.clone());
            }
            cur = frame.parent.clone();
        }
        None
    }

    /// Innermost-to-global lookup.
    pub fn get(&self, name: &str) -> EvalResult<Value> {
        self.lookup(name)
            .ok_or_else(|| EvalError::UnboundName(name.to_string()))
    }

    /// Bind in the current frame only, shadowing any outer binding.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.borrow_mut().vars.insert(name.into(), value);
    }

    pub fn exists(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// The root frame of this chain.
    pub fn global(&self) -> Env {
        let mut cur = self.clone();
        while let Some(p) = cur.parent() {
            cur = p;
        }
        cur
    }

    pub fn is_global(&self) -> bool {
        self.0.borrow().parent.is_none()
    }

    pub fn set_global(&self, name: impl Into<String>, value: Value) {
        self.global().define(name, value);
    }

    pub fn get_global(&self, name: &str) -> EvalResult<Value> {
        let global = self.global();
        let frame = global.0.borrow();
        frame
            .vars
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UnboundName(name.to_string()))
    }

    /// Lookup that skips the current frame.
    pub fn get_parent_var(&self, name: &str) -> EvalResult<Value> {
        self.parent()
            .and_then(|p| p.lookup(name))
            .ok_or_else(|| EvalError::UnboundName(name.to_string()))
    }

    /// Sorted names bound directly in this frame.
    pub fn local_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.borrow().vars.keys().cloned().collect();
        names.sort();
        names
    }

    /// Drop every binding in this frame. Used on shell teardown to break
    /// reference cycles between closures and the global frame.
    pub(crate) fn clear(&self) {
        self.0.borrow_mut().vars.clear();
    }

    pub fn ptr_eq(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_outward() {
        let g = Env::new_global();
        g.define("a", Value::Int(1));
        let inner = g.child().child();
        assert!(inner.get("a").unwrap().eql(&Value::Int(1)));
        assert!(matches!(inner.get("b"), Err(EvalError::UnboundName(n)) if n == "b"));
    }

    #[test]
    fn define_shadows_without_touching_outer() {
        let g = Env::new_global();
        g.define("x", Value::Int(1));
        let c = g.child();
        c.define("x", Value::Int(2));
        assert!(c.get("x").unwrap().eql(&Value::Int(2)));
        assert!(g.get("x").unwrap().eql(&Value::Int(1)));
    }

    #[test]
    fn parent_var_skips_current_frame() {
        let g = Env::new_global();
        g.define("x", Value::Int(1));
        let c = g.child();
        c.define("x", Value::Int(2));
        assert!(c.get_parent_var("x").unwrap().eql(&Value::Int(1)));
        assert!(g.get_parent_var("x").is_err());
    }

    #[test]
    fn globals_reachable_from_any_depth() {
        let g = Env::new_global();
        let deep = g.child().child().child();
        deep.set_global("k", Value::from("v"));
        assert!(deep.global().ptr_eq(&g));
        assert!(g.get("k").is_ok());
        assert!(deep.get_global("k").is_ok());
        assert!(!deep.is_global());
        assert!(g.is_global());
    }

    #[test]
    fn local_names_sorted() {
        let g = Env::new_global();
        g.define("b", Value::Null);
        g.define("a", Value::Null);
        assert_eq!(g.local_names(), vec!["a".to_string(), "b".to_string()]);
    }
}
