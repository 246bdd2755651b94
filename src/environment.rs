//! Lexically scoped variable bindings.
//!
//! Scopes form a parent-linked chain, innermost frame first. Blocks push a
//! frame whose parent is whatever was current when the block was entered;
//! function calls push a frame whose parent is always the global frame,
//! regardless of where the call happened to occur lexically, matching the
//! evaluation model: a function body cannot see its caller's locals.
//!
//! The evaluator is the sole owner of the chain - nothing outside this
//! module retains a frame across a call boundary. [`Environment::enter`]
//! returns a guard that restores the previous frame when dropped, so a
//! scope is released on every exit path (normal fall-through, an early
//! `?`-propagated error, or a `return` unwind) without the evaluator having
//! to remember to pop it explicitly.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::Value;

struct Frame {
    bindings: HashMap<String, Value>,
    parent: Option<Rc<RefCell<Frame>>>,
}

impl Frame {
    fn child(parent: Rc<RefCell<Frame>>) -> Self {
        Self {
            bindings: HashMap::new(),
            parent: Some(parent),
        }
    }
}

pub struct Environment {
    global: Rc<RefCell<Frame>>,
    current: Rc<RefCell<Frame>>,
}

impl Environment {
    pub fn new() -> Self {
        let global = Rc::new(RefCell::new(Frame {
            bindings: HashMap::new(),
            parent: None,
        }));
        Self {
            global: global.clone(),
            current: global,
        }
    }

    /// Defines `name` in the current (innermost) frame, shadowing any outer
    /// binding of the same name. Used for typed declarations, which always
    /// narrow to the local scope.
    pub fn define(&mut self, name: &str, value: Value) {
        self.current
            .borrow_mut()
            .bindings
            .insert(name.to_string(), value);
    }

    /// Looks up `name` by walking outward from the current frame.
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut frame = Some(self.current.clone());
        while let Some(f) = frame {
            if let Some(value) = f.borrow().bindings.get(name) {
                return Some(value.clone());
            }
            frame = f.borrow().parent.clone();
        }
        None
    }

    /// Updates the nearest existing binding of `name` in the scope chain;
    /// if none exists, defines it in the current frame. This is the plain
    /// `x = expr` assignment semantics (as opposed to a typed declaration,
    /// which always narrows locally via [`Environment::define`]).
    pub fn assign(&mut self, name: &str, value: Value) {
        let mut frame = Some(self.current.clone());
        while let Some(f) = frame {
            if f.borrow().bindings.contains_key(name) {
                f.borrow_mut().bindings.insert(name.to_string(), value);
                return;
            }
            frame = f.borrow().parent.clone();
        }
        self.define(name, value);
    }

    /// Pushes a new block-scoped frame parented to the current frame.
    /// Releases automatically when the returned guard drops.
    pub fn enter_block(&mut self) -> ScopeGuard<'_> {
        let new_frame = Rc::new(RefCell::new(Frame::child(self.current.clone())));
        let previous = std::mem::replace(&mut self.current, new_frame);
        ScopeGuard {
            env: self,
            previous,
        }
    }

    /// Pushes a new function-call frame parented directly to the global
    /// frame, bypassing whatever block scopes are active at the call site.
    pub fn enter_function(&mut self) -> ScopeGuard<'_> {
        let new_frame = Rc::new(RefCell::new(Frame::child(self.global.clone())));
        let previous = std::mem::replace(&mut self.current, new_frame);
        ScopeGuard {
            env: self,
            previous,
        }
    }
}

/// RAII guard restoring the enclosing frame when a block or function call
/// scope ends, on every exit path including early returns and errors.
pub struct ScopeGuard<'a> {
    env: &'a mut Environment,
    previous: Rc<RefCell<Frame>>,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.env.current = self.previous.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_walks_outward_through_blocks() {
        let mut env = Environment::new();
        env.define("x", Value::Int(1));
        {
            let mut scoped = env.enter_block();
            assert_eq!(scoped.env.get("x"), Some(Value::Int(1)));
            scoped.env.define("y", Value::Int(2));
            assert_eq!(scoped.env.get("y"), Some(Value::Int(2)));
        }
        assert_eq!(env.get("y"), None, "inner block binding must not leak out");
    }

    #[test]
    fn assign_updates_outer_binding_without_shadowing() {
        let mut env = Environment::new();
        env.define("x", Value::Int(1));
        {
            let mut scoped = env.enter_block();
            scoped.env.assign("x", Value::Int(2));
        }
        assert_eq!(env.get("x"), Some(Value::Int(2)));
    }

    #[test]
    fn typed_declaration_shadows_rather_than_updating_outer() {
        let mut env = Environment::new();
        env.define("x", Value::Int(1));
        {
            let mut scoped = env.enter_block();
            scoped.env.define("x", Value::Int(99));
            assert_eq!(scoped.env.get("x"), Some(Value::Int(99)));
        }
        assert_eq!(env.get("x"), Some(Value::Int(1)));
    }

    #[test]
    fn function_frame_cannot_see_caller_block_locals() {
        let mut env = Environment::new();
        env.define("global_var", Value::Int(10));
        {
            let mut block = env.enter_block();
            block.env.define("block_local", Value::Int(20));
            {
                let mut call = block.env.enter_function();
                assert_eq!(call.env.get("global_var"), Some(Value::Int(10)));
                assert_eq!(call.env.get("block_local"), None);
            }
        }
    }

    #[test]
    fn assign_with_no_existing_binding_defines_in_current_frame() {
        let mut env = Environment::new();
        {
            let mut scoped = env.enter_block();
            scoped.env.assign("fresh", Value::Int(5));
            assert_eq!(scoped.env.get("fresh"), Some(Value::Int(5)));
        }
        assert_eq!(env.get("fresh"), None);
    }
}
