use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

/// A symbol-to-value mapping with an optional parent (§3.2).
///
/// Lookups walk the parent chain and clone whatever they find; writes clone
/// the value being inserted. Cloning an `Environment` handle (see
/// `clone_handle`) copies only this frame's own bindings table — the
/// `parent` link is a shared `Rc`, never recursively duplicated. That's
/// what lets a closure's already-bound formal arguments stay untouched by a
/// later global `def` while still seeing updates to free variables that
/// resolve through the (shared) parent chain.
///
/// `exit_flag` is a second, independently shared `Rc`: every environment in
/// a program run — root, every child scope, every cloned closure frame —
/// points at the *same* flag cell, set by the `exit` built-in and polled by
/// the host driver (the REPL loop, `load`) after each top-level evaluation.
/// This is the "host-visible signal" spec.md §9 calls for in place of
/// string-matching a sentinel error message.
#[derive(Debug)]
pub struct Environment {
    bindings: HashMap<String, Value>,
    parent: Option<Rc<RefCell<Environment>>>,
    exit_flag: Rc<Cell<bool>>,
}

impl Environment {
    pub fn new_root() -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(Environment {
            bindings: HashMap::new(),
            parent: None,
            exit_flag: Rc::new(Cell::new(false)),
        }))
    }

    pub fn new_child(parent: &Rc<RefCell<Environment>>) -> Rc<RefCell<Environment>> {
        let exit_flag = Rc::clone(&parent.borrow().exit_flag);
        Rc::new(RefCell::new(Environment {
            bindings: HashMap::new(),
            parent: Some(Rc::clone(parent)),
            exit_flag,
        }))
    }

    /// Produces an independent environment handle: a fresh copy of this
    /// frame's bindings, sharing the same parent pointer. Used whenever a
    /// `Function::Lambda` value is cloned (every time it is read out of an
    /// environment, or partially applied).
    pub fn clone_handle(env: &Rc<RefCell<Environment>>) -> Rc<RefCell<Environment>> {
        let borrowed = env.borrow();
        Rc::new(RefCell::new(Environment {
            bindings: borrowed.bindings.clone(),
            parent: borrowed.parent.clone(),
            exit_flag: Rc::clone(&borrowed.exit_flag),
        }))
    }

    /// Sets the shared exit flag. Called by the `exit` built-in.
    pub fn request_exit(&self) {
        self.exit_flag.set(true);
    }

    /// Polled by the REPL loop and `load` after each top-level evaluation.
    pub fn exit_requested(&self) -> bool {
        self.exit_flag.get()
    }

    /// Recursive lookup through the parent chain (§3.2: reads return a
    /// deep clone of the stored value).
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.bindings.get(name) {
            Some(v.clone())
        } else if let Some(parent) = &self.parent {
            parent.borrow().get(name)
        } else {
            None
        }
    }

    /// `put`: local write, creating or replacing a binding in this frame.
    pub fn put(&mut self, name: &str, value: Value) {
        self.bindings.insert(name.to_string(), value);
    }

    /// `define`: walks to the root (the ancestor with no parent) and puts
    /// there, so the binding is globally visible.
    pub fn define(env: &Rc<RefCell<Environment>>, name: &str, value: Value) {
        let root = Environment::root_of(env);
        root.borrow_mut().put(name, value);
    }

    fn root_of(env: &Rc<RefCell<Environment>>) -> Rc<RefCell<Environment>> {
        let mut current = Rc::clone(env);
        loop {
            let parent = current.borrow().parent.clone();
            match parent {
                Some(p) => current = p,
                None => return current,
            }
        }
    }

    /// Reassigns this frame's parent. Used by the caller (§4.3) to give a
    /// fully-applied lambda's environment dynamic access to the call site,
    /// on top of its own statically captured bindings.
    pub fn set_parent(&mut self, parent: Rc<RefCell<Environment>>) {
        self.parent = Some(parent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_parent_chain() {
        let root = Environment::new_root();
        root.borrow_mut().put("x", Value::Number(10));
        let child = Environment::new_child(&root);
        assert_eq!(child.borrow().get("x"), Some(Value::Number(10)));
    }

    #[test]
    fn define_writes_to_root_even_from_child() {
        let root = Environment::new_root();
        let child = Environment::new_child(&root);
        Environment::define(&child, "y", Value::Number(5));
        assert_eq!(root.borrow().get("y"), Some(Value::Number(5)));
    }

    #[test]
    fn clone_handle_shares_parent_but_copies_bindings() {
        let root = Environment::new_root();
        let original = Environment::new_child(&root);
        original.borrow_mut().put("a", Value::Number(1));

        let cloned = Environment::clone_handle(&original);
        cloned.borrow_mut().put("a", Value::Number(2));

        assert_eq!(original.borrow().get("a"), Some(Value::Number(1)));
        assert_eq!(cloned.borrow().get("a"), Some(Value::Number(2)));

        // Writing a global from the clone is still visible from the original,
        // since both share the same root via the parent Rc.
        Environment::define(&cloned, "g", Value::Number(99));
        assert_eq!(original.borrow().get("g"), Some(Value::Number(99)));
    }

    #[test]
    fn exit_flag_is_shared_across_children_and_clones() {
        let root = Environment::new_root();
        let child = Environment::new_child(&root);
        let cloned_child = Environment::clone_handle(&child);
        assert!(!root.borrow().exit_requested());

        cloned_child.borrow().request_exit();

        assert!(root.borrow().exit_requested());
        assert!(child.borrow().exit_requested());
        assert!(cloned_child.borrow().exit_requested());
    }
}
