//! Lexical scope chain, generic over the value kind it stores.
//!
//! Both the checker (`Env<Type>`) and the evaluator (`Env<Value>`) are one
//! structural idea — a map from name to payload plus a non-owning link to a
//! parent scope — so it is implemented once here instead of twice. `Rc` ties
//! scopes together since a child's lifetime is not statically nested inside
//! its parent from the borrow checker's point of view (the call-boundary
//! environment for a function body is rooted at the *global* scope, not at
//! the lexical block that contains the call).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug)]
struct Scope<V> {
    bindings: HashMap<String, V>,
    parent: Option<Env<V>>,
}

/// A handle to one scope in the chain. Cheap to clone (an `Rc` bump).
#[derive(Debug)]
pub struct Env<V>(Rc<RefCell<Scope<V>>>);

impl<V> Clone for Env<V> {
    fn clone(&self) -> Self {
        Env(Rc::clone(&self.0))
    }
}

impl<V: Clone> Env<V> {
    pub fn root() -> Self {
        Env(Rc::new(RefCell::new(Scope {
            bindings: HashMap::new(),
            parent: None,
        })))
    }

    pub fn child(parent: &Env<V>) -> Self {
        Env(Rc::new(RefCell::new(Scope {
            bindings: HashMap::new(),
            parent: Some(parent.clone()),
        })))
    }

    /// Always writes to this scope, shadowing any outer binding.
    pub fn define(&self, name: impl Into<String>, value: V) {
        self.0.borrow_mut().bindings.insert(name.into(), value);
    }

    /// Walks parent links to the root looking for `name`.
    pub fn get(&self, name: &str) -> Option<V> {
        let scope = self.0.borrow();
        if let Some(v) = scope.bindings.get(name) {
            return Some(v.clone());
        }
        match &scope.parent {
            Some(parent) => parent.get(name),
            None => None,
        }
    }

    pub fn has(&self, name: &str) -> bool {
        let scope = self.0.borrow();
        if scope.bindings.contains_key(name) {
            return true;
        }
        match &scope.parent {
            Some(parent) => parent.has(name),
            None => false,
        }
    }

    /// Updates the first scope along the chain that already defines `name`.
    /// Returns `false` (no scope updated) if no scope defines it.
    pub fn set(&self, name: &str, value: V) -> bool {
        let mut scope = self.0.borrow_mut();
        if scope.bindings.contains_key(name) {
            scope.bindings.insert(name.to_string(), value);
            return true;
        }
        match &scope.parent {
            Some(parent) => parent.set(name, value),
            None => false,
        }
    }

    /// Names bound directly in this scope (not its ancestors), for the
    /// debugger's scope-chain dump. Order is unspecified.
    pub fn local_names(&self) -> Vec<String> {
        self.0.borrow().bindings.keys().cloned().collect()
    }

    pub fn parent(&self) -> Option<Env<V>> {
        self.0.borrow().parent.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_shadows_in_child_without_touching_parent() {
        let root = Env::<i64>::root();
        root.define("x", 1);
        let child = Env::child(&root);
        child.define("x", 2);
        assert_eq!(child.get("x"), Some(2));
        assert_eq!(root.get("x"), Some(1));
    }

    #[test]
    fn set_updates_the_defining_scope_not_the_current_one() {
        let root = Env::<i64>::root();
        root.define("x", 1);
        let child = Env::child(&root);
        assert!(child.set("x", 42));
        assert_eq!(root.get("x"), Some(42));
        assert_eq!(child.local_names().len(), 0);
    }

    #[test]
    fn set_on_undefined_name_fails() {
        let root = Env::<i64>::root();
        assert!(!root.set("missing", 1));
    }

    #[test]
    fn get_walks_to_root() {
        let root = Env::<i64>::root();
        root.define("a", 10);
        let mid = Env::child(&root);
        let leaf = Env::child(&mid);
        assert_eq!(leaf.get("a"), Some(10));
        assert!(leaf.has("a"));
        assert!(!leaf.has("b"));
    }
}
