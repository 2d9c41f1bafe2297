//! Execution environment for the M interpreter.
//!
//! Variables are dynamically scoped. Scope 0 is the persistent scope; calls
//! and `new` push scopes above it and callers pop them by truncating the stack
//! back to a saved depth.

use std::collections::HashMap;

use serde::Serialize;

use crate::array::MArray;

/// A pointer to a variable slot: a scope index and a name within it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MReference {
    pub scope: usize,
    pub name: String,
}

/// What a name is bound to within one scope
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Value(MArray),
    /// Call-by-reference parameter
    Reference(MReference),
}

#[derive(Debug, Clone, Default)]
struct Scope {
    bindings: HashMap<String, Binding>,
    /// Pushed by an argumentless `new`: lookups do not continue below it
    exclusive: bool,
}

/// Stack of variable scopes (top = innermost)
#[derive(Debug, Clone)]
pub struct Environment {
    scopes: Vec<Scope>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Create a new environment with only the persistent scope
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    /// Number of scopes on the stack
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Push a scope that hides every binding below it
    pub fn push_exclusive_scope(&mut self) {
        self.scopes.push(Scope {
            bindings: HashMap::new(),
            exclusive: true,
        });
    }

    /// Pop scopes until `depth` remain; the persistent scope always stays
    pub fn truncate(&mut self, depth: usize) {
        self.scopes.truncate(depth.max(1));
    }

    /// Drop every scope and every binding
    pub fn reset(&mut self) {
        self.scopes = vec![Scope::default()];
    }

    /// Bind `name` in the top scope
    pub fn bind(&mut self, name: impl Into<String>, binding: Binding) {
        if let Some(top) = self.scopes.last_mut() {
            top.bindings.insert(name.into(), binding);
        }
    }

    /// Index of the scope a lookup of `name` lands in
    fn defining_scope(&self, name: &str) -> usize {
        for (index, scope) in self.scopes.iter().enumerate().rev() {
            if scope.exclusive || scope.bindings.contains_key(name) {
                return index;
            }
        }
        0
    }

    /// Resolve `name` to the slot it designates, following references.
    ///
    /// A reference into a scope that has since been popped falls back to the
    /// persistent scope.
    pub fn resolve(&self, name: &str) -> MReference {
        let mut slot = MReference {
            scope: self.defining_scope(name),
            name: name.to_string(),
        };

        // Each hop moves to a distinct binding; the bound stops cycles.
        for _ in 0..=self.scopes.len() {
            match self.scopes[slot.scope].bindings.get(&slot.name) {
                Some(Binding::Reference(target)) => {
                    slot = if target.scope < self.scopes.len() {
                        target.clone()
                    } else {
                        MReference {
                            scope: 0,
                            name: target.name.clone(),
                        }
                    };
                }
                _ => break,
            }
        }
        slot
    }

    /// The array bound to `name`, if any
    pub fn get(&self, name: &str) -> Option<&MArray> {
        let slot = self.resolve(name);
        match self.scopes[slot.scope].bindings.get(&slot.name) {
            Some(Binding::Value(array)) => Some(array),
            _ => None,
        }
    }

    /// The array bound to `name`, created empty in its slot if missing
    pub fn get_or_insert(&mut self, name: &str) -> &mut MArray {
        let slot = self.resolve(name);
        let binding = self.scopes[slot.scope]
            .bindings
            .entry(slot.name)
            .or_insert_with(|| Binding::Value(MArray::default()));
        if let Binding::Reference(_) = binding {
            *binding = Binding::Value(MArray::default());
        }
        match binding {
            Binding::Value(array) => array,
            Binding::Reference(_) => unreachable!("reference replaced above"),
        }
    }

    /// Remove the binding `name` resolves to. Lookups then fall through to
    /// any outer binding of the same name.
    pub fn kill(&mut self, name: &str) {
        let slot = self.resolve(name);
        self.scopes[slot.scope].bindings.remove(&slot.name);
    }

    /// Defined variables of the persistent scope, sorted by name
    pub fn persistent_variables(&self) -> Vec<(&str, &MArray)> {
        let mut vars: Vec<_> = self.scopes[0]
            .bindings
            .iter()
            .filter_map(|(name, binding)| match binding {
                Binding::Value(array) if !array.is_undefined() => Some((name.as_str(), array)),
                _ => None,
            })
            .collect();
        vars.sort_by(|a, b| a.0.cmp(b.0));
        vars
    }
}

#[cfg(test)]
mod environment_tests {
    use super::*;
    use crate::interpreter::value::MValue;

    fn set(env: &mut Environment, name: &str, value: &str) {
        env.get_or_insert(name).value = MValue::from(value);
    }

    fn read(env: &Environment, name: &str) -> MValue {
        env.get(name).map(|a| a.value.clone()).unwrap_or_default()
    }

    #[test]
    fn test_inner_scope_shadows_until_truncated() {
        let mut env = Environment::new();
        set(&mut env, "x", "outer");

        let depth = env.depth();
        env.push_scope();
        env.bind("x", Binding::Value(MArray::default()));
        set(&mut env, "x", "inner");
        assert_eq!(read(&env, "x"), MValue::from("inner"));

        env.truncate(depth);
        assert_eq!(read(&env, "x"), MValue::from("outer"));
    }

    #[test]
    fn test_unbound_names_land_in_persistent_scope() {
        let mut env = Environment::new();
        env.push_scope();
        set(&mut env, "y", "1");
        env.truncate(1);
        assert_eq!(read(&env, "y"), MValue::from("1"));
    }

    #[test]
    fn test_exclusive_scope_hides_outer_bindings() {
        let mut env = Environment::new();
        set(&mut env, "x", "outer");
        env.push_exclusive_scope();
        assert_eq!(read(&env, "x"), MValue::empty());
        set(&mut env, "x", "hidden");
        env.truncate(1);
        assert_eq!(read(&env, "x"), MValue::from("outer"));
    }

    #[test]
    fn test_references_write_through() {
        let mut env = Environment::new();
        set(&mut env, "x", "1");
        let target = env.resolve("x");

        env.push_scope();
        env.bind("p", Binding::Reference(target));
        set(&mut env, "p", "2");

        env.push_scope();
        let chained = env.resolve("p");
        env.bind("q", Binding::Reference(chained));
        assert_eq!(read(&env, "q"), MValue::from("2"));

        env.truncate(1);
        assert_eq!(read(&env, "x"), MValue::from("2"));
    }

    #[test]
    fn test_dangling_reference_falls_back_to_persistent_scope() {
        let mut env = Environment::new();
        env.push_scope();
        env.bind(
            "p",
            Binding::Reference(MReference {
                scope: 7,
                name: "z".to_string(),
            }),
        );
        assert_eq!(env.resolve("p"), MReference { scope: 0, name: "z".to_string() });
    }

    #[test]
    fn test_kill_removes_inner_binding() {
        let mut env = Environment::new();
        set(&mut env, "x", "outer");
        env.push_scope();
        env.bind("x", Binding::Value(MArray::new(MValue::from("inner"))));
        env.kill("x");
        assert_eq!(read(&env, "x"), MValue::from("outer"));

        env.truncate(1);
        env.kill("x");
        assert!(env.get("x").is_none());
        assert!(env.persistent_variables().is_empty());
    }
}
