//! Host-provided functions.
//!
//! Calls to names that are not tags are looked up in an [`Externs`] table.
//! An extern receives already-evaluated arguments and may return a value.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::value::MValue;

/// A host function callable from M code
pub trait ExternFunction {
    fn call(&self, args: &[MValue]) -> Option<MValue>;
}

impl<F> ExternFunction for F
where
    F: Fn(&[MValue]) -> Option<MValue>,
{
    fn call(&self, args: &[MValue]) -> Option<MValue> {
        self(args)
    }
}

/// Name -> function table consulted for calls that match no tag
#[derive(Clone, Default)]
pub struct Externs {
    functions: HashMap<String, Rc<dyn ExternFunction>>,
}

impl Externs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function, replacing any previous one with the same name
    pub fn register(&mut self, name: impl Into<String>, function: impl ExternFunction + 'static) {
        self.functions.insert(name.into(), Rc::new(function));
    }

    /// Builder form of [`Externs::register`]
    pub fn with(mut self, name: impl Into<String>, function: impl ExternFunction + 'static) -> Self {
        self.register(name, function);
        self
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn ExternFunction>> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Externs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Externs")
            .field("functions", &self.names())
            .finish()
    }
}
