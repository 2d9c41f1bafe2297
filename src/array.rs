//! Sparse ordered arrays
//!
//! Every M variable is an [`MArray`] node: a scalar value plus an optional,
//! sorted list of subscripted children. A plain scalar becomes an array in
//! place the first time a subscript is stored under it, and keeps its value.

use serde::Serialize;

use crate::interpreter::value::MValue;

/// A node of a sparse array
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MArray {
    pub value: MValue,
    /// Sorted ascending by key; `None` until the first child is stored
    children: Option<Vec<(String, MArray)>>,
}

impl MArray {
    pub fn new(value: MValue) -> Self {
        Self {
            value,
            children: None,
        }
    }

    pub fn has_children(&self) -> bool {
        self.children.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// A node with neither a value nor children reads the same as a missing one
    pub fn is_undefined(&self) -> bool {
        self.value.is_empty() && !self.has_children()
    }

    fn entries(&self) -> &[(String, MArray)] {
        self.children.as_deref().unwrap_or(&[])
    }

    fn position(&self, key: &str) -> Result<usize, usize> {
        self.entries()
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
    }

    pub fn child(&self, key: &str) -> Option<&MArray> {
        let index = self.position(key).ok()?;
        Some(&self.entries()[index].1)
    }

    /// The value stored under `key`, or the empty string
    pub fn get(&self, key: &str) -> MValue {
        self.child(key)
            .map(|child| child.value.clone())
            .unwrap_or_default()
    }

    /// Store `value` under `key`, keeping any children the node already has
    pub fn set(&mut self, key: &str, value: MValue) {
        self.entry(key).value = value;
    }

    /// Remove `key` and everything below it
    pub fn kill(&mut self, key: &str) {
        let Ok(index) = self.position(key) else {
            return;
        };
        if let Some(children) = self.children.as_mut() {
            children.remove(index);
            if children.is_empty() {
                self.children = None;
            }
        }
    }

    /// The child under `key`, created empty if missing
    pub fn entry(&mut self, key: &str) -> &mut MArray {
        let index = match self.position(key) {
            Ok(index) => index,
            Err(index) => {
                self.children
                    .get_or_insert_with(Vec::new)
                    .insert(index, (key.to_string(), MArray::default()));
                index
            }
        };
        // position() found or inserted the child, so children is populated
        let children = self.children.get_or_insert_with(Vec::new);
        &mut children[index].1
    }

    /// The smallest key strictly greater than `key`, or `""` past the end.
    /// `""` asks for the first key.
    pub fn get_next_key(&self, key: &str) -> String {
        let entries = self.entries();
        let index = if key.is_empty() {
            0
        } else {
            entries.partition_point(|(k, _)| k.as_str() <= key)
        };
        entries
            .get(index)
            .map(|(k, _)| k.clone())
            .unwrap_or_default()
    }

    /// The largest key strictly smaller than `key`, or `""` before the start.
    /// `""` asks for the last key.
    pub fn get_previous_key(&self, key: &str) -> String {
        let entries = self.entries();
        let index = if key.is_empty() {
            entries.len()
        } else {
            entries.partition_point(|(k, _)| k.as_str() < key)
        };
        index
            .checked_sub(1)
            .and_then(|i| entries.get(i))
            .map(|(k, _)| k.clone())
            .unwrap_or_default()
    }

    /// Follow a subscript path; `None` as soon as a level is missing
    pub fn lookup(&self, path: &[String]) -> Option<&MArray> {
        path.iter().try_fold(self, |node, key| node.child(key))
    }

    /// Follow a subscript path, creating every missing level
    pub fn entry_path(&mut self, path: &[String]) -> &mut MArray {
        path.iter().fold(self, |node, key| node.entry(key))
    }

    /// Remove the node at a non-empty subscript path
    pub fn kill_path(&mut self, path: &[String]) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };
        let mut node = self;
        for key in parents {
            let Ok(index) = node.position(key) else {
                return;
            };
            let Some(children) = node.children.as_mut() else {
                return;
            };
            node = &mut children[index].1;
        }
        node.kill(last);
    }

    /// Copy `source` into this node: its value (when it has one) and,
    /// recursively, every child
    pub fn merge_from(&mut self, source: &MArray) {
        if !source.value.is_empty() {
            self.value = source.value.clone();
        }
        for (key, child) in source.entries() {
            self.entry(key).merge_from(child);
        }
    }

    /// Child keys in ascending order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries().iter().map(|(k, _)| k.as_str())
    }

    /// Direct children in ascending key order
    pub fn children(&self) -> impl Iterator<Item = (&str, &MArray)> {
        self.entries().iter().map(|(k, c)| (k.as_str(), c))
    }
}

impl From<MValue> for MArray {
    fn from(value: MValue) -> Self {
        MArray::new(value)
    }
}

#[cfg(test)]
#[path = "array_tests.rs"]
mod tests;
