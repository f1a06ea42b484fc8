use std::collections::BTreeMap;

use super::{Name, Object};

/// Name-keyed record; the storage shape of every tree node.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Dictionary {
    entries: BTreeMap<Name, Object>,
}

impl Dictionary {
    /// Creates an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&Object> {
        self.entries.get(name)
    }

    /// Stores `value` under `name`, returning the previous value.
    pub fn insert(&mut self, name: &str, value: Object) -> Option<Object> {
        self.entries.insert(Name::from(name), value)
    }

    /// Whether an entry exists under `name`.
    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&Name, &Object)> {
        self.entries.iter()
    }
}
