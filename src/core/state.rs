use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::core::Value;

/// The named results threaded through one pipeline invocation.
///
/// Entries keep their insertion order. Combinators only ever add or replace
/// entries; nothing is removed while a pipeline runs. Each concurrent branch
/// receives its own read-only view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateBag {
    entries: Map<String, Value>,
}

impl StateBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for seeding the initial request.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts or replaces the value stored under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Copies every entry of `other` on top of this bag, replacing same-named ones.
    pub fn overlay(&mut self, other: StateBag) {
        for (key, value) in other.entries {
            self.entries.insert(key, value);
        }
    }

    /// Returns a bag holding only the entries named in `names`, in the order
    /// the names are given. Names with no entry are skipped.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> StateBag {
        let mut selected = StateBag::new();
        for name in names {
            if let Some(value) = self.entries.get(name.as_ref()) {
                selected.insert(name.as_ref(), value.clone());
            }
        }
        selected
    }

    /// A stable hash over the sorted key/value pairs of the bag.
    ///
    /// Insertion order does not matter, and nested objects are hashed with
    /// their keys sorted as well.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.sort();
        for key in keys {
            key.hash(&mut hasher);
            if let Some(value) = self.entries.get(key) {
                hash_value(value, &mut hasher);
            }
        }
        hasher.finish()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.entries)
    }
}

impl From<Map<String, Value>> for StateBag {
    fn from(entries: Map<String, Value>) -> Self {
        StateBag { entries }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for StateBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = StateBag::new();
        for (key, value) in iter {
            bag.insert(key, value);
        }
        bag
    }
}

fn hash_value<H: Hasher>(value: &Value, hasher: &mut H) {
    // Tag each variant so that e.g. "1" and 1 never collide.
    match value {
        Value::Null => 0u8.hash(hasher),
        Value::Bool(b) => {
            1u8.hash(hasher);
            b.hash(hasher);
        }
        Value::Number(n) => {
            2u8.hash(hasher);
            n.to_string().hash(hasher);
        }
        Value::String(s) => {
            3u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Array(items) => {
            4u8.hash(hasher);
            items.len().hash(hasher);
            for item in items {
                hash_value(item, hasher);
            }
        }
        Value::Object(map) => {
            5u8.hash(hasher);
            map.len().hash(hasher);
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                key.hash(hasher);
                if let Some(inner) = map.get(key) {
                    hash_value(inner, hasher);
                }
            }
        }
    }
}
