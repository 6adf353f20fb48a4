//! Concurrent keyed registries
//!
//! Used for both the device registry and the assignment registry. Readers
//! always get a point-in-time copy and never hold the lock past the copy.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

pub struct Registry<V> {
    entries: RwLock<HashMap<String, V>>,
}

impl<V: Clone> Registry<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Last write wins. Returns the replaced value, if any.
    pub fn upsert(&self, key: impl Into<String>, value: V) -> Option<V> {
        self.entries.write().insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.entries.read().get(key).cloned()
    }

    /// Snapshot of every entry, ordered by key
    pub fn list(&self) -> BTreeMap<String, V> {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn values(&self) -> Vec<V> {
        self.entries.read().values().cloned().collect()
    }

    /// Swap in a complete new content. Returns the previous content.
    pub fn replace_all(&self, entries: HashMap<String, V>) -> HashMap<String, V> {
        std::mem::replace(&mut *self.entries.write(), entries)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<V: Clone> Default for Registry<V> {
    fn default() -> Self {
        Self::new()
    }
}
