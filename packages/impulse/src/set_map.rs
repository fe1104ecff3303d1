use std::hash::Hash;

use rustc_hash::FxHashMap;

/// A map from keys to ordered sets of values.
///
/// Values keep the order they were added in. A key disappears with its last value.
#[derive(Debug, Clone)]
pub struct SetMap<K, V> {
    map: FxHashMap<K, Vec<V>>,
}

impl<K, V> Default for SetMap<K, V> {
    fn default() -> Self {
        Self {
            map: FxHashMap::default(),
        }
    }
}

impl<K: Eq + Hash + Clone, V: PartialEq + Clone> SetMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the value was already present.
    pub fn add(&mut self, key: K, value: V) -> bool {
        let values = self.map.entry(key).or_default();
        if values.contains(&value) {
            return false;
        }
        values.push(value);
        true
    }

    /// Returns `false` if the value was not present.
    pub fn delete(&mut self, key: &K, value: &V) -> bool {
        let Some(values) = self.map.get_mut(key) else {
            return false;
        };
        let before = values.len();
        values.retain(|other| other != value);
        let removed = values.len() != before;
        if values.is_empty() {
            self.map.remove(key);
        }
        removed
    }

    pub fn delete_key(&mut self, key: &K) -> Vec<V> {
        self.map.remove(key).unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn get(&self, key: &K) -> &[V] {
        self.map.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has(&self, key: &K, value: &V) -> bool {
        self.get(key).contains(value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.map.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.map.values().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
