//! Bounded memoization cache
//!
//! Entries are evicted in insertion order (FIFO), not by recency of access.
//! Keys for option records are built with [`canonical_key`], so two option
//! values that differ only in unset fields or field order share one entry.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::trace;

/// Default number of entries kept per cache
pub const DEFAULT_CAPACITY: usize = 50;

#[derive(Debug)]
struct CacheState<K, V> {
    entries: HashMap<K, V>,
    /// Keys in insertion order, oldest first
    order: VecDeque<K>,
}

/// A capacity-bounded key/value store with FIFO eviction
#[derive(Debug)]
pub struct MemoCache<K, V> {
    capacity: usize,
    state: Mutex<CacheState<K, V>>,
}

impl<K, V> MemoCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.state.lock().entries.get(key).cloned()
    }

    /// Insert `value`, evicting the oldest inserted entries when full
    ///
    /// Replacing an existing key keeps its original insertion position.
    pub fn insert(&self, key: K, value: V) {
        let mut state = self.state.lock();
        if state.entries.insert(key.clone(), value).is_some() {
            return;
        }
        state.order.push_back(key);
        while state.order.len() > self.capacity {
            if let Some(oldest) = state.order.pop_front() {
                state.entries.remove(&oldest);
                trace!(capacity = self.capacity, "Evicted oldest cache entry");
            }
        }
    }

    pub fn get_or_insert_with<F>(&self, key: K, build: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = build();
        self.insert_if_absent(key, value)
    }

    /// Like [`get_or_insert_with`](Self::get_or_insert_with) for fallible builders.
    /// Failed builds are not cached.
    pub fn get_or_try_insert_with<F, E>(&self, key: K, build: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = build()?;
        Ok(self.insert_if_absent(key, value))
    }

    // The builder runs without the lock held; another caller may have
    // inserted the same key meanwhile, in which case that entry wins.
    fn insert_if_absent(&self, key: K, value: V) -> V {
        if let Some(existing) = self.get(&key) {
            return existing;
        }
        self.insert(key, value.clone());
        value
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.order.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for MemoCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Build a deterministic key for an option record
///
/// Unset (`null`) entries are dropped and object keys are sorted, recursively.
/// A non-empty `prefix` namespaces the key.
pub fn canonical_key<T: Serialize + ?Sized>(value: &T, prefix: &str) -> String {
    let json = serde_json::to_value(value).unwrap_or(Value::Null);
    let mut key = String::new();
    if !prefix.is_empty() {
        key.push_str(prefix);
        key.push(':');
    }
    write_canonical(&json, &mut key);
    key
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, _)| k)
                .collect();
            keys.sort();
            out.push('{');
            for (i, k) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(k);
                out.push('=');
                if let Some(v) = map.get(*k) {
                    write_canonical(v, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        // Quoted so "1" and 1 stay distinct
        Value::String(s) => out.push_str(&format!("{s:?}")),
        other => out.push_str(&other.to_string()),
    }
}
