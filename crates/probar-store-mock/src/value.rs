//! State and getter containers.
//!
//! State is a `serde_json::Value` tree behind a shared handle so that the
//! store, subscriber handlers and module contexts all observe the same
//! working copy. Getters are opaque leaf values: copying a [`Getters`] map
//! copies its entries but shares the values.

use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Shared handle to a state tree
///
/// Cloning the handle shares the tree. A store installs a fresh handle on
/// every reset, so a handle taken before a reset keeps the stale tree.
#[derive(Debug, Clone)]
pub struct SharedState(Rc<RefCell<Value>>);

impl Default for SharedState {
    fn default() -> Self {
        Self::new(Value::Object(Map::new()))
    }
}

impl SharedState {
    /// Wrap a state tree
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// Deep copy of the current tree
    #[must_use]
    pub fn snapshot(&self) -> Value {
        self.0.borrow().clone()
    }

    /// Read the tree without copying it
    pub fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.0.borrow())
    }

    /// Mutate the tree in place
    ///
    /// # Panics
    ///
    /// Panics if called re-entrantly from inside another `with`/`update`
    /// closure on the same handle.
    pub fn update<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }

    /// Top-level value by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    /// Value at a JSON pointer (`/module/nested/count`)
    #[must_use]
    pub fn pointer(&self, pointer: &str) -> Option<Value> {
        self.0.borrow().pointer(pointer).cloned()
    }

    /// Set a top-level key, returning the previous value
    ///
    /// A root that is not a mapping is replaced by an empty one first.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Option<Value> {
        let mut root = self.0.borrow_mut();
        if !root.is_object() {
            *root = Value::Object(Map::new());
        }
        root.as_object_mut()
            .and_then(|map| map.insert(key.to_string(), value.into()))
    }

    /// Overwrite the value at a JSON pointer
    ///
    /// Returns `false` when nothing exists at that pointer.
    pub fn set_pointer(&self, pointer: &str, value: impl Into<Value>) -> bool {
        match self.0.borrow_mut().pointer_mut(pointer) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    /// Whether two handles share the same tree
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Pretty-printed JSON rendering of the tree
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&*self.0.borrow())
    }
}

impl PartialEq for SharedState {
    fn eq(&self, other: &Self) -> bool {
        *self.0.borrow() == *other.0.borrow()
    }
}

impl PartialEq<Value> for SharedState {
    fn eq(&self, other: &Value) -> bool {
        *self.0.borrow() == *other
    }
}

/// Flat mapping of getter names to precomputed values
///
/// Namespacing lives in the key (`"cart/total"`), never in nesting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Getters {
    entries: BTreeMap<String, Rc<Value>>,
}

impl Getters {
    /// Create an empty getter map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Getter value by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).map(|value| &**value)
    }

    /// Insert or replace a getter, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Rc<Value>> {
        self.entries.insert(key.into(), Rc::new(value.into()))
    }

    /// Remove a getter
    pub fn remove(&mut self, key: &str) -> Option<Rc<Value>> {
        self.entries.remove(key)
    }

    /// Whether a getter is defined
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of getters
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Getter names in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), &**v))
    }

    /// Whether `self` and `other` hold the very same value for `key`
    ///
    /// True for a copy and its original until either side replaces the entry.
    #[must_use]
    pub fn shares_value(&self, other: &Self, key: &str) -> bool {
        match (self.entries.get(key), other.entries.get(key)) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Render as a JSON mapping
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), (**v).clone()))
                .collect(),
        )
    }
}

impl From<Map<String, Value>> for Getters {
    fn from(map: Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Getters {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), Rc::new(v)))
                .collect(),
        }
    }
}

/// Truthiness used for module lookups
///
/// `null`, `false`, zero and the empty string are falsy; every mapping and
/// sequence is truthy, even when empty.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Child of a mapping by key, or of a sequence by numeric index
pub(crate) fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

pub(crate) fn child_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(move |i| items.get_mut(i)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    mod shared_state_tests {
        use super::*;

        #[test]
        fn test_clones_share_tree() {
            let a = SharedState::new(json!({"n": 0}));
            let b = a.clone();
            b.set("n", 3);
            assert_eq!(a.get("n"), Some(json!(3)));
            assert!(a.ptr_eq(&b));
        }

        #[test]
        fn test_snapshot_is_independent() {
            let state = SharedState::new(json!({"nested": {"n": 0}}));
            let mut snap = state.snapshot();
            snap["nested"]["n"] = json!(9);
            assert_eq!(state.pointer("/nested/n"), Some(json!(0)));
        }

        #[test]
        fn test_set_replaces_non_object_root() {
            let state = SharedState::new(json!(42));
            assert_eq!(state.set("a", true), None);
            assert_eq!(state, json!({"a": true}));
        }

        #[test]
        fn test_set_pointer() {
            let state = SharedState::new(json!({"m": {"count": 1}}));
            assert!(state.set_pointer("/m/count", 2));
            assert!(!state.set_pointer("/m/missing/deeper", 2));
            assert_eq!(state.pointer("/m/count"), Some(json!(2)));
        }

        #[test]
        fn test_update_and_with() {
            let state = SharedState::default();
            state.update(|v| v["list"] = json!([1, 2]));
            let len = state.with(|v| v["list"].as_array().map_or(0, Vec::len));
            assert_eq!(len, 2);
        }
    }

    mod getters_tests {
        use super::*;

        #[test]
        fn test_copy_shares_leaf_values() {
            let original: Getters = [("items", json!([1, 2, 3]))].into_iter().collect();
            let copy = original.clone();
            assert_eq!(copy, original);
            assert!(copy.shares_value(&original, "items"));
        }

        #[test]
        fn test_insert_on_copy_leaves_original() {
            let original: Getters = [("n", json!(0))].into_iter().collect();
            let mut copy = original.clone();
            copy.insert("n", 3);
            assert_eq!(original.get("n"), Some(&json!(0)));
            assert!(!copy.shares_value(&original, "n"));
        }

        #[test]
        fn test_namespaced_keys_stay_flat() {
            let mut getters = Getters::new();
            getters.insert("cart/total", 10);
            assert_eq!(getters.to_value(), json!({"cart/total": 10}));
            assert_eq!(getters.keys().collect::<Vec<_>>(), vec!["cart/total"]);
        }
    }

    mod truthiness_tests {
        use super::*;

        #[test]
        fn test_falsy_values() {
            for value in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
                assert!(!is_truthy(&value), "{value} should be falsy");
            }
        }

        #[test]
        fn test_truthy_values() {
            for value in [json!({}), json!([]), json!(1), json!("x"), json!(true)] {
                assert!(is_truthy(&value), "{value} should be truthy");
            }
        }

        #[test]
        fn test_child_indexes_arrays() {
            let value = json!({"rows": [{"id": 7}]});
            let rows = child(&value, "rows").unwrap();
            assert_eq!(child(rows, "0"), Some(&json!({"id": 7})));
            assert_eq!(child(rows, "x"), None);
            assert_eq!(child(&json!(3), "a"), None);
        }
    }
}
