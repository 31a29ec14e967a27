//! Key/value storage with selectable ordering.

use crate::value::Value;

/// How an object maintains its keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderPolicy {
    /// Keys kept sorted by byte content; lookup is a binary search.
    #[default]
    Sorted,
    /// Keys keep first-insertion order; lookup is linear.
    Preserve,
}

/// An object: a sequence of (key, value) entries with unique keys.
///
/// Duplicate insertions overwrite the existing slot; under
/// [`OrderPolicy::Preserve`] the slot keeps its original position.
/// Subtrees with different policies can be mixed freely; equality is
/// unordered either way.
#[derive(Debug, Clone, Default)]
pub struct Object {
    policy: OrderPolicy,
    entries: Vec<(String, Value)>,
}

impl Object {
    /// An empty object with the given policy.
    pub const fn new(policy: OrderPolicy) -> Self {
        Object {
            policy,
            entries: Vec::new(),
        }
    }

    /// An empty object with the given policy and reserved capacity.
    pub fn with_capacity(policy: OrderPolicy, capacity: usize) -> Self {
        Object {
            policy,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// The ordering policy fixed at construction.
    pub const fn policy(&self) -> OrderPolicy {
        self.policy
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the object has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, key: &str) -> core::result::Result<usize, usize> {
        match self.policy {
            OrderPolicy::Sorted => self
                .entries
                .binary_search_by(|(k, _)| k.as_str().cmp(key)),
            OrderPolicy::Preserve => self
                .entries
                .iter()
                .position(|(k, _)| k == key)
                .ok_or(self.entries.len()),
        }
    }

    /// Look up a value. `None` means the key is absent, which is
    /// distinct from a present-but-null value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.find(key).ok().map(|i| &self.entries[i].1)
    }

    /// Mutable lookup.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        match self.find(key) {
            Ok(i) => Some(&mut self.entries[i].1),
            Err(_) => None,
        }
    }

    /// Whether the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.find(key).is_ok()
    }

    /// Insert or overwrite; returns the previous value when the key
    /// already existed.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        match self.find(&key) {
            Ok(i) => Some(core::mem::replace(&mut self.entries[i].1, value)),
            Err(i) => {
                match self.policy {
                    OrderPolicy::Sorted => self.entries.insert(i, (key, value)),
                    OrderPolicy::Preserve => self.entries.push((key, value)),
                }
                None
            }
        }
    }

    /// Remove an entry, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        match self.find(key) {
            Ok(i) => Some(self.entries.remove(i).1),
            Err(_) => None,
        }
    }

    /// Entries in policy order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entries in policy order, values mutable.
    pub fn entries_mut(&mut self) -> impl Iterator<Item = (&str, &mut Value)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }
}

impl PartialEq for Object {
    /// Unordered comparison of (key, value) pairs; the policy does
    /// not participate.
    fn eq(&self, other: &Object) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl FromIterator<(String, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut object = Object::new(OrderPolicy::default());
        for (key, value) in iter {
            object.insert(key, value);
        }
        object
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_policy_orders_keys() {
        let mut object = Object::new(OrderPolicy::Sorted);
        object.insert("b", Value::from(2u64));
        object.insert("a", Value::from(1u64));
        let keys: Vec<&str> = object.entries().map(|(k, _)| k).collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn preserve_policy_keeps_insertion_order_on_overwrite() {
        let mut object = Object::new(OrderPolicy::Preserve);
        object.insert("b", Value::from(2u64));
        object.insert("a", Value::from(1u64));
        let old = object.insert("b", Value::from(9u64));
        assert_eq!(old, Some(Value::from(2u64)));
        let keys: Vec<&str> = object.entries().map(|(k, _)| k).collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(object.get("b"), Some(&Value::from(9u64)));
    }

    #[test]
    fn equality_is_unordered_across_policies() {
        let mut sorted = Object::new(OrderPolicy::Sorted);
        sorted.insert("x", Value::from(true));
        sorted.insert("y", Value::null());
        let mut preserve = Object::new(OrderPolicy::Preserve);
        preserve.insert("y", Value::null());
        preserve.insert("x", Value::from(true));
        assert_eq!(sorted, preserve);
    }
}
