use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashSet;

/// A seen set that can be shared between threads.
///
/// Clones are handles to the same set. `check_and_mark` is atomic per key:
/// however many threads race on a new key, exactly one of them gets `false`.
#[derive(Debug)]
pub struct SharedSeenSet<K: Eq + Hash> {
    keys: Arc<DashSet<K>>,
}

impl<K: Eq + Hash> SharedSeenSet<K> {
    /// Creates an empty set. Clone the returned handle to share it.
    pub fn new() -> Self {
        Self {
            keys: Arc::new(DashSet::new()),
        }
    }

    /// Returns `true` if `key` was already seen. Otherwise records it and
    /// returns `false`.
    pub fn check_and_mark(&self, key: K) -> bool {
        !self.keys.insert(key)
    }

    /// Checks membership without marking. Another thread may mark the key
    /// right after this returns `false`; use `check_and_mark` to claim it.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.keys.contains(key)
    }

    /// Returns the number of distinct keys seen across all handles.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if no key has been marked yet.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<K: Eq + Hash> Clone for SharedSeenSet<K> {
    fn clone(&self) -> Self {
        Self {
            keys: Arc::clone(&self.keys),
        }
    }
}

impl<K: Eq + Hash> Default for SharedSeenSet<K> {
    fn default() -> Self {
        Self::new()
    }
}
