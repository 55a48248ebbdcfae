use std::borrow::Borrow;
use std::collections::hash_set::{self, HashSet};
use std::hash::Hash;

/// Tracks which keys have been seen.
///
/// Not internally synchronized; wrap it in a mutex or use
/// [`SharedSeenSet`](super::SharedSeenSet) to share it between threads.
#[derive(Debug, Clone)]
pub struct SeenSet<K> {
    keys: HashSet<K>,
}

impl<K: Eq + Hash> SeenSet<K> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            keys: HashSet::new(),
        }
    }

    /// Creates an empty set with room for at least `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: HashSet::with_capacity(capacity),
        }
    }

    /// Returns `true` if `key` was already seen. Otherwise records it and
    /// returns `false`. A hit leaves the set untouched.
    pub fn check_and_mark(&mut self, key: K) -> bool {
        !self.keys.insert(key)
    }

    /// Checks membership without marking. Accepts any borrowed form of the
    /// key, e.g. `&str` for a `SeenSet<String>`.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.keys.contains(key)
    }

    /// Returns the number of distinct keys seen so far.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if no key has been marked yet.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterates seen keys in arbitrary order.
    pub fn iter(&self) -> hash_set::Iter<'_, K> {
        self.keys.iter()
    }
}

impl<K: Eq + Hash> Default for SeenSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> FromIterator<K> for SeenSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

impl<'a, K> IntoIterator for &'a SeenSet<K> {
    type Item = &'a K;
    type IntoIter = hash_set::Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_check_and_mark_sequence() {
        let mut seen = SeenSet::new();

        assert!(!seen.check_and_mark("a"));
        assert!(!seen.check_and_mark("b"));
        assert!(seen.check_and_mark("a"));
        assert!(!seen.check_and_mark("c"));
    }

    #[test]
    fn test_hit_does_not_mutate() {
        let mut seen = SeenSet::new();
        seen.check_and_mark(1u32);

        assert!(seen.check_and_mark(1));
        assert!(seen.check_and_mark(1));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_borrowed_lookup() {
        let mut seen: SeenSet<String> = SeenSet::with_capacity(4);
        assert!(seen.is_empty());

        seen.check_and_mark("node-1".to_string());
        assert!(seen.contains("node-1"));
        assert!(!seen.contains("node-2"));
    }

    #[test]
    fn test_from_iterator_marks_keys() {
        let mut seen: SeenSet<_> = ["x", "y"].into_iter().collect();
        assert!(seen.check_and_mark("x"));
        assert!(!seen.check_and_mark("z"));

        let mut keys: Vec<_> = seen.iter().copied().collect();
        keys.sort();
        assert_eq!(keys, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_matches_first_occurrence_model() {
        let mut rng = rand::thread_rng();
        let keys: Vec<u8> = (0..1000).map(|_| rng.gen_range(0..64)).collect();

        let mut seen = SeenSet::new();
        for (i, key) in keys.iter().enumerate() {
            let expected = keys[..i].contains(key);
            assert_eq!(seen.check_and_mark(*key), expected, "key {} at {}", key, i);
        }
    }
}
