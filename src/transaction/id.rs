//! Transaction identifiers handed out by a resource on `begin`.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one transaction within the resource that began it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Wraps a raw id. Resources normally obtain ids from a
    /// [`TransactionIdGenerator`] instead.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw numeric id.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Txn{}", self.0)
    }
}

/// Thread-safe monotonic id source. The first id issued is `Txn1`.
#[derive(Debug)]
pub struct TransactionIdGenerator {
    next_id: AtomicU64,
}

impl TransactionIdGenerator {
    /// Creates a generator whose first issued id is `Txn1`.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    /// Issues the next id. Safe to call from many threads; no id is issued
    /// twice.
    pub fn next(&self) -> TransactionId {
        TransactionId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Returns the most recently issued id, or `Txn0` if none has been issued.
    pub fn last_issued(&self) -> TransactionId {
        TransactionId::new(self.next_id.load(Ordering::SeqCst).saturating_sub(1))
    }
}

impl Default for TransactionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_transaction_id_display() {
        assert_eq!(TransactionId::new(7).to_string(), "Txn7");
    }

    #[test]
    fn test_generator_starts_at_one() {
        let generator = TransactionIdGenerator::new();
        assert_eq!(generator.last_issued().value(), 0);

        assert_eq!(generator.next().value(), 1);
        assert_eq!(generator.next().value(), 2);
        assert_eq!(generator.last_issued().value(), 2);
    }

    #[test]
    fn test_generator_unique_across_threads() {
        let generator = Arc::new(TransactionIdGenerator::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gen = Arc::clone(&generator);
                thread::spawn(move || (0..50).map(|_| gen.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {}", id);
            }
        }
        assert_eq!(seen.len(), 400);
    }
}
