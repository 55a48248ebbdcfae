//! Transaction state tracking.

use std::time::{Duration, Instant};

use super::id::TransactionId;
use super::options::TxOptions;

/// The possible states of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Begun and not yet resolved.
    Active,
    Committed,
    RolledBack,
}

impl TransactionState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }

    pub fn is_rolled_back(&self) -> bool {
        matches!(self, Self::RolledBack)
    }

    /// Returns true once the transaction has been committed or rolled back.
    pub fn is_finished(&self) -> bool {
        !self.is_active()
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Committed => write!(f, "Committed"),
            Self::RolledBack => write!(f, "RolledBack"),
        }
    }
}

/// Bookkeeping a resource keeps for each transaction it has begun.
#[derive(Debug, Clone)]
pub struct TransactionInfo {
    pub id: TransactionId,
    pub state: TransactionState,
    pub options: TxOptions,
    pub start_time: Instant,
    /// Set when the transaction leaves `Active`.
    pub end_time: Option<Instant>,
}

impl TransactionInfo {
    pub fn new(id: TransactionId, options: TxOptions) -> Self {
        Self {
            id,
            state: TransactionState::Active,
            options,
            start_time: Instant::now(),
            end_time: None,
        }
    }

    /// How long the transaction has been (or was) open.
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// Moves an active transaction into a terminal state.
    ///
    /// Returns `false` and leaves the info untouched if it was already
    /// finished, so a transaction can only ever be resolved once.
    pub fn finish(&mut self, outcome: TransactionState) -> bool {
        debug_assert!(outcome.is_finished());
        if !self.state.is_active() {
            return false;
        }
        self.state = outcome;
        self.end_time = Some(Instant::now());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_state_predicates() {
        let active = TransactionState::Active;
        let committed = TransactionState::Committed;
        let rolled_back = TransactionState::RolledBack;

        assert!(active.is_active());
        assert!(!active.is_finished());

        assert!(committed.is_committed());
        assert!(committed.is_finished());
        assert!(!committed.is_rolled_back());

        assert!(rolled_back.is_rolled_back());
        assert!(rolled_back.is_finished());
        assert!(!rolled_back.is_committed());
    }

    #[test]
    fn test_transaction_state_display() {
        assert_eq!(TransactionState::Active.to_string(), "Active");
        assert_eq!(TransactionState::RolledBack.to_string(), "RolledBack");
    }

    #[test]
    fn test_finish_only_once() {
        let mut info = TransactionInfo::new(TransactionId::new(1), TxOptions::default());
        assert!(info.end_time.is_none());

        assert!(info.finish(TransactionState::Committed));
        assert_eq!(info.state, TransactionState::Committed);
        assert!(info.end_time.is_some());

        assert!(!info.finish(TransactionState::RolledBack));
        assert_eq!(info.state, TransactionState::Committed);
    }

    #[test]
    fn test_duration_frozen_after_finish() {
        let mut info = TransactionInfo::new(TransactionId::new(2), TxOptions::read_only());
        std::thread::sleep(Duration::from_millis(5));
        assert!(info.duration() >= Duration::from_millis(5));

        info.finish(TransactionState::RolledBack);
        let frozen = info.duration();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(info.duration(), frozen);
    }
}
