//! Transaction management module.
//!
//! This module provides transaction-scoped execution, including:
//! - The resource boundary (begin, commit, rollback)
//! - A guard that resolves every transaction exactly once
//! - Execution contexts with cancellation and deadlines
//! - An in-memory reference store implementing the resource boundary

pub mod context;
pub mod error;
pub mod guard;
pub mod id;
pub mod memory;
pub mod options;
pub mod resource;
pub mod state;

// Re-export commonly used types
pub use context::{CancelHandle, ContextError, ExecContext};
pub use error::GuardError;
pub use guard::{run_in_transaction, run_in_transaction_with};
pub use id::{TransactionId, TransactionIdGenerator};
pub use memory::{MemoryError, MemoryStore, MemoryStoreConfig, MemoryTransaction, TxEvent};
pub use options::{IsolationLevel, TxOptions};
pub use resource::{Transaction, TransactionalResource};
pub use state::{TransactionInfo, TransactionState};
