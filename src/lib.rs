pub mod dedup;
pub mod transaction;

pub use dedup::{SeenSet, SharedSeenSet};
pub use transaction::{run_in_transaction, run_in_transaction_with, GuardError};
