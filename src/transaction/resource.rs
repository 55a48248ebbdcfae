//! The resource boundary the guard runs against.
//!
//! A relational connection pool, an embedded store, or a test double can all
//! sit behind these two traits. Nothing here knows about queries or schemas.

use super::context::ExecContext;
use super::options::TxOptions;

/// Something that can start transactions.
pub trait TransactionalResource {
    type Error: std::error::Error + 'static;
    type Transaction: Transaction<Error = Self::Error>;

    /// Starts a transaction. Implementations should honor `ctx` here and in
    /// whatever operations the returned handle exposes.
    fn begin(&self, ctx: &ExecContext, options: &TxOptions) -> Result<Self::Transaction, Self::Error>;
}

/// An open transaction. Both terminal operations consume the handle.
///
/// A failed `commit` must leave nothing open on the resource side; callers
/// do not follow it with a rollback.
pub trait Transaction {
    type Error: std::error::Error + 'static;

    fn commit(self) -> Result<(), Self::Error>;

    fn rollback(self) -> Result<(), Self::Error>;
}
