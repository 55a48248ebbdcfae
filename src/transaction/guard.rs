//! Transaction-scoped execution.
//!
//! `run_in_transaction` begins a transaction, hands the unit of work mutable
//! access to it, and resolves it exactly once: commit on `Ok`, rollback on
//! `Err` or panic. Panics from the unit of work are never caught; the
//! rollback runs from `Drop` while the stack unwinds and the original payload
//! keeps propagating. A panic raised by that rollback is contained and logged.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, warn};

use super::context::ExecContext;
use super::error::GuardError;
use super::options::TxOptions;
use super::resource::{Transaction, TransactionalResource};

/// Runs `work` in a transaction with a background context and default options.
pub fn run_in_transaction<R, T, E, F>(resource: &R, work: F) -> Result<T, GuardError<E, R::Error>>
where
    R: TransactionalResource,
    F: FnOnce(&mut R::Transaction) -> Result<T, E>,
{
    run_in_transaction_with(resource, &ExecContext::background(), &TxOptions::default(), work)
}

/// Runs `work` in a transaction begun with `ctx` and `options`.
///
/// A rollback failure while already returning the unit of work's error is
/// logged and dropped; the caller always sees the original error.
pub fn run_in_transaction_with<R, T, E, F>(
    resource: &R,
    ctx: &ExecContext,
    options: &TxOptions,
    work: F,
) -> Result<T, GuardError<E, R::Error>>
where
    R: TransactionalResource,
    F: FnOnce(&mut R::Transaction) -> Result<T, E>,
{
    let txn = resource.begin(ctx, options).map_err(GuardError::BeginFailed)?;
    let mut scope = TxScope::new(txn);

    match work(scope.handle()) {
        Ok(value) => {
            scope.commit().map_err(GuardError::CommitFailed)?;
            Ok(value)
        }
        Err(err) => {
            scope.rollback();
            Err(GuardError::UnitOfWorkFailed(err))
        }
    }
}

/// Owns the transaction for the length of one guarded call. Whatever is
/// still unresolved when the scope drops gets rolled back.
struct TxScope<T: Transaction> {
    txn: Option<T>,
}

impl<T: Transaction> TxScope<T> {
    fn new(txn: T) -> Self {
        Self { txn: Some(txn) }
    }

    fn handle(&mut self) -> &mut T {
        self.txn
            .as_mut()
            .unwrap_or_else(|| unreachable!("transaction resolved before the unit of work ran"))
    }

    fn commit(mut self) -> Result<(), T::Error> {
        match self.txn.take() {
            Some(txn) => {
                debug!("Committing guarded transaction");
                txn.commit()
            }
            None => Ok(()),
        }
    }

    fn rollback(mut self) {
        if let Some(txn) = self.txn.take() {
            debug!("Rolling back guarded transaction after unit of work error");
            if let Err(err) = txn.rollback() {
                warn!("Rollback failed while propagating unit of work error: {}", err);
            }
        }
    }
}

impl<T: Transaction> Drop for TxScope<T> {
    fn drop(&mut self) {
        let Some(txn) = self.txn.take() else {
            return;
        };

        // Only reachable by unwinding out of the unit of work. A second panic
        // escaping this destructor would abort the process and lose the
        // unit of work's payload.
        warn!("Unit of work panicked; rolling back transaction");
        match panic::catch_unwind(AssertUnwindSafe(|| txn.rollback())) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!("Rollback failed while unwinding: {}", err),
            Err(payload) => warn!(
                "Rollback panicked while unwinding: {}",
                panic_message(&*payload)
            ),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string payload"
    }
}
