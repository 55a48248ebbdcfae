//! Errors returned by the transaction guard.

use thiserror::Error;

/// Why a guarded call failed.
///
/// `E` is the unit of work's error type, `R` the resource's.
#[derive(Error, Debug)]
pub enum GuardError<E, R> {
    /// The resource could not start a transaction; the unit of work never ran.
    #[error("Failed to begin transaction: {0}")]
    BeginFailed(#[source] R),

    /// The unit of work failed and the transaction was rolled back. Display
    /// and source are those of the original error.
    #[error(transparent)]
    UnitOfWorkFailed(E),

    /// The unit of work succeeded but the resource rejected the commit.
    #[error("Failed to commit transaction: {0}")]
    CommitFailed(#[source] R),
}

impl<E, R> GuardError<E, R> {
    pub fn is_begin_failed(&self) -> bool {
        matches!(self, Self::BeginFailed(_))
    }

    pub fn is_unit_of_work_failed(&self) -> bool {
        matches!(self, Self::UnitOfWorkFailed(_))
    }

    pub fn is_commit_failed(&self) -> bool {
        matches!(self, Self::CommitFailed(_))
    }

    pub fn unit_of_work_error(&self) -> Option<&E> {
        match self {
            Self::UnitOfWorkFailed(err) => Some(err),
            _ => None,
        }
    }

    pub fn into_unit_of_work_error(self) -> Option<E> {
        match self {
            Self::UnitOfWorkFailed(err) => Some(err),
            _ => None,
        }
    }

    /// The resource error behind a begin or commit failure.
    pub fn resource_error(&self) -> Option<&R> {
        match self {
            Self::BeginFailed(err) | Self::CommitFailed(err) => Some(err),
            Self::UnitOfWorkFailed(_) => None,
        }
    }
}
