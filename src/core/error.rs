//! Error values stored by a rejected operation.

use thiserror::Error;

/// Message carried by [`AsyncError::Failed`].
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to perform asynchronous operation.";

/// Failure recorded when an operation rejects.
///
/// When the status is `Rejected` the stored error is always one of these
/// variants, so consumers never have to handle a raw panic payload.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum AsyncError<E> {
    /// The operation returned an error value; stored verbatim.
    #[error(transparent)]
    Operation(E),

    /// The operation failed without producing an error value (it panicked).
    #[error("Failed to perform asynchronous operation.")]
    Failed,
}

impl<E> AsyncError<E> {
    /// Borrow the operation's own error, if this is a typed failure.
    pub fn operation(&self) -> Option<&E> {
        match self {
            Self::Operation(err) => Some(err),
            Self::Failed => None,
        }
    }

    /// Consume into the operation's own error, if this is a typed failure.
    pub fn into_operation(self) -> Option<E> {
        match self {
            Self::Operation(err) => Some(err),
            Self::Failed => None,
        }
    }

    /// Check if this is the generic, untyped failure.
    pub fn is_generic(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl<E> From<E> for AsyncError<E> {
    fn from(err: E) -> Self {
        Self::Operation(err)
    }
}
