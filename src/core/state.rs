//! The {status, data, error} snapshot and its merge-based reducer.
//!
//! Updates are shallow merges: fields absent from an [`Update`] are
//! preserved, present fields are overwritten. Clearing a payload has to be
//! requested explicitly.

use super::error::AsyncError;
use super::status::Status;

/// Snapshot of one tracked operation.
///
/// `status` is the source of truth. `data` and `error` are advisory and are
/// not force-cleared on every transition: a run that starts after a
/// successful one leaves the previous `data` in place while `Pending`.
///
/// # Example
///
/// ```rust
/// use async_state::core::{AsyncState, Status, Update};
///
/// let state: AsyncState<u32, String> = AsyncState::default();
/// assert!(state.is_idle());
///
/// let state = state.merge(Update::new().status(Status::Resolved).data(42));
/// assert!(state.is_success());
/// assert_eq!(state.data, Some(42));
///
/// // Starting another cycle keeps the stale payload around.
/// let state = state.merge(Update::new().status(Status::Pending));
/// assert!(state.is_loading());
/// assert_eq!(state.data, Some(42));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct AsyncState<T, E> {
    pub status: Status,
    pub data: Option<T>,
    pub error: Option<AsyncError<E>>,
}

impl<T, E> Default for AsyncState<T, E> {
    fn default() -> Self {
        Self {
            status: Status::Idle,
            data: None,
            error: None,
        }
    }
}

impl<T, E> AsyncState<T, E> {
    /// Build the activation-time snapshot: the default state with the
    /// caller's partial initial state merged over it.
    pub fn seeded(initial: Update<T, E>) -> Self {
        Self::default().merge(initial)
    }

    /// Apply a partial update, returning the merged state (pure).
    pub fn merge(self, update: Update<T, E>) -> Self {
        Self {
            status: update.status.unwrap_or(self.status),
            data: match update.data {
                Some(data) => data,
                None => self.data,
            },
            error: match update.error {
                Some(error) => error,
                None => self.error,
            },
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == Status::Idle
    }

    /// True while an operation is in flight (`Pending`).
    pub fn is_loading(&self) -> bool {
        self.status == Status::Pending
    }

    pub fn is_error(&self) -> bool {
        self.status == Status::Rejected
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Resolved
    }
}

/// Partial state update, the only way state changes.
///
/// Each field is `None` when it should be preserved. For `data` and
/// `error`, `Some(None)` clears the payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Update<T, E> {
    pub status: Option<Status>,
    pub data: Option<Option<T>>,
    pub error: Option<Option<AsyncError<E>>>,
}

impl<T, E> Default for Update<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Update<T, E> {
    /// An empty update; merging it leaves the state unchanged.
    pub fn new() -> Self {
        Self {
            status: None,
            data: None,
            error: None,
        }
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn data(mut self, data: T) -> Self {
        self.data = Some(Some(data));
        self
    }

    pub fn clear_data(mut self) -> Self {
        self.data = Some(None);
        self
    }

    pub fn error(mut self, error: impl Into<AsyncError<E>>) -> Self {
        self.error = Some(Some(error.into()));
        self
    }

    pub fn clear_error(mut self) -> Self {
        self.error = Some(None);
        self
    }

    /// Check if merging this update would leave the state unchanged.
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.data.is_none() && self.error.is_none()
    }
}

/// A full snapshot converts into an update that overwrites every field.
impl<T, E> From<AsyncState<T, E>> for Update<T, E> {
    fn from(state: AsyncState<T, E>) -> Self {
        Self {
            status: Some(state.status),
            data: Some(state.data),
            error: Some(state.error),
        }
    }
}
