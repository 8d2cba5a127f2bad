//! Lifecycle status of a tracked asynchronous operation.
//!
//! All methods are pure. `Status` is the source of truth for a state
//! snapshot; the data and error payloads should be read conditionally on it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle position of the tracked operation.
///
/// Exactly one variant holds at any time. `Idle` is the default
/// activation status; `Resolved` and `Rejected` are settled until the next
/// run moves the machine back to `Pending`.
///
/// # Example
///
/// ```rust
/// use async_state::core::Status;
///
/// let status = Status::default();
/// assert_eq!(status, Status::Idle);
/// assert!(!status.is_settled());
///
/// assert!(Status::Rejected.is_settled());
/// assert!(Status::Rejected.is_error());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Idle,
    Pending,
    Resolved,
    Rejected,
}

impl Status {
    /// Get the status name for display/logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Rejected => "rejected",
        }
    }

    /// Check if the operation has settled (resolved or rejected).
    ///
    /// Settled statuses are terminal for the current cycle; only a new run
    /// or a reset moves the machine out of them.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Resolved | Self::Rejected)
    }

    /// Check if this is the failure status.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Rejected)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
