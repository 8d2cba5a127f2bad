//! Status transition history.
//!
//! Provides immutable tracking of lifecycle changes over time. Only dispatches
//! that actually change the status are recorded.

use super::status::Status;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single status change.
///
/// # Example
///
/// ```rust
/// use async_state::core::{Status, StatusTransition};
/// use chrono::Utc;
///
/// let transition = StatusTransition {
///     from: Status::Idle,
///     to: Status::Pending,
///     timestamp: Utc::now(),
///     run: Some(1),
/// };
/// assert_eq!(transition.to, Status::Pending);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusTransition {
    /// The status being left
    pub from: Status,
    /// The status being entered
    pub to: Status,
    /// When the change was applied
    pub timestamp: DateTime<Utc>,
    /// Identity of the run that caused the change, if any
    pub run: Option<u64>,
}

/// Ordered history of status changes, optionally bounded.
///
/// History is immutable: `record` returns a new history with the transition
/// added. When a capacity is set the oldest transitions are dropped first.
///
/// # Example
///
/// ```rust
/// use async_state::core::{Status, StatusTransition, TransitionHistory};
/// use chrono::Utc;
///
/// let history = TransitionHistory::new();
/// let history = history.record(StatusTransition {
///     from: Status::Idle,
///     to: Status::Pending,
///     timestamp: Utc::now(),
///     run: Some(1),
/// });
/// let history = history.record(StatusTransition {
///     from: Status::Pending,
///     to: Status::Resolved,
///     timestamp: Utc::now(),
///     run: Some(1),
/// });
///
/// let path = history.get_path();
/// assert_eq!(path, vec![Status::Idle, Status::Pending, Status::Resolved]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionHistory {
    transitions: Vec<StatusTransition>,
    capacity: Option<usize>,
}

impl TransitionHistory {
    /// Create a new, unbounded history.
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
            capacity: None,
        }
    }

    /// Create a history that keeps at most `capacity` transitions.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            transitions: Vec::new(),
            capacity: Some(capacity),
        }
    }

    /// Record a transition, returning a new history.
    ///
    /// The receiver is left unchanged.
    pub fn record(&self, transition: StatusTransition) -> Self {
        let mut transitions = self.transitions.clone();
        transitions.push(transition);

        if let Some(capacity) = self.capacity {
            let excess = transitions.len().saturating_sub(capacity);
            transitions.drain(..excess);
        }

        Self {
            transitions,
            capacity: self.capacity,
        }
    }

    /// Get the path of statuses traversed: the first recorded `from`, then
    /// the `to` of each transition.
    pub fn get_path(&self) -> Vec<Status> {
        let mut path = Vec::with_capacity(self.transitions.len() + 1);
        if let Some(first) = self.transitions.first() {
            path.push(first.from);
        }
        path.extend(self.transitions.iter().map(|t| t.to));
        path
    }

    /// Duration from the first to the last recorded transition.
    ///
    /// Returns `None` when empty.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.transitions.first()?, self.transitions.last()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    pub fn transitions(&self) -> &[StatusTransition] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn transition(from: Status, to: Status) -> StatusTransition {
        StatusTransition {
            from,
            to,
            timestamp: Utc::now(),
            run: None,
        }
    }

    #[test]
    fn record_is_pure() {
        let history = TransitionHistory::new();
        let updated = history.record(transition(Status::Idle, Status::Pending));

        assert!(history.is_empty());
        assert_eq!(updated.len(), 1);
    }

    #[test]
    fn empty_history_has_no_path_or_duration() {
        let history = TransitionHistory::new();

        assert!(history.get_path().is_empty());
        assert!(history.duration().is_none());
    }

    #[test]
    fn capacity_drops_oldest_transitions() {
        let history = TransitionHistory::with_capacity(2)
            .record(transition(Status::Idle, Status::Pending))
            .record(transition(Status::Pending, Status::Rejected))
            .record(transition(Status::Rejected, Status::Pending));

        assert_eq!(history.len(), 2);
        assert_eq!(
            history.get_path(),
            vec![Status::Pending, Status::Rejected, Status::Pending]
        );
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let history =
            TransitionHistory::with_capacity(0).record(transition(Status::Idle, Status::Pending));

        assert!(history.is_empty());
        assert_eq!(history.capacity(), Some(0));
    }

    #[test]
    fn duration_spans_first_to_last() {
        let start = Utc::now();
        let mut first = transition(Status::Idle, Status::Pending);
        first.timestamp = start;
        let mut second = transition(Status::Pending, Status::Resolved);
        second.timestamp = start + ChronoDuration::milliseconds(250);

        let history = TransitionHistory::new().record(first).record(second);

        assert_eq!(history.duration(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn history_serializes_roundtrip() {
        let history = TransitionHistory::new().record(transition(Status::Idle, Status::Pending));

        let json = serde_json::to_string(&history).unwrap();
        let deserialized: TransitionHistory = serde_json::from_str(&json).unwrap();

        assert_eq!(history, deserialized);
    }
}
