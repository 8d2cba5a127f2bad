//! Core async-state types and logic.
//!
//! This module contains the pure functional core:
//! - The lifecycle `Status`
//! - The `AsyncState` snapshot and its merge reducer over `Update`s
//! - The `AsyncError` stored on rejection
//! - Immutable status history
//!
//! Nothing here locks, spawns, or performs I/O.

mod error;
mod history;
mod state;
mod status;

pub use error::{AsyncError, GENERIC_FAILURE_MESSAGE};
pub use history::{StatusTransition, TransitionHistory};
pub use state::{AsyncState, Update};
pub use status::Status;
