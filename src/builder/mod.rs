//! Builder API for ergonomic machine construction.
//!
//! This module provides a fluent builder plus a one-call activation helper
//! for the common case of a default-configured, mounted machine.

pub mod machine;

pub use machine::AsyncMachineBuilder;

use crate::core::Update;
use crate::effects::{AsyncMachine, Mounted};

/// Create and mount a machine seeded with `initial`, returning it with the
/// teardown handle.
///
/// # Example
///
/// ```
/// use async_state::builder::activate;
/// use async_state::core::Update;
///
/// let (machine, view) = activate::<u8, String>(Update::new());
/// assert!(machine.is_idle());
/// assert!(machine.set_data(1));
///
/// drop(view);
/// assert!(!machine.set_data(2));
/// ```
pub fn activate<T: Clone, E: Clone>(initial: Update<T, E>) -> (AsyncMachine<T, E>, Mounted) {
    AsyncMachineBuilder::new().initial(initial).build_mounted()
}
