//! The imperative shell around the pure core.
//!
//! This module owns everything with side effects: the shared, lock-protected
//! state of an activation, the mount guard that gates every dispatch, and the
//! driving of operations (plain futures, factories, or stillwater effects)
//! through the lifecycle.
//!
//! # Key Concepts
//!
//! - **AsyncMachine**: one activation; applies merge updates and notifies observers
//! - **MountToken**: explicit liveness flag checked before every dispatch
//! - **Operation**: an already-created future or a deferred factory

mod machine;
mod mount;
mod operation;

pub use machine::{AsyncMachine, Observer, SubscriptionId};
pub use mount::{MountPhase, MountToken, Mounted};
pub use operation::{Operation, OperationFactory};
