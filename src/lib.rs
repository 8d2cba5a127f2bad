//! async-state: lifecycle tracking for one asynchronous operation
//!
//! An [`AsyncMachine`] models the lifecycle of a single operation
//! (idle, pending, resolved or rejected) and exposes status, data and error to
//! whatever view layer owns it. It follows the "pure core, imperative shell"
//! split: the snapshot and its merge reducer are pure values, while the
//! machine owns locking, observers and the mount guard.
//!
//! # Core Concepts
//!
//! - **Status**: the lifecycle position, the source of truth for a snapshot
//! - **Update**: a partial state; dispatching it is a shallow merge
//! - **Mount guard**: an explicit token; dispatches after teardown are dropped
//! - **Errors as data**: `run` hands failures back as values instead of raising
//!
//! # Example
//!
//! ```rust
//! use async_state::builder::activate;
//! use async_state::core::{AsyncError, Status, Update};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let (machine, view) = activate::<String, String>(Update::new());
//! assert!(machine.is_idle());
//!
//! let title = machine.run(async { Ok("Hello".to_string()) }).await;
//! assert_eq!(title.unwrap(), "Hello");
//! assert!(machine.is_success());
//!
//! let failed = machine
//!     .run(async { Err("offline".to_string()) })
//!     .await;
//! assert_eq!(failed, Err(AsyncError::Operation("offline".to_string())));
//! assert_eq!(machine.status(), Status::Rejected);
//!
//! // Stale data survives a rejection; gate rendering on the status.
//! assert_eq!(machine.data().as_deref(), Some("Hello"));
//!
//! machine.reset();
//! assert!(machine.is_idle());
//! drop(view);
//! # });
//! ```

pub mod builder;
pub mod config;
pub mod core;
pub mod effects;

// Re-export commonly used types
pub use builder::{activate, AsyncMachineBuilder};
pub use config::{MachineConfig, RacePolicy};
pub use core::{AsyncError, AsyncState, Status, Update};
pub use effects::{AsyncMachine, MountToken, Mounted, Operation};
