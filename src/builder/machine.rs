//! Builder for constructing async machines.

use crate::config::{MachineConfig, RacePolicy};
use crate::core::{AsyncError, AsyncState, Status, Update};
use crate::effects::{AsyncMachine, MountToken, Mounted, Observer};
use std::sync::Arc;

/// Builder for constructing async machines with a fluent API.
///
/// # Example
///
/// ```rust
/// use async_state::builder::AsyncMachineBuilder;
/// use async_state::config::RacePolicy;
/// use async_state::core::Status;
///
/// let (machine, _view) = AsyncMachineBuilder::<String, String>::new()
///     .data("cached".to_string())
///     .race_policy(RacePolicy::LatestRunWins)
///     .build_mounted();
///
/// assert_eq!(machine.status(), Status::Idle);
/// assert_eq!(machine.data().as_deref(), Some("cached"));
/// assert!(machine.is_mounted());
/// ```
pub struct AsyncMachineBuilder<T, E> {
    initial: Update<T, E>,
    config: MachineConfig,
    mount: Option<MountToken>,
    observers: Vec<Observer<T, E>>,
}

impl<T: Clone, E: Clone> AsyncMachineBuilder<T, E> {
    /// Create a new builder seeded with the idle default.
    pub fn new() -> Self {
        Self {
            initial: Update::new(),
            config: MachineConfig::default(),
            mount: None,
            observers: Vec::new(),
        }
    }

    /// Replace the partial initial state.
    pub fn initial(mut self, initial: Update<T, E>) -> Self {
        self.initial = initial;
        self
    }

    /// Seed the initial status.
    pub fn status(mut self, status: Status) -> Self {
        self.initial = self.initial.status(status);
        self
    }

    /// Seed the initial data.
    pub fn data(mut self, data: T) -> Self {
        self.initial = self.initial.data(data);
        self
    }

    /// Seed the initial error.
    pub fn error(mut self, error: impl Into<AsyncError<E>>) -> Self {
        self.initial = self.initial.error(error);
        self
    }

    pub fn config(mut self, config: MachineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn race_policy(mut self, race_policy: RacePolicy) -> Self {
        self.config.race_policy = race_policy;
        self
    }

    pub fn history_capacity(mut self, capacity: Option<usize>) -> Self {
        self.config.history_capacity = capacity;
        self
    }

    /// Use a mount token owned by the call site instead of a fresh one.
    pub fn mount_token(mut self, token: MountToken) -> Self {
        self.mount = Some(token);
        self
    }

    /// Register an observer before the machine exists.
    pub fn observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&AsyncState<T, E>) + Send + Sync + 'static,
    {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Build the machine. It stays unmounted until [`AsyncMachine::mount`]
    /// (or the supplied token) arms it.
    pub fn build(self) -> AsyncMachine<T, E> {
        AsyncMachine::with_parts(
            self.initial,
            self.config,
            self.mount.unwrap_or_default(),
            self.observers,
        )
    }

    /// Build and mount in one step, returning the teardown handle.
    ///
    /// If a supplied token was already mounted or torn down, the returned
    /// handle still owns teardown but mounting is not repeated.
    pub fn build_mounted(self) -> (AsyncMachine<T, E>, Mounted) {
        let machine = self.build();
        let token = machine.mount_token();
        token.mount();
        (machine, Mounted::new(token))
    }
}

impl<T: Clone, E: Clone> Default for AsyncMachineBuilder<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::MountPhase;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Builder = AsyncMachineBuilder<u32, String>;

    #[test]
    fn builder_defaults_to_idle_and_unmounted() {
        let machine = Builder::new().build();

        assert!(machine.is_idle());
        assert_eq!(machine.data(), None);
        assert_eq!(machine.mount_phase(), MountPhase::Unmounted);
        assert_eq!(machine.config(), &MachineConfig::default());
    }

    #[test]
    fn seeded_fields_form_the_initial_snapshot() {
        let machine = Builder::new()
            .status(Status::Resolved)
            .data(3)
            .error("old".to_string())
            .build();

        let initial = machine.initial_state();
        assert_eq!(initial.status, Status::Resolved);
        assert_eq!(initial.data, Some(3));
        assert_eq!(initial.error, Some(AsyncError::Operation("old".to_string())));
        assert_eq!(&machine.state(), initial);
    }

    #[test]
    fn fluent_config_overrides_defaults() {
        let machine = Builder::new()
            .race_policy(RacePolicy::LatestRunWins)
            .history_capacity(None)
            .build();

        assert_eq!(machine.config().race_policy, RacePolicy::LatestRunWins);
        assert_eq!(machine.config().history_capacity, None);
    }

    #[test]
    fn pre_registered_observers_are_notified() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let (machine, _view) = Builder::new()
            .observer(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build_mounted();
        machine.set_data(1);
        let later = machine.subscribe(|_| {});

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(machine.unsubscribe(later));
    }

    #[test]
    fn shared_token_controls_teardown() {
        let token = MountToken::new();
        let machine = Builder::new().mount_token(token.clone()).build();

        token.mount();
        assert!(machine.set_data(5));

        token.unmount();
        assert!(!machine.set_data(6));
        assert_eq!(machine.data(), Some(5));
    }

    #[test]
    fn build_mounted_handle_tears_down_on_drop() {
        let (machine, view) = Builder::new().build_mounted();
        assert!(machine.is_mounted());

        drop(view);
        assert_eq!(machine.mount_phase(), MountPhase::TornDown);
    }
}
