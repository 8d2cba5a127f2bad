//! The async state machine: one activation tracking one operation.

use crate::config::{MachineConfig, RacePolicy};
use crate::core::{AsyncError, AsyncState, Status, StatusTransition, TransitionHistory, Update};
use crate::effects::mount::{MountPhase, MountToken, Mounted};
use crate::effects::operation::Operation;
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::collections::VecDeque;
use std::future::Future;
use std::mem;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use stillwater::effect::Effect;
use tracing::{debug, trace, warn};

/// Callback invoked with the new state after every applied dispatch.
pub type Observer<T, E> = Arc<dyn Fn(&AsyncState<T, E>) + Send + Sync>;

/// Handle returned by [`AsyncMachine::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Core<T, E> {
    state: AsyncState<T, E>,
    history: TransitionHistory,
    latest_run: u64,
    // Applied snapshots awaiting delivery, in apply order.
    outbox: VecDeque<AsyncState<T, E>>,
    delivering: bool,
}

struct Shared<T, E> {
    initial: AsyncState<T, E>,
    config: MachineConfig,
    mount: MountToken,
    core: Mutex<Core<T, E>>,
    observers: Mutex<Vec<(SubscriptionId, Observer<T, E>)>>,
    next_subscription: AtomicU64,
}

/// Lifecycle tracker for a single asynchronous operation.
///
/// Cloning yields another handle to the same activation, so a handle can be
/// moved into a spawned task while the view keeps its own. All mutations go
/// through [`dispatch`](Self::dispatch), which is dropped unless the mount
/// token is armed.
///
/// # Example
///
/// ```rust
/// use async_state::core::{Status, Update};
/// use async_state::effects::AsyncMachine;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let machine: AsyncMachine<u32, String> = AsyncMachine::new(Update::new());
/// let view = machine.mount().unwrap();
///
/// let result = machine.run(async { Ok(7) }).await;
/// assert_eq!(result, Ok(7));
/// assert_eq!(machine.status(), Status::Resolved);
///
/// drop(view);
/// machine.set_data(8);
/// assert_eq!(machine.data(), Some(7));
/// # });
/// ```
pub struct AsyncMachine<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Clone for AsyncMachine<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone, E: Clone> AsyncMachine<T, E> {
    /// Create an unmounted machine whose snapshot is `initial` merged over
    /// the idle default. The initial state is captured once.
    pub fn new(initial: Update<T, E>) -> Self {
        Self::with_config(initial, MachineConfig::default())
    }

    pub fn with_config(initial: Update<T, E>, config: MachineConfig) -> Self {
        Self::with_parts(initial, config, MountToken::new(), Vec::new())
    }

    pub(crate) fn with_parts(
        initial: Update<T, E>,
        config: MachineConfig,
        mount: MountToken,
        observers: Vec<Observer<T, E>>,
    ) -> Self {
        let initial = AsyncState::seeded(initial);
        let history = match config.history_capacity {
            Some(capacity) => TransitionHistory::with_capacity(capacity),
            None => TransitionHistory::new(),
        };
        let observers: Vec<_> = observers
            .into_iter()
            .enumerate()
            .map(|(i, observer)| (SubscriptionId(i as u64), observer))
            .collect();

        Self {
            shared: Arc::new(Shared {
                core: Mutex::new(Core {
                    state: initial.clone(),
                    history,
                    latest_run: 0,
                    outbox: VecDeque::new(),
                    delivering: false,
                }),
                next_subscription: AtomicU64::new(observers.len() as u64),
                observers: Mutex::new(observers),
                initial,
                config,
                mount,
            }),
        }
    }

    /// Arm the mount guard. Returns `None` if the machine was already
    /// mounted or has been torn down.
    pub fn mount(&self) -> Option<Mounted> {
        self.shared
            .mount
            .mount()
            .then(|| Mounted::new(self.shared.mount.clone()))
    }

    /// Tear the activation down. Later dispatches, including those from
    /// operations still in flight, are dropped. Dispatches already in
    /// progress on other threads finish before this returns.
    pub fn unmount(&self) -> bool {
        self.shared.mount.unmount()
    }

    pub fn is_mounted(&self) -> bool {
        self.shared.mount.is_mounted()
    }

    pub fn mount_phase(&self) -> MountPhase {
        self.shared.mount.phase()
    }

    /// A handle to the mount token, for call sites that own teardown.
    pub fn mount_token(&self) -> MountToken {
        self.shared.mount.clone()
    }

    pub fn config(&self) -> &MachineConfig {
        &self.shared.config
    }

    /// The snapshot captured at activation time.
    pub fn initial_state(&self) -> &AsyncState<T, E> {
        &self.shared.initial
    }

    /// Current snapshot.
    pub fn state(&self) -> AsyncState<T, E> {
        self.core().state.clone()
    }

    pub fn status(&self) -> Status {
        self.core().state.status
    }

    /// Last resolved (or directly set) value. Read it conditionally on
    /// [`status`](Self::status): it is not cleared when a new run starts.
    pub fn data(&self) -> Option<T> {
        self.core().state.data.clone()
    }

    pub fn error(&self) -> Option<AsyncError<E>> {
        self.core().state.error.clone()
    }

    pub fn is_idle(&self) -> bool {
        self.status() == Status::Idle
    }

    pub fn is_loading(&self) -> bool {
        self.status() == Status::Pending
    }

    pub fn is_error(&self) -> bool {
        self.status() == Status::Rejected
    }

    pub fn is_success(&self) -> bool {
        self.status() == Status::Resolved
    }

    pub fn history(&self) -> TransitionHistory {
        self.core().history.clone()
    }

    /// Merge `update` into the state if the machine is mounted.
    /// Returns whether the update was applied.
    pub fn dispatch(&self, update: Update<T, E>) -> bool {
        self.apply(update, None)
    }

    /// Set `data` without touching `status` or `error`.
    pub fn set_data(&self, data: T) -> bool {
        self.dispatch(Update::new().data(data))
    }

    /// Set `error` without touching `status` or `data`.
    pub fn set_error(&self, error: impl Into<AsyncError<E>>) -> bool {
        self.dispatch(Update::new().error(error))
    }

    /// Restore the activation-time snapshot.
    pub fn reset(&self) -> bool {
        self.dispatch(self.shared.initial.clone().into())
    }

    /// Register an observer called after every applied dispatch.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&AsyncState<T, E>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.shared.next_subscription.fetch_add(1, Ordering::Relaxed));
        let observer: Observer<T, E> = Arc::new(observer);
        self.observers().push((id, observer));
        id
    }

    /// Remove an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers();
        let before = observers.len();
        observers.retain(|(registered, _)| *registered != id);
        observers.len() != before
    }

    /// Drive one operation through the lifecycle.
    ///
    /// Dispatches `Pending`, awaits the operation, then dispatches
    /// `Resolved` with the value or `Rejected` with the error. The result is
    /// always handed back to the caller, also when the machine was torn down
    /// meanwhile or the completion was discarded as stale. A panicking
    /// operation is reported as [`AsyncError::Failed`].
    ///
    /// Stale `data`/`error` from a previous cycle are kept while pending.
    pub async fn run<'a, Fut>(
        &self,
        operation: impl Into<Operation<'a, Fut>>,
    ) -> Result<T, AsyncError<E>>
    where
        Fut: Future<Output = Result<T, E>> + 'a,
    {
        let run = self.begin_run();
        debug!(run, "starting operation");
        self.apply(Update::new().status(Status::Pending), Some(run));

        let operation = operation.into();
        let outcome = AssertUnwindSafe(async move { operation.start().await })
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(data)) => {
                debug!(run, "operation resolved");
                self.apply(
                    Update::new().status(Status::Resolved).data(data.clone()),
                    Some(run),
                );
                Ok(data)
            }
            Ok(Err(err)) => {
                debug!(run, "operation rejected");
                let error = AsyncError::Operation(err);
                self.apply(
                    Update::new().status(Status::Rejected).error(error.clone()),
                    Some(run),
                );
                Err(error)
            }
            Err(payload) => {
                warn!(run, panic = panic_message(payload.as_ref()), "operation panicked");
                self.apply(
                    Update::new().status(Status::Rejected).error(AsyncError::Failed),
                    Some(run),
                );
                Err(AsyncError::Failed)
            }
        }
    }

    /// Drive a stillwater effect through the lifecycle, running it against
    /// `env`.
    pub async fn run_effect<Eff>(&self, effect: Eff, env: &Eff::Env) -> Result<T, AsyncError<E>>
    where
        Eff: Effect<Output = T, Error = E>,
    {
        self.run(effect.run(env)).await
    }

    fn begin_run(&self) -> u64 {
        let mut core = self.core();
        core.latest_run += 1;
        core.latest_run
    }

    fn apply(&self, update: Update<T, E>, run: Option<u64>) -> bool {
        let Some(_entry) = self.shared.mount.enter() else {
            debug!(?run, phase = ?self.shared.mount.phase(), "dropping update for unmounted machine");
            return false;
        };

        {
            let mut core = self.core();
            // Teardown may have begun while this dispatch waited for the lock.
            if !self.shared.mount.is_mounted() {
                debug!(?run, "dropping update, teardown in progress");
                return false;
            }
            if let Some(run) = run {
                if self.shared.config.race_policy == RacePolicy::LatestRunWins
                    && run != core.latest_run
                {
                    debug!(run, latest = core.latest_run, "discarding update from superseded run");
                    return false;
                }
            }

            let from = core.state.status;
            let next = mem::take(&mut core.state).merge(update);
            if next.status != from {
                core.history = core.history.record(StatusTransition {
                    from,
                    to: next.status,
                    timestamp: Utc::now(),
                    run,
                });
            }
            core.state = next;
            trace!(?run, status = %core.state.status, "applied update");

            let snapshot = core.state.clone();
            core.outbox.push_back(snapshot);
            if core.delivering {
                // The thread already delivering picks this snapshot up.
                return true;
            }
            core.delivering = true;
        }

        self.deliver();
        true
    }

    /// Hand queued snapshots to observers one at a time, in apply order.
    /// Observers run outside the lock so they may call back in; a dispatch
    /// made from an observer is queued and delivered after it returns.
    fn deliver(&self) {
        let mut delivery = Delivery {
            machine: self,
            finished: false,
        };
        loop {
            let next = {
                let mut core = self.core();
                let next = if self.shared.mount.is_mounted() {
                    core.outbox.pop_front()
                } else {
                    None
                };
                if next.is_none() {
                    core.outbox.clear();
                    core.delivering = false;
                }
                next
            };
            let Some(state) = next else {
                break;
            };

            let observers: Vec<Observer<T, E>> = self
                .observers()
                .iter()
                .map(|(_, observer)| Arc::clone(observer))
                .collect();
            for observer in observers {
                observer(&state);
            }
        }
        delivery.finished = true;
    }

    fn core(&self) -> MutexGuard<'_, Core<T, E>> {
        self.shared.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observers(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Observer<T, E>)>> {
        self.shared
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the delivery role if an observer panics mid-delivery.
struct Delivery<'a, T: Clone, E: Clone> {
    machine: &'a AsyncMachine<T, E>,
    finished: bool,
}

impl<T: Clone, E: Clone> Drop for Delivery<'_, T, E> {
    fn drop(&mut self) {
        if !self.finished {
            let mut core = self.machine.core();
            core.outbox.clear();
            core.delivering = false;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
