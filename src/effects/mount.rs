//! Mount guard: the token that decides whether dispatches may reach state.
//!
//! A token starts unmounted, is armed once by [`MountToken::mount`], and is
//! disarmed forever by [`MountToken::unmount`]. Every dispatch enters the
//! token for as long as it touches state or notifies observers, and teardown
//! waits for entries held by other threads. Once `unmount` returns, nothing
//! reaches state or observers again.

use std::cell::RefCell;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Observable phase of a [`MountToken`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MountPhase {
    /// Created but not yet armed; dispatches are dropped.
    #[default]
    Unmounted,
    /// Armed; dispatches are applied.
    Mounted,
    /// Disarmed by teardown; dispatches are dropped for good.
    TornDown,
}

#[derive(Debug, Default)]
struct Gate {
    phase: MountPhase,
    active: usize,
}

#[derive(Debug, Default)]
struct Inner {
    gate: Mutex<Gate>,
    released: Condvar,
}

thread_local! {
    // Tokens entered by the current thread, one element per live entry.
    static ENTERED: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Shared, cloneable liveness flag for one activation.
///
/// # Example
///
/// ```rust
/// use async_state::effects::{MountPhase, MountToken};
///
/// let token = MountToken::new();
/// assert!(!token.is_mounted());
///
/// assert!(token.mount());
/// assert!(token.is_mounted());
///
/// assert!(token.unmount());
/// assert_eq!(token.phase(), MountPhase::TornDown);
///
/// // Teardown is final.
/// assert!(!token.mount());
/// assert!(!token.is_mounted());
/// ```
#[derive(Clone, Debug, Default)]
pub struct MountToken {
    inner: Arc<Inner>,
}

impl MountToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the token. Returns `false` if it was already mounted or torn down.
    pub fn mount(&self) -> bool {
        let mut gate = self.gate();
        if gate.phase != MountPhase::Unmounted {
            return false;
        }
        gate.phase = MountPhase::Mounted;
        debug!("mounted");
        true
    }

    /// Disarm the token permanently. Returns `true` only for the call that
    /// performed the teardown.
    ///
    /// Blocks until entries held by other threads are released. Entries
    /// held by the calling thread (an observer tearing its own view down)
    /// are not waited for.
    pub fn unmount(&self) -> bool {
        let held_here = self.entered_here();
        let mut gate = self.gate();
        let first = gate.phase != MountPhase::TornDown;
        gate.phase = MountPhase::TornDown;
        if first {
            debug!("torn down");
        }
        while gate.active > held_here {
            gate = self
                .inner
                .released
                .wait(gate)
                .unwrap_or_else(PoisonError::into_inner);
        }
        first
    }

    pub fn is_mounted(&self) -> bool {
        self.phase() == MountPhase::Mounted
    }

    pub fn phase(&self) -> MountPhase {
        self.gate().phase
    }

    /// Enter the token if it is mounted. Teardown on other threads waits
    /// until the returned entry is dropped.
    pub(crate) fn enter(&self) -> Option<Entered<'_>> {
        let mut gate = self.gate();
        if gate.phase != MountPhase::Mounted {
            return None;
        }
        gate.active += 1;
        ENTERED.with(|entered| entered.borrow_mut().push(self.key()));
        Some(Entered { token: self })
    }

    #[cfg(test)]
    pub(crate) fn active(&self) -> usize {
        self.gate().active
    }

    fn key(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    fn entered_here(&self) -> usize {
        let key = self.key();
        ENTERED.with(|entered| entered.borrow().iter().filter(|k| **k == key).count())
    }

    fn gate(&self) -> MutexGuard<'_, Gate> {
        self.inner.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A live entry into a mounted token; see [`MountToken::enter`].
pub(crate) struct Entered<'a> {
    token: &'a MountToken,
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        let key = self.token.key();
        ENTERED.with(|entered| {
            let mut entered = entered.borrow_mut();
            if let Some(pos) = entered.iter().rposition(|k| *k == key) {
                entered.swap_remove(pos);
            }
        });
        let mut gate = self.token.gate();
        gate.active -= 1;
        self.token.inner.released.notify_all();
    }
}

/// RAII handle for a mounted activation; dropping it tears the activation
/// down.
#[derive(Debug)]
#[must_use = "dropping the handle immediately unmounts the machine"]
pub struct Mounted {
    token: MountToken,
}

impl Mounted {
    pub(crate) fn new(token: MountToken) -> Self {
        Self { token }
    }

    /// The token this handle will disarm.
    pub fn token(&self) -> &MountToken {
        &self.token
    }
}

impl Drop for Mounted {
    fn drop(&mut self) {
        self.token.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn new_token_is_unmounted() {
        let token = MountToken::new();
        assert_eq!(token.phase(), MountPhase::Unmounted);
        assert!(!token.is_mounted());
    }

    #[test]
    fn mount_arms_only_once() {
        let token = MountToken::new();
        assert!(token.mount());
        assert!(!token.mount());
        assert!(token.is_mounted());
    }

    #[test]
    fn unmount_happens_exactly_once() {
        let token = MountToken::new();
        token.mount();

        assert!(token.unmount());
        assert!(!token.unmount());
        assert_eq!(token.phase(), MountPhase::TornDown);
    }

    #[test]
    fn unmount_before_mount_prevents_mounting() {
        let token = MountToken::new();
        assert!(token.unmount());
        assert!(!token.mount());
        assert!(!token.is_mounted());
    }

    #[test]
    fn clones_share_phase() {
        let token = MountToken::new();
        let observer = token.clone();

        token.mount();
        assert!(observer.is_mounted());

        observer.unmount();
        assert!(!token.is_mounted());
    }

    #[test]
    fn dropping_handle_tears_down() {
        let token = MountToken::new();
        token.mount();

        let handle = Mounted::new(token.clone());
        assert!(handle.token().is_mounted());
        drop(handle);

        assert_eq!(token.phase(), MountPhase::TornDown);
    }

    #[test]
    fn enter_fails_unless_mounted() {
        let token = MountToken::new();
        assert!(token.enter().is_none());

        token.mount();
        assert!(token.enter().is_some());

        token.unmount();
        assert!(token.enter().is_none());
    }

    #[test]
    fn unmount_waits_for_entries_on_other_threads() {
        let token = MountToken::new();
        token.mount();
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let holder = thread::spawn({
            let token = token.clone();
            move || {
                let entry = token.enter();
                entered_tx.send(entry.is_some()).unwrap();
                release_rx.recv().unwrap();
                drop(entry);
            }
        });
        assert!(entered_rx.recv().unwrap());

        let (done_tx, done_rx) = mpsc::channel();
        let teardown = thread::spawn({
            let token = token.clone();
            move || {
                token.unmount();
                done_tx.send(()).unwrap();
            }
        });

        // Teardown is visible at once but does not complete while entered.
        while token.phase() != MountPhase::TornDown {
            thread::yield_now();
        }
        assert!(done_rx.recv_timeout(Duration::from_millis(50)).is_err());

        release_tx.send(()).unwrap();
        done_rx.recv().unwrap();
        holder.join().unwrap();
        teardown.join().unwrap();
    }

    #[test]
    fn unmount_from_inside_own_entry_does_not_block() {
        let token = MountToken::new();
        token.mount();

        let entry = token.enter();
        assert!(entry.is_some());
        assert!(token.unmount());
        drop(entry);

        assert_eq!(token.phase(), MountPhase::TornDown);
    }
}
