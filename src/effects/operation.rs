//! Operations accepted by [`AsyncMachine::run`](super::AsyncMachine::run).

use std::fmt;
use std::future::Future;

/// Type alias for deferred operation factories.
/// The factory is invoked once, after the pending dispatch.
pub type OperationFactory<'a, Fut> = Box<dyn FnOnce() -> Fut + Send + 'a>;

/// An asynchronous computation to drive through the lifecycle.
///
/// Either an already-created future, or a zero-argument factory producing
/// one. Any future converts into `Operation::Started`, so `run(fut)` works
/// directly; use [`Operation::deferred`] to pass a factory.
///
/// # Example
///
/// ```rust
/// use async_state::effects::Operation;
///
/// let started: Operation<'_, _> = async { Ok::<_, String>(1) }.into();
/// let deferred = Operation::deferred(|| async { Ok::<_, String>(2) });
/// # let _ = (started, deferred);
/// ```
pub enum Operation<'a, Fut> {
    /// A future created by the caller.
    Started(Fut),

    /// A factory that creates the future on demand.
    Deferred(OperationFactory<'a, Fut>),
}

impl<'a, Fut> Operation<'a, Fut> {
    /// Wrap a factory that creates the future when the run begins.
    pub fn deferred<F>(factory: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
    {
        Self::Deferred(Box::new(factory))
    }

    /// Obtain the future, invoking the factory if needed.
    pub fn start(self) -> Fut {
        match self {
            Self::Started(future) => future,
            Self::Deferred(factory) => factory(),
        }
    }
}

impl<'a, Fut: Future> From<Fut> for Operation<'a, Fut> {
    fn from(future: Fut) -> Self {
        Self::Started(future)
    }
}

impl<Fut> fmt::Debug for Operation<'_, Fut> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started(_) => f.write_str("Operation::Started"),
            Self::Deferred(_) => f.write_str("Operation::Deferred"),
        }
    }
}
