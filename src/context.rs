//! Request-scoped cancellation.

use crossbeam::channel::{Receiver, Sender, TryRecvError, bounded, never};

use crate::error::Error;

/// Cancellation token threaded through every store operation.
///
/// Cloning is cheap; all clones observe the same cancellation. Operations
/// check the token at their entry points and at every blocking rendezvous, and
/// never between a committed write and its broadcast.
#[derive(Clone)]
pub struct Context {
    done: Receiver<()>,
}

impl Context {
    /// A context that is never canceled.
    pub fn background() -> Self {
        Self { done: never() }
    }

    /// A cancelable context. Dropping the returned guard (or calling
    /// [`CancelGuard::cancel`]) cancels all clones of the context.
    pub fn cancelable() -> (Self, CancelGuard) {
        let (tx, rx) = bounded::<()>(0);
        (Self { done: rx }, CancelGuard { _tx: tx })
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self.done.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Channel that becomes ready once the context is canceled.
    pub(crate) fn done(&self) -> &Receiver<()> {
        &self.done
    }

    pub(crate) fn check(&self) -> Result<(), Error> {
        if self.is_canceled() {
            Err(Error::Canceled)
        } else {
            Ok(())
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

/// Owner side of a cancelable [`Context`].
pub struct CancelGuard {
    _tx: Sender<()>,
}

impl CancelGuard {
    /// Cancel the associated context. Dropping the guard has the same effect.
    pub fn cancel(self) {}
}
