//! Cancellation tokens for in-flight renders
//!
//! A render receives a token when it starts. Cancelling the token flips a
//! shared flag and runs any hooks the renderer registered, which is how a
//! collaborator forwards cancellation to its own task handle. Cancellation is
//! cooperative: the renderer decides when it actually stops.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

type CancelHook = Box<dyn FnOnce()>;

/// Cooperative cancellation token, shared by cloning.
///
/// All clones observe the same state. The viewer runs on a single thread, so
/// the token is `Rc`-based rather than atomic.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Rc<TokenInner>,
}

#[derive(Default)]
struct TokenInner {
    cancelled: Cell<bool>,
    hooks: RefCell<Vec<CancelHook>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel this token and run registered hooks.
    ///
    /// Idempotent: hooks run at most once.
    pub fn cancel(&self) {
        if self.inner.cancelled.replace(true) {
            return;
        }
        let hooks = std::mem::take(&mut *self.inner.hooks.borrow_mut());
        for hook in hooks {
            hook();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.get()
    }

    /// Run `hook` when the token is cancelled, or right away if it already is.
    pub fn on_cancel(&self, hook: impl FnOnce() + 'static) {
        if self.is_cancelled() {
            hook();
            return;
        }
        self.inner.hooks.borrow_mut().push(Box::new(hook));
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .field("hooks", &self.inner.hooks.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let token = CancelToken::new();
        let worker = token.clone();
        assert!(!worker.is_cancelled());
        token.cancel();
        assert!(worker.is_cancelled());
    }

    #[test]
    fn hooks_run_once() {
        let token = CancelToken::new();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        token.on_cancel(move || counter.set(counter.get() + 1));

        token.cancel();
        token.cancel();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn late_hook_runs_immediately() {
        let token = CancelToken::new();
        token.cancel();
        let ran = Rc::new(Cell::new(false));
        let flag = ran.clone();
        token.on_cancel(move || flag.set(true));
        assert!(ran.get());
    }

    #[test]
    fn hook_may_query_token() {
        let token = CancelToken::new();
        let observed = Rc::new(Cell::new(false));
        let inner = token.clone();
        let flag = observed.clone();
        token.on_cancel(move || flag.set(inner.is_cancelled()));
        token.cancel();
        assert!(observed.get());
    }
}
