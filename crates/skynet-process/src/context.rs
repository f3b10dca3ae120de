//! A running service instance: its handle, its mailbox, the session
//! counter it hands out for request/reply correlation, and the callback
//! registered by its loaded module.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::kernel::Kernel;
use crate::mailbox::Mailbox;
use crate::message::Payload;
use crate::{Handle, Session, SESSION_MAX};

/// What a callback does with the payload buffer it was handed, replacing
/// the original boolean "reserve" return value with an explicit choice:
/// either the callback keeps the buffer, or it hands the bytes back so
/// dispatch can still act on them (e.g. to satisfy a pending `forward`).
pub enum CallbackAction {
    Taken,
    Return(Vec<u8>),
}

/// A loaded module's message handler. Runs with exclusive access to its
/// context for the duration of one dispatch.
pub type Callback =
    Box<dyn FnMut(&Arc<Context>, Handle, Session, Payload) -> CallbackAction + Send>;

#[cfg(debug_assertions)]
struct CallingGuard<'a>(&'a AtomicBool);

#[cfg(debug_assertions)]
impl<'a> CallingGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        if flag.swap(true, Ordering::AcqRel) {
            panic!("context dispatched re-entrantly: exactly-one-active-dispatch violated");
        }
        Self(flag)
    }
}

#[cfg(debug_assertions)]
impl Drop for CallingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Context {
    handle: Handle,
    kernel: Weak<Kernel>,
    mailbox: Arc<Mailbox>,
    session_seed: AtomicI32,
    callback: Mutex<Option<Callback>>,
    initialized: AtomicBool,
    /// Destination recorded by [`crate::forward`] during the callback
    /// currently running. `0` means "no forward pending". Consulted by
    /// the dispatch loop once the callback returns a buffer it didn't
    /// keep, so the message can still be routed onward instead of
    /// simply being dropped.
    pending_forward: AtomicU32,
    #[cfg(debug_assertions)]
    calling: AtomicBool,
}

impl Context {
    pub(crate) fn new(handle: Handle, kernel: Weak<Kernel>, mailbox: Arc<Mailbox>) -> Self {
        Self {
            handle,
            kernel,
            mailbox,
            session_seed: AtomicI32::new(0),
            callback: Mutex::new(None),
            initialized: AtomicBool::new(false),
            pending_forward: AtomicU32::new(0),
            #[cfg(debug_assertions)]
            calling: AtomicBool::new(false),
        }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub(crate) fn mailbox(&self) -> &Arc<Mailbox> {
        &self.mailbox
    }

    /// Upgrades back to the owning kernel. `None` only once the kernel
    /// itself has been torn down (never during normal operation, since
    /// the kernel outlives every context it registered).
    pub fn kernel(&self) -> Option<Arc<Kernel>> {
        self.kernel.upgrade()
    }

    pub fn set_callback(&self, cb: Callback) {
        *self.callback.lock().unwrap() = Some(cb);
    }

    pub fn has_callback(&self) -> bool {
        self.callback.lock().unwrap().is_some()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub(crate) fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    /// Allocates the next session id for a request originating here.
    /// Sessions are positive; the counter wraps back to 1 just before it
    /// would reach [`SESSION_MAX`] rather than overflowing.
    pub fn next_session(&self) -> Session {
        let prev = self.session_seed.fetch_add(1, Ordering::Relaxed);
        let s = prev + 1;
        if s >= SESSION_MAX {
            self.session_seed.store(1, Ordering::Relaxed);
            1
        } else {
            s
        }
    }

    /// Records `handle` as the destination a `forward` issued during the
    /// in-flight callback should route the returned buffer to.
    pub(crate) fn set_forward(&self, handle: Handle) {
        self.pending_forward.store(handle, Ordering::Release);
    }

    /// Clears and returns the pending forward destination, if any.
    pub(crate) fn take_forward(&self) -> Option<Handle> {
        match self.pending_forward.swap(0, Ordering::AcqRel) {
            0 => None,
            handle => Some(handle),
        }
    }

    pub(crate) fn take_callback(&self) -> Option<Callback> {
        self.callback.lock().unwrap().take()
    }

    pub(crate) fn restore_callback(&self, cb: Callback) {
        *self.callback.lock().unwrap() = Some(cb);
    }

    #[cfg(debug_assertions)]
    pub(crate) fn enter_dispatch(&self) -> impl Drop + '_ {
        CallingGuard::enter(&self.calling)
    }

    #[cfg(not(debug_assertions))]
    pub(crate) fn enter_dispatch(&self) {}
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("handle", &format_args!("{:08x}", self.handle))
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(handle: Handle) -> Context {
        Context::new(handle, Weak::new(), Arc::new(Mailbox::new(handle)))
    }

    #[test]
    fn sessions_start_at_one_and_increase() {
        let c = ctx(1);
        assert_eq!(c.next_session(), 1);
        assert_eq!(c.next_session(), 2);
        assert_eq!(c.next_session(), 3);
    }

    #[test]
    fn session_wraps_back_to_one_before_max() {
        let c = ctx(1);
        c.session_seed.store(SESSION_MAX - 1, Ordering::Relaxed);
        assert_eq!(c.next_session(), 1);
        assert_eq!(c.next_session(), 2);
    }

    #[test]
    fn callback_round_trips_through_take_and_restore() {
        let c = ctx(1);
        assert!(!c.has_callback());
        c.set_callback(Box::new(|_ctx, _src, _sess, _payload| CallbackAction::Taken));
        assert!(c.has_callback());
        let cb = c.take_callback();
        assert!(cb.is_some());
        assert!(!c.has_callback());
        c.restore_callback(cb.unwrap());
        assert!(c.has_callback());
    }

    #[test]
    fn kernel_upgrade_fails_once_dropped() {
        let c = ctx(1);
        assert!(c.kernel().is_none());
    }
}
