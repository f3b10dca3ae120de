//! Per-service FIFO mailbox.
//!
//! A [`Mailbox`] tracks whether it is currently present in the global
//! ready-queue via `queued`, the way the original `message_queue`'s
//! `in_global` flag does: [`push`](Mailbox::push) only asks the caller to
//! enqueue it when it transitions from "not queued" to "queued",
//! [`force_ready`](Mailbox::force_ready) always does (the scheduling
//! heartbeat at the end of dispatch), and
//! [`mark_idle`](Mailbox::mark_idle) clears the flag when a dispatch found
//! nothing to do so the next push knows to re-enqueue it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::message::Message;
use crate::Handle;

pub struct Mailbox {
    handle: Handle,
    queue: Mutex<VecDeque<Message>>,
    queued: AtomicBool,
}

impl Mailbox {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            queue: Mutex::new(VecDeque::new()),
            queued: AtomicBool::new(false),
        }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Appends `msg`. Returns `true` if the caller must now enqueue this
    /// mailbox onto the global ready-queue (it wasn't already there).
    pub fn push(&self, msg: Message) -> bool {
        self.queue.lock().unwrap().push_back(msg);
        !self.queued.swap(true, Ordering::AcqRel)
    }

    /// Pops the oldest message, if any.
    pub fn pop(&self) -> Option<Message> {
        self.queue.lock().unwrap().pop_front()
    }

    /// Unconditionally marks this mailbox ready; the caller must enqueue
    /// it onto the global ready-queue regardless of its prior state. This
    /// is the force-push scheduling heartbeat.
    pub fn force_ready(&self) {
        self.queued.store(true, Ordering::Release);
    }

    /// Clears the ready flag after a dispatch found the mailbox empty and
    /// chose not to re-enqueue it; the next [`push`](Mailbox::push) will.
    pub fn mark_idle(&self) {
        self.queued.store(false, Ordering::Release);
    }

    /// Drains and discards all buffered messages, returning how many were
    /// dropped. Used when a mailbox's owning context has been retired.
    pub fn drain(&self) -> usize {
        let mut q = self.queue.lock().unwrap();
        let n = q.len();
        q.clear();
        n
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().unwrap().is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }
}

impl Drop for Mailbox {
    fn drop(&mut self) {
        let remaining = self.drain();
        if remaining > 0 {
            log::debug!(
                "mailbox for handle {:08x} dropped with {} undelivered message(s)",
                self.handle,
                remaining
            );
        }
    }
}
