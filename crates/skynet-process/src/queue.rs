//! The global ready-queue: a multi-producer, multi-consumer queue of
//! mailboxes that currently have at least one message pending. Worker
//! threads pop from this queue to decide which context to dispatch next.
//!
//! Built on `tokio::sync::mpsc::unbounded_channel`, used synchronously
//! (`try_recv`/`send`) so the core has no hard dependency on a running
//! tokio reactor — pushing a ready mailbox never needs to `.await`.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::mailbox::Mailbox;

pub struct GlobalQueue {
    tx: UnboundedSender<Arc<Mailbox>>,
    rx: Mutex<UnboundedReceiver<Arc<Mailbox>>>,
}

impl GlobalQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Enqueues `mailbox`. The channel is unbounded so this never blocks
    /// and only fails if every receiver has been dropped, which can't
    /// happen while `self` is alive.
    pub fn push(&self, mailbox: Arc<Mailbox>) {
        let _ = self.tx.send(mailbox);
    }

    /// Pops the next ready mailbox without blocking. Worker threads that
    /// find this empty are expected to park briefly before retrying.
    pub fn pop(&self) -> Option<Arc<Mailbox>> {
        match self.rx.lock().unwrap().try_recv() {
            Ok(mailbox) => Some(mailbox),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

impl Default for GlobalQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_on_empty_queue_returns_none() {
        let q = GlobalQueue::new();
        assert!(q.pop().is_none());
    }

    #[test]
    fn push_then_pop_round_trips_same_mailbox() {
        let q = GlobalQueue::new();
        let mb = Arc::new(Mailbox::new(7));
        q.push(mb.clone());
        let popped = q.pop().unwrap();
        assert_eq!(popped.handle(), 7);
        assert!(Arc::ptr_eq(&mb, &popped));
    }

    #[test]
    fn pop_is_fifo_across_pushes() {
        let q = GlobalQueue::new();
        q.push(Arc::new(Mailbox::new(1)));
        q.push(Arc::new(Mailbox::new(2)));
        assert_eq!(q.pop().unwrap().handle(), 1);
        assert_eq!(q.pop().unwrap().handle(), 2);
        assert!(q.pop().is_none());
    }
}
