//! Channel subscription and fan-out. A publish folds its payload into
//! every subscriber's pending envelope; a subscriber only gets a fresh
//! mailbox entry (and a fresh wake-up) the moment its previous envelope
//! wasn't already sitting undispatched, so a burst of publishes on a
//! busy channel costs its slow subscribers one dispatch, not one per
//! publisher.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::{DashMap, DashSet};
use skynet_process::{
    Handle, Message, MessageSink, Multicast, MulticastEnvelope, Payload, SESSION_MULTICAST,
};

pub struct MulticastHub {
    subscriptions: DashMap<u32, DashSet<Handle>>,
    pending: DashMap<Handle, Mutex<Vec<(Handle, Arc<[u8]>)>>>,
    in_flight: DashMap<Handle, AtomicBool>,
}

impl MulticastHub {
    pub fn new() -> Self {
        Self {
            subscriptions: DashMap::new(),
            pending: DashMap::new(),
            in_flight: DashMap::new(),
        }
    }

    fn deliver(&self, sink: &dyn MessageSink, handle: Handle, items: Vec<(Handle, Arc<[u8]>)>) {
        let envelope = Arc::new(MulticastEnvelope { items });
        sink.push(
            handle,
            Message {
                source: 0,
                session: SESSION_MULTICAST,
                payload: Payload::Multicast(envelope),
            },
        );
    }
}

impl Default for MulticastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Multicast for MulticastHub {
    fn subscribe(&self, channel: u32, handle: Handle) {
        self.subscriptions
            .entry(channel)
            .or_insert_with(DashSet::new)
            .insert(handle);
    }

    fn unsubscribe(&self, channel: u32, handle: Handle) {
        if let Some(subs) = self.subscriptions.get(&channel) {
            subs.remove(&handle);
        }
    }

    fn publish(&self, sink: &dyn MessageSink, channel: u32, source: Handle, data: Arc<[u8]>) {
        let Some(subs) = self.subscriptions.get(&channel) else {
            return;
        };
        for handle in subs.iter() {
            let handle = *handle;
            let should_flush = {
                let buffer = self.pending.entry(handle).or_insert_with(|| Mutex::new(Vec::new()));
                let mut guard = buffer.lock().unwrap();
                guard.push((source, data.clone()));
                let flag = self.in_flight.entry(handle).or_insert_with(|| AtomicBool::new(false));
                !flag.swap(true, Ordering::AcqRel)
            };
            if should_flush {
                let items = {
                    let buffer = self.pending.get(&handle).unwrap();
                    let mut guard = buffer.lock().unwrap();
                    std::mem::take(&mut *guard)
                };
                self.deliver(sink, handle, items);
            }
        }
    }

    fn dispatch(
        &self,
        subscriber: Handle,
        sink: &dyn MessageSink,
        envelope: &MulticastEnvelope,
        trampoline: &mut dyn FnMut(Handle, &[u8]),
    ) {
        for (source, data) in &envelope.items {
            trampoline(*source, data);
        }

        if let Some(flag) = self.in_flight.get(&subscriber) {
            flag.store(false, Ordering::Release);
        }

        let leftover = self.pending.get(&subscriber).map(|buffer| {
            let mut guard = buffer.lock().unwrap();
            std::mem::take(&mut *guard)
        });

        if let Some(items) = leftover {
            if !items.is_empty() {
                if let Some(flag) = self.in_flight.get(&subscriber) {
                    flag.store(true, Ordering::Release);
                }
                self.deliver(sink, subscriber, items);
            }
        }
    }
}
