//! The dispatch loop worker threads run: pop a ready mailbox, pop one
//! message from it, hand the message to the owning context's callback,
//! then re-queue the mailbox if more work is waiting.
//!
//! Re-queuing immediately (rather than draining a mailbox to empty
//! before moving on) is the force-push scheduling heartbeat: it keeps
//! one busy context from starving every other ready mailbox behind it.

use crate::context::CallbackAction;
use crate::message::Message;
use crate::send::{send, SendData};
use crate::Handle;
use std::sync::Arc;

use crate::kernel::Kernel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The global ready-queue had nothing to do.
    Idle,
    /// One message was handed to `Handle`'s callback.
    Dispatched(Handle),
    /// A message was popped but could not be delivered (retired context
    /// or no callback registered) and was dropped.
    Dropped(Handle),
}

/// Runs one iteration of the dispatch loop against `kernel`. Intended to
/// be called in a tight loop by each worker thread; returns `Idle`
/// rather than blocking when there is nothing ready.
pub fn dispatch_once(kernel: &Arc<Kernel>) -> DispatchOutcome {
    let mailbox = match kernel.ready_queue().pop() {
        Some(mailbox) => mailbox,
        None => return DispatchOutcome::Idle,
    };
    let handle = mailbox.handle();

    let message = match mailbox.pop() {
        Some(message) => message,
        None => {
            mailbox.mark_idle();
            return DispatchOutcome::Idle;
        }
    };

    // Force-push unconditionally, even when the mailbox just emptied:
    // a concurrent push() landing between this pop() and now may already
    // have observed `queued` still set and skipped re-enqueuing, relying
    // on this dispatch to do it instead.
    mailbox.force_ready();
    kernel.ready_queue().push(mailbox);

    let ctx = match kernel.grab(handle) {
        Some(ctx) => ctx,
        None => {
            kernel
                .errors()
                .log(None, &format!("dropped message for retired handle {handle:08x}"));
            return DispatchOutcome::Dropped(handle);
        }
    };

    let _guard = ctx.enter_dispatch();

    let mut callback = match ctx.take_callback() {
        Some(callback) => callback,
        None => {
            kernel
                .errors()
                .log(Some(handle), "dropped message: no callback registered");
            return DispatchOutcome::Dropped(handle);
        }
    };

    let Message {
        source,
        session,
        payload,
    } = message;
    let action = callback(&ctx, source, session, payload);
    ctx.restore_callback(callback);

    if let CallbackAction::Return(data) = action {
        if let Some(destination) = ctx.take_forward() {
            send(kernel, handle, destination, session, SendData::Owned(data));
        }
    }

    DispatchOutcome::Dispatched(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::*;
    use crate::context::Context;
    use crate::message::{GlobalName, MulticastEnvelope, Payload, RemoteMessage};
    use crate::{Clock, Session};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    struct FixedClock;
    impl Clock for FixedClock {
        fn now_seconds(&self) -> u64 {
            0
        }
    }
    struct NullTimer(AtomicU64);
    impl Timer for NullTimer {
        fn now_ticks(&self) -> u64 {
            self.0.load(Ordering::Relaxed)
        }
        fn timeout(&self, _sink: Arc<dyn MessageSink>, _handle: Handle, _ticks: u32, _session: Session) {}
    }
    struct NullHarbor;
    impl Harbor for NullHarbor {
        fn is_remote(&self, _handle: Handle) -> bool {
            false
        }
        fn send(&self, _remote: RemoteMessage, _source: Handle, _session: Session) {}
        fn register(&self, _name: GlobalName, _handle: Handle) {}
        fn kill_by_name(&self, _name: &str) -> bool {
            false
        }
    }
    struct NullMulticast;
    impl Multicast for NullMulticast {
        fn subscribe(&self, _channel: u32, _handle: Handle) {}
        fn unsubscribe(&self, _channel: u32, _handle: Handle) {}
        fn publish(&self, _sink: &dyn MessageSink, _channel: u32, _source: Handle, _data: Arc<[u8]>) {}
        fn dispatch(
            &self,
            _subscriber: Handle,
            _sink: &dyn MessageSink,
            _envelope: &MulticastEnvelope,
            _trampoline: &mut dyn FnMut(Handle, &[u8]),
        ) {
        }
    }
    struct NullGroups;
    impl GroupRegistry for NullGroups {
        fn enter(&self, _group: i32, _handle: Handle) {}
        fn leave(&self, _group: i32, _handle: Handle) {}
        fn query(&self, _group: i32) -> Option<Handle> {
            None
        }
        fn clear(&self, _group: i32) {}
    }
    struct NullEnv;
    impl EnvMap for NullEnv {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }
        fn set(&self, _key: String, _value: String) {}
    }
    struct NullErrors;
    impl ErrorSink for NullErrors {
        fn log(&self, _ctx: Option<Handle>, _message: &str) {}
    }

    struct RecordingModule;
    struct RecordingInstance;
    impl ServiceInstance for RecordingInstance {
        fn init(self: Box<Self>, ctx: &Arc<Context>, _args: &str) -> anyhow::Result<()> {
            let received: Arc<Mutex<Vec<(Handle, Session)>>> = Arc::new(Mutex::new(Vec::new()));
            ctx.set_callback(Box::new(move |_ctx, source, session, _payload| {
                received.lock().unwrap().push((source, session));
                CallbackAction::Taken
            }));
            Ok(())
        }
    }
    impl ServiceModule for RecordingModule {
        fn create(&self) -> anyhow::Result<Box<dyn ServiceInstance>> {
            Ok(Box::new(RecordingInstance))
        }
    }

    struct ForwardingModule;
    struct ForwardingInstance;
    impl ServiceInstance for ForwardingInstance {
        fn init(self: Box<Self>, ctx: &Arc<Context>, args: &str) -> anyhow::Result<()> {
            let target: Handle = args.parse().unwrap_or(0);
            ctx.set_callback(Box::new(move |ctx, _source, _session, payload| {
                let bytes = match payload {
                    Payload::Bytes(b) => b,
                    Payload::Multicast(_) => Vec::new(),
                };
                crate::send::forward(ctx, target);
                CallbackAction::Return(bytes)
            }));
            Ok(())
        }
    }
    impl ServiceModule for ForwardingModule {
        fn create(&self) -> anyhow::Result<Box<dyn ServiceInstance>> {
            Ok(Box::new(ForwardingInstance))
        }
    }

    struct TestLoader;
    impl ModuleLoader for TestLoader {
        fn query(&self, name: &str) -> Option<Arc<dyn ServiceModule>> {
            match name {
                "recording" => Some(Arc::new(RecordingModule)),
                "forwarding" => Some(Arc::new(ForwardingModule)),
                _ => None,
            }
        }
    }

    fn test_kernel() -> Arc<Kernel> {
        Kernel::new(
            0,
            Arc::new(TestLoader),
            Arc::new(NullTimer(AtomicU64::new(0))),
            Arc::new(NullHarbor),
            Arc::new(NullMulticast),
            Arc::new(NullGroups),
            Arc::new(NullEnv),
            Arc::new(NullErrors),
            Arc::new(FixedClock),
        )
    }

    #[test]
    fn dispatch_once_on_empty_queue_is_idle() {
        let kernel = test_kernel();
        assert_eq!(dispatch_once(&kernel), DispatchOutcome::Idle);
    }

    #[test]
    fn dispatch_once_delivers_one_message() {
        let kernel = test_kernel();
        let ctx = kernel.context_new("recording", "").unwrap();
        send(&kernel, 0, ctx.handle(), 5, SendData::None);
        assert_eq!(dispatch_once(&kernel), DispatchOutcome::Dispatched(ctx.handle()));
        assert_eq!(dispatch_once(&kernel), DispatchOutcome::Idle);
    }

    #[test]
    fn dispatch_once_drops_message_for_retired_context() {
        let kernel = test_kernel();
        let ctx = kernel.context_new("recording", "").unwrap();
        let handle = ctx.handle();
        send(&kernel, 0, handle, 1, SendData::None);
        drop(ctx);
        kernel.retire(handle);
        // The mailbox is still in the ready queue even though its owning
        // context is gone; dispatch must treat that as a drop, not a
        // panic.
        assert_eq!(dispatch_once(&kernel), DispatchOutcome::Dropped(handle));
    }

    #[test]
    fn dispatch_once_requeues_mailbox_with_more_messages_waiting() {
        let kernel = test_kernel();
        let ctx = kernel.context_new("recording", "").unwrap();
        send(&kernel, 0, ctx.handle(), 1, SendData::None);
        send(&kernel, 0, ctx.handle(), 2, SendData::None);
        assert_eq!(dispatch_once(&kernel), DispatchOutcome::Dispatched(ctx.handle()));
        // The second message is still there, re-queued by the heartbeat.
        assert_eq!(dispatch_once(&kernel), DispatchOutcome::Dispatched(ctx.handle()));
        assert_eq!(dispatch_once(&kernel), DispatchOutcome::Idle);
    }

    #[test]
    fn forward_routes_returned_buffer_to_recorded_destination() {
        let kernel = test_kernel();
        let sink = kernel.context_new("recording", "").unwrap();
        let relay = kernel.context_new("forwarding", &sink.handle().to_string()).unwrap();
        send(&kernel, 0, relay.handle(), 9, SendData::Owned(vec![1, 2, 3]));
        assert_eq!(dispatch_once(&kernel), DispatchOutcome::Dispatched(relay.handle()));
        assert_eq!(dispatch_once(&kernel), DispatchOutcome::Dispatched(sink.handle()));
    }
}
