//! The contracts this crate consumes from its collaborators (spec §6). The
//! core never names a concrete timer wheel, group map, or harbor transport
//! — it only names these traits, so `skynet-timer`, `skynet-group`,
//! `skynet-env`, `skynet-harbor`, `skynet-multicast`, and `skynet-error`
//! can each live in their own crate and be swapped independently.

use std::sync::Arc;

use crate::context::Context;
use crate::message::{GlobalName, MulticastEnvelope, RemoteMessage};
use crate::{Handle, Message, Session};

/// Sink a collaborator uses to push a synthesized message back into a
/// context's mailbox without depending on [`crate::Kernel`] directly.
/// [`crate::Kernel`] is the sole implementor.
pub trait MessageSink: Send + Sync {
    /// Pushes `message` onto `handle`'s mailbox. Returns `false` (and
    /// drops `message`) if `handle` no longer resolves to a live context.
    fn push(&self, handle: Handle, message: Message) -> bool;
}

/// A loaded service implementation's per-instance state.
pub trait ServiceInstance: Send + Sync {
    /// Runs once, right after the context is registered, and consumes
    /// `self` by value so the instance's state can move into the
    /// callback closure it installs via [`Context::set_callback`]. May
    /// also call [`crate::send`] or [`crate::command`] — the context is
    /// already fully addressable by the time this runs, it just isn't
    /// marked initialized yet.
    fn init(self: Box<Self>, ctx: &Arc<Context>, args: &str) -> anyhow::Result<()>;
}

/// A named service implementation, capable of producing new instances.
pub trait ServiceModule: Send + Sync {
    fn create(&self) -> anyhow::Result<Box<dyn ServiceInstance>>;
}

/// Resolves a module name to its implementation.
pub trait ModuleLoader: Send + Sync {
    fn query(&self, name: &str) -> Option<Arc<dyn ServiceModule>>;
}

/// Schedules a future wake that enqueues a timer message.
pub trait Timer: Send + Sync {
    /// Monotonic tick counter, used by the `NOW` command.
    fn now_ticks(&self) -> u64;

    /// After `ticks` ticks (0 meaning "next tick"), pushes a
    /// `{source: SYSTEM_TIMER, session, data: empty}` message to `handle`
    /// through `sink`.
    fn timeout(&self, sink: Arc<dyn MessageSink>, handle: Handle, ticks: u32, session: Session);
}

/// Decides remote-vs-local routing and hands work to the remote transport.
pub trait Harbor: Send + Sync {
    fn is_remote(&self, handle: Handle) -> bool;

    /// Takes ownership of `remote` and routes it to its destination node.
    fn send(&self, remote: RemoteMessage, source: Handle, session: Session);

    /// Publishes `(handle, name)` so other nodes can resolve it.
    fn register(&self, name: GlobalName, handle: Handle);

    /// Attempts to retire a service known only by a global (non-local)
    /// name. Returns `true` if some harbor-routed node accepted the
    /// request, `false` if no route exists for `name`.
    fn kill_by_name(&self, name: &str) -> bool;
}

/// Fans a multicast envelope out to its owning context's callback, one
/// coalesced sub-message at a time.
pub trait Multicast: Send + Sync {
    fn subscribe(&self, channel: u32, handle: Handle);
    fn unsubscribe(&self, channel: u32, handle: Handle);

    /// Publishes `data` from `source` on `channel`. Implementations push
    /// a coalesced [`MulticastEnvelope`] to each subscriber's mailbox
    /// through `sink`; a publish that arrives while a subscriber already
    /// has an undispatched envelope sitting in its mailbox is folded into
    /// that same envelope instead of waking the subscriber again.
    fn publish(&self, sink: &dyn MessageSink, channel: u32, source: Handle, data: Arc<[u8]>);

    /// Invokes `trampoline(source, data)` once per sub-message batched
    /// into `envelope`, then flushes any further items that were folded
    /// in for `subscriber` while this envelope was in flight, delivering
    /// them to `subscriber` through `sink` as a fresh envelope.
    fn dispatch(
        &self,
        subscriber: Handle,
        sink: &dyn MessageSink,
        envelope: &MulticastEnvelope,
        trampoline: &mut dyn FnMut(Handle, &[u8]),
    );
}

/// Backs the `GROUP` command (`ENTER`/`LEAVE`/`QUERY`/`CLEAR`).
pub trait GroupRegistry: Send + Sync {
    fn enter(&self, group: i32, handle: Handle);
    fn leave(&self, group: i32, handle: Handle);
    fn query(&self, group: i32) -> Option<Handle>;
    fn clear(&self, group: i32);
}

/// Backs the `GETENV`/`SETENV` commands.
pub trait EnvMap: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: String, value: String);
}

/// Where dropped messages and creation failures get logged.
pub trait ErrorSink: Send + Sync {
    fn log(&self, ctx: Option<Handle>, message: &str);
}

/// Wall-clock source backing `STARTTIME`.
pub trait Clock: Send + Sync {
    fn now_seconds(&self) -> u64;
}
