//! The service/context core of the runtime: context lifecycle, the
//! per-service mailbox and global ready-queue, the dispatch loop, the
//! send/forward path, and the text command surface.
//!
//! Everything this crate needs from the rest of the runtime is expressed as
//! a trait in [`collaborators`] — [`ModuleLoader`], [`Timer`], [`Harbor`],
//! [`Multicast`], [`GroupRegistry`], [`EnvMap`], [`ErrorSink`], [`Clock`] —
//! so this crate has no idea a tokio timer wheel or a dashmap-backed group
//! registry exists on the other side. Satellite crates (`skynet-timer`,
//! `skynet-harbor`, ...) implement those traits.

pub mod address;
pub mod collaborators;
pub mod command;
pub mod context;
pub mod dispatch;
pub mod kernel;
pub mod mailbox;
pub mod message;
pub mod queue;
pub mod send;

pub use address::{id_to_hex, parse_address, queryname, Address};
pub use collaborators::{
    Clock, EnvMap, ErrorSink, GroupRegistry, Harbor, MessageSink, Multicast, ModuleLoader,
    ServiceInstance, ServiceModule, Timer,
};
pub use command::dispatch_command;
pub use context::{Callback, CallbackAction, Context};
pub use dispatch::{dispatch_once, DispatchOutcome};
pub use kernel::Kernel;
pub use mailbox::Mailbox;
pub use message::{GlobalName, Message, MulticastEnvelope, Payload, RemoteDestination, RemoteMessage, GLOBALNAME_LENGTH};
pub use send::{context_send, forward, send, sendname, SendData, DONTCOPY};
pub use skynet_handle::Handle;

/// Per-context correlation id for request/reply. See [`message`] for the
/// reserved values.
pub type Session = i32;

/// Reserved `source` value identifying a timer delivery.
pub const SYSTEM_TIMER: Handle = 0;

/// Reserved `session` value marking a message payload as a multicast
/// envelope rather than a plain byte buffer.
pub const SESSION_MULTICAST: Session = -1;

/// Sessions allocated by a context wrap back to 1 just before reaching
/// this bound.
pub const SESSION_MAX: Session = 0x7fff_ffff;
