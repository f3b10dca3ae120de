//! The send/forward path: local delivery, harbor hand-off for remote or
//! name-only destinations, and request-session allocation.

use std::sync::Arc;

use crate::address::{self, Address};
use crate::context::Context;
use crate::kernel::Kernel;
use crate::message::{GlobalName, Message, Payload, RemoteDestination, RemoteMessage};
use crate::{Handle, Session};

/// Legacy flag value from the buffer-ownership flags the original wire
/// format carried. Kept only as a documented constant: this crate
/// expresses copy-vs-move through [`SendData`]'s variants instead of a
/// runtime flag check.
pub const DONTCOPY: u32 = 0x10000;

/// The payload handed to [`send`]/[`sendname`]. Replaces a boolean
/// "don't copy" flag with a type-level choice: `Owned` transfers a
/// buffer the caller no longer needs, `Borrowed` copies out of a buffer
/// the caller keeps, and `None` carries no payload (e.g. most command
/// replies).
pub enum SendData<'a> {
    Owned(Vec<u8>),
    Borrowed(&'a [u8]),
    None,
}

impl<'a> SendData<'a> {
    fn materialize(self) -> Vec<u8> {
        match self {
            SendData::Owned(bytes) => bytes,
            SendData::Borrowed(bytes) => bytes.to_vec(),
            SendData::None => Vec::new(),
        }
    }
}

/// Allocates `session` from `source`'s context when negative (the
/// "give me a fresh session" sentinel), independent of whether `source`
/// itself turns out to be a live local handle.
fn resolve_session(kernel: &Kernel, source: Handle, session: Session) -> Session {
    if session < 0 {
        kernel.grab(source).map(|ctx| ctx.next_session()).unwrap_or(0)
    } else {
        session
    }
}

/// Sends `data` from `source` to `destination`, returning the session
/// actually used, or `None` if `destination` is local but no longer
/// registered.
pub fn send(
    kernel: &Arc<Kernel>,
    source: Handle,
    destination: Handle,
    session: Session,
    data: SendData,
) -> Option<Session> {
    let session = resolve_session(kernel, source, session);
    let payload = data.materialize();

    if kernel.is_remote(destination) {
        kernel.harbor().send(
            RemoteMessage {
                destination: RemoteDestination::Handle(destination),
                message: payload,
            },
            source,
            session,
        );
        return Some(session);
    }

    let message = Message {
        source,
        session,
        payload: Payload::Bytes(payload),
    };
    if kernel.push(destination, message) {
        Some(session)
    } else {
        None
    }
}

/// Sends `data` from `source` to the destination named `name`: an
/// explicit `:hex` handle, a locally bound name, or — failing both — a
/// name routed through the harbor as a global lookup. Always returns
/// `Some` for the global-name case, since the harbor accepts the send
/// without confirming the name resolves to a live remote context.
pub fn sendname(
    kernel: &Arc<Kernel>,
    source: Handle,
    name: &str,
    session: Session,
    data: SendData,
) -> Option<Session> {
    match address::parse_address(name) {
        Address::Handle(handle) => send(kernel, source, handle, session, data),
        Address::Name(local_name) => {
            if let Some(handle) = kernel.find_name(&local_name) {
                return send(kernel, source, handle, session, data);
            }
            let session = resolve_session(kernel, source, session);
            kernel.harbor().send(
                RemoteMessage {
                    destination: RemoteDestination::Name(GlobalName::new(&local_name)),
                    message: data.materialize(),
                },
                source,
                session,
            );
            Some(session)
        }
    }
}

/// Records `destination` as where the buffer the in-flight callback is
/// about to hand back (via `CallbackAction::Return`) should be routed,
/// instead of simply being dropped once the callback returns.
pub fn forward(ctx: &Arc<Context>, destination: Handle) {
    ctx.set_forward(destination);
}

/// Pushes a synthesized message directly onto `ctx`'s own mailbox,
/// bypassing the destination resolution and session normalization
/// `send`/`sendname` perform. The fast path a module's `init` uses to
/// inject a message to itself before its context has any other way to
/// reach it.
pub fn context_send(ctx: &Arc<Context>, source: Handle, session: Session, data: SendData) {
    let message = Message {
        source,
        session,
        payload: Payload::Bytes(data.materialize()),
    };
    if ctx.mailbox().push(message) {
        if let Some(kernel) = ctx.kernel() {
            kernel.ready_queue().push(ctx.mailbox().clone());
        }
    }
}
