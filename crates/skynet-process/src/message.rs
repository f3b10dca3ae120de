//! The [`Message`] is what travels through a [`crate::Mailbox`]: a source
//! handle, a session, and a payload. Ownership of the payload transfers
//! into the mailbox on push and out on pop, same as the original `data`
//! pointer in a `skynet_message` — except here the compiler enforces the
//! single-owner rule instead of a manual `free`.

use std::fmt;
use std::sync::Arc;

use crate::{Handle, Session};

/// Fixed width of a harbor-routed global name registration.
pub const GLOBALNAME_LENGTH: usize = 16;

/// A name published through the harbor for remote lookup. Truncated (or
/// zero-padded) to [`GLOBALNAME_LENGTH`] bytes, matching the wire-visible
/// fixed-width format `skynet_server.c`'s `_copy_name` produces.
#[derive(Clone, Copy)]
pub struct GlobalName([u8; GLOBALNAME_LENGTH]);

impl GlobalName {
    pub fn new(name: &str) -> Self {
        let mut buf = [0u8; GLOBALNAME_LENGTH];
        let bytes = name.as_bytes();
        let n = bytes.len().min(GLOBALNAME_LENGTH);
        buf[..n].copy_from_slice(&bytes[..n]);
        Self(buf)
    }

    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(GLOBALNAME_LENGTH);
        String::from_utf8_lossy(&self.0[..end])
    }
}

impl fmt::Debug for GlobalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GlobalName").field(&self.as_str()).finish()
    }
}

/// A payload carried inside a mailbox entry.
///
/// `Bytes` is the common case (a normal send, a forward, or a timer
/// delivery). `Multicast` replaces the original's `session == MULTICAST &&
/// sz == 0` type tag with an explicit variant: the envelope is a shared,
/// reference-counted batch the multicast collaborator fans out to the
/// owning context's callback one item at a time.
#[derive(Debug)]
pub enum Payload {
    Bytes(Vec<u8>),
    Multicast(Arc<MulticastEnvelope>),
}

impl Payload {
    /// Size in bytes, as reported in drop logs. A multicast envelope has
    /// no single "size" (it is itself a batch); it reports zero, matching
    /// the original's `sz == 0` convention for multicast entries.
    pub fn len(&self) -> usize {
        match self {
            Payload::Bytes(b) => b.len(),
            Payload::Multicast(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A batch of sub-messages coalesced for one subscriber of a multicast
/// channel, delivered as a single mailbox entry to avoid waking the
/// subscriber's dispatch once per publisher.
#[derive(Debug, Default)]
pub struct MulticastEnvelope {
    pub items: Vec<(Handle, Arc<[u8]>)>,
}

/// One entry in a service's mailbox.
#[derive(Debug)]
pub struct Message {
    pub source: Handle,
    pub session: Session,
    pub payload: Payload,
}

/// Destination of a message handed off to the harbor collaborator.
#[derive(Debug, Clone, Copy)]
pub enum RemoteDestination {
    Handle(Handle),
    Name(GlobalName),
}

/// A message routed to a remote node. Ownership of `message` transfers to
/// the harbor collaborator once handed off.
#[derive(Debug)]
pub struct RemoteMessage {
    pub destination: RemoteDestination,
    pub message: Vec<u8>,
}
