//! Remote-node routing. A real deployment swaps in a harbor that owns a
//! wire connection to its sibling nodes; [`LocalHarbor`] is the default
//! a single-node deployment registers instead, where there is never
//! anything to route remotely.

use dashmap::DashMap;
use skynet_process::{GlobalName, Handle, Harbor, RemoteMessage, Session};

/// Single-node harbor: every handle is local, every global name
/// registration is recorded only so it can be queried back, and remote
/// routing attempts are logged rather than silently swallowed.
pub struct LocalHarbor {
    names: DashMap<String, Handle>,
}

impl LocalHarbor {
    pub fn new() -> Self {
        Self {
            names: DashMap::new(),
        }
    }

    /// The handle last registered under `name`, if any. Exposed for
    /// diagnostics and tests; production multi-node routing would
    /// instead consult this to answer lookups from other nodes.
    pub fn lookup(&self, name: &str) -> Option<Handle> {
        self.names.get(name).map(|entry| *entry.value())
    }
}

impl Default for LocalHarbor {
    fn default() -> Self {
        Self::new()
    }
}

impl Harbor for LocalHarbor {
    fn is_remote(&self, _handle: Handle) -> bool {
        false
    }

    fn send(&self, remote: RemoteMessage, source: Handle, session: Session) {
        log::warn!(
            "dropped message from {source:08x} (session {session}): no remote route for {:?}",
            remote.destination
        );
    }

    fn register(&self, name: GlobalName, handle: Handle) {
        self.names.insert(name.as_str().into_owned(), handle);
    }

    fn kill_by_name(&self, _name: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_remote_is_always_false_on_a_single_node() {
        let harbor = LocalHarbor::new();
        assert!(!harbor.is_remote(0x0200_0001));
    }

    #[test]
    fn register_then_lookup_round_trips() {
        let harbor = LocalHarbor::new();
        harbor.register(GlobalName::new("launcher"), 7);
        assert_eq!(harbor.lookup("launcher"), Some(7));
    }

    #[test]
    fn kill_by_name_never_finds_a_route() {
        let harbor = LocalHarbor::new();
        assert!(!harbor.kill_by_name("anything"));
    }

    #[test]
    fn send_does_not_panic_without_a_route() {
        let harbor = LocalHarbor::new();
        harbor.send(
            RemoteMessage {
                destination: skynet_process::RemoteDestination::Handle(5),
                message: vec![1, 2, 3],
            },
            1,
            1,
        );
    }
}
