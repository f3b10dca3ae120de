//! A group is a small numbered slot holding at most one handle at a
//! time — typically the current owner of some shared resource — backing
//! the `GROUP ENTER`/`LEAVE`/`QUERY`/`CLEAR` commands.

use dashmap::DashMap;
use skynet_process::{GroupRegistry, Handle};

pub struct GroupMap {
    table: DashMap<i32, Handle>,
}

impl GroupMap {
    pub fn new() -> Self {
        Self {
            table: DashMap::new(),
        }
    }
}

impl Default for GroupMap {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupRegistry for GroupMap {
    fn enter(&self, group: i32, handle: Handle) {
        self.table.insert(group, handle);
    }

    /// Vacates `group`, but only if `handle` is still the occupant —
    /// a service that already lost the slot to someone else can't evict
    /// the new occupant by leaving late.
    fn leave(&self, group: i32, handle: Handle) {
        self.table.remove_if(&group, |_, current| *current == handle);
    }

    fn query(&self, group: i32) -> Option<Handle> {
        self.table.get(&group).map(|entry| *entry.value())
    }

    fn clear(&self, group: i32) {
        self.table.remove(&group);
    }
}
