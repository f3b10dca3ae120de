//! Incremental handle allocation and lookup, the way `hash-map-id` hands out
//! `u64` resource ids for lunatic — except a [`Handle`] here is process-wide
//! (a context identifier, not a per-module resource table key) and carries a
//! harbor (node) id in its high byte.
//!
//! A [`HandleMap<T>`] owns the single authoritative mapping from [`Handle`]
//! to `T` for one process. It is the handle registry collaborator described
//! by the core: `register`, `retire`, `grab` (clone out), plus local
//! `.name` binding.

use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;

/// 32-bit service identifier. High 8 bits: harbor (node) id. Low 24 bits:
/// locally-unique id within that node. Zero is reserved for "unset/self".
pub type Handle = u32;

const LOCAL_BITS: u32 = 24;
const LOCAL_MASK: u32 = (1 << LOCAL_BITS) - 1;

/// Extracts the harbor id a handle belongs to.
pub fn harbor_of(handle: Handle) -> u8 {
    (handle >> LOCAL_BITS) as u8
}

/// `true` if `handle` does not belong to `local_harbor`.
pub fn is_remote(handle: Handle, local_harbor: u8) -> bool {
    harbor_of(handle) != local_harbor
}

/// Registry mapping [`Handle`] to a value of type `T`, plus local name
/// bindings (the `.name` half of the `REG`/`NAME` commands).
///
/// `T` is expected to be cheaply cloneable (an `Arc<Context>` in practice);
/// [`grab`](HandleMap::grab) clones the stored value out rather than
/// returning a reference, so the registry's internal lock is never held
/// across a caller's use of the context.
pub struct HandleMap<T: Clone> {
    local_harbor: u8,
    next_local: AtomicU32,
    table: DashMap<Handle, T>,
    names: DashMap<String, Handle>,
}

impl<T: Clone> HandleMap<T> {
    pub fn new(local_harbor: u8) -> Self {
        Self {
            local_harbor,
            // Start at 1: 0 is reserved for "unset/self" and must never be
            // handed out as a live handle.
            next_local: AtomicU32::new(1),
            table: DashMap::new(),
            names: DashMap::new(),
        }
    }

    pub fn local_harbor(&self) -> u8 {
        self.local_harbor
    }

    /// Allocates a fresh handle and registers `value` under it.
    pub fn register(&self, value: T) -> Handle {
        loop {
            let local = self.next_local.fetch_add(1, Ordering::Relaxed) & LOCAL_MASK;
            if local == 0 {
                // Wrapped past the 24-bit space; skip the reserved zero id.
                continue;
            }
            let handle = ((self.local_harbor as u32) << LOCAL_BITS) | local;
            if let dashmap::mapref::entry::Entry::Vacant(slot) = self.table.entry(handle) {
                slot.insert(value);
                return handle;
            }
            // Extremely unlikely collision after a full wrap; keep retrying.
        }
    }

    /// Allocates a fresh handle and registers the value `f` builds from it.
    /// Used when the stored value itself needs to know its own handle at
    /// construction time (a context embedding its own id), which a plain
    /// [`register`](HandleMap::register) can't support since the handle
    /// isn't known until after the value would have to already exist.
    pub fn register_with<F: FnOnce(Handle) -> T>(&self, f: F) -> Handle {
        loop {
            let local = self.next_local.fetch_add(1, Ordering::Relaxed) & LOCAL_MASK;
            if local == 0 {
                continue;
            }
            let handle = ((self.local_harbor as u32) << LOCAL_BITS) | local;
            if let dashmap::mapref::entry::Entry::Vacant(slot) = self.table.entry(handle) {
                slot.insert(f(handle));
                return handle;
            }
        }
    }

    /// Grabs a clone of the value registered under `handle`, or `None` if it
    /// has been retired (or never existed).
    pub fn grab(&self, handle: Handle) -> Option<T> {
        self.table.get(&handle).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.table.contains_key(&handle)
    }

    /// Logically removes `handle` from the registry, returning the value
    /// that was stored there. Outstanding clones obtained via `grab` (or
    /// held directly by a caller) keep living until they too are dropped.
    pub fn retire(&self, handle: Handle) -> Option<T> {
        self.table.remove(&handle).map(|(_, value)| value)
    }

    /// Binds `name` to `handle`. Fails (returning `false`) if the name is
    /// already bound to a different handle.
    pub fn bind_name(&self, name: String, handle: Handle) -> bool {
        match self.names.entry(name) {
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(handle);
                true
            }
            dashmap::mapref::entry::Entry::Occupied(slot) => *slot.get() == handle,
        }
    }

    pub fn find_name(&self, name: &str) -> Option<Handle> {
        self.names.get(name).map(|entry| *entry.value())
    }

    pub fn is_remote(&self, handle: Handle) -> bool {
        is_remote(handle, self.local_harbor)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_never_hands_out_zero() {
        let map: HandleMap<i32> = HandleMap::new(0);
        let h = map.register(1);
        assert_ne!(h, 0);
    }

    #[test]
    fn register_allocates_distinct_handles() {
        let map: HandleMap<i32> = HandleMap::new(0);
        let a = map.register(1);
        let b = map.register(2);
        assert_ne!(a, b);
    }

    #[test]
    fn grab_returns_clone_until_retired() {
        let map: HandleMap<String> = HandleMap::new(0);
        let h = map.register("svc".to_string());
        assert_eq!(map.grab(h), Some("svc".to_string()));
        map.retire(h);
        assert_eq!(map.grab(h), None);
    }

    #[test]
    fn harbor_byte_is_encoded_in_handle() {
        let map: HandleMap<i32> = HandleMap::new(7);
        let h = map.register(1);
        assert_eq!(harbor_of(h), 7);
    }

    #[test]
    fn is_remote_compares_harbor_byte() {
        let local = 3u8;
        let h = (local as u32) << 24 | 5;
        assert!(!is_remote(h, local));
        assert!(is_remote(h, 4));
    }

    #[test]
    fn bind_name_rejects_clash() {
        let map: HandleMap<i32> = HandleMap::new(0);
        let a = map.register(1);
        let b = map.register(2);
        assert!(map.bind_name("svc".to_string(), a));
        assert!(!map.bind_name("svc".to_string(), b));
        assert_eq!(map.find_name("svc"), Some(a));
    }

    #[test]
    fn bind_name_is_idempotent_for_same_handle() {
        let map: HandleMap<i32> = HandleMap::new(0);
        let a = map.register(1);
        assert!(map.bind_name("svc".to_string(), a));
        assert!(map.bind_name("svc".to_string(), a));
    }

    #[test]
    fn register_with_sees_its_own_allocated_handle() {
        let map: HandleMap<Handle> = HandleMap::new(0);
        let h = map.register_with(|h| h);
        assert_eq!(map.grab(h), Some(h));
    }

    #[test]
    fn retire_removes_from_table_but_not_names() {
        let map: HandleMap<i32> = HandleMap::new(0);
        let h = map.register(1);
        map.bind_name("svc".to_string(), h);
        map.retire(h);
        assert_eq!(map.grab(h), None);
        // The name binding is a separate, explicit concern; retiring a
        // handle does not implicitly unbind its name.
        assert_eq!(map.find_name("svc"), Some(h));
    }
}
