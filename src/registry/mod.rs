// src/registry/mod.rs
mod backend;

pub use backend::{Address, Backend};

use crate::error::RouterError;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::sync::{Arc, Mutex};

/// Owns the set of known backends. Registration order is preserved so that
/// round-robin rotation is deterministic.
///
/// Writers serialize on an internal mutex and publish a fresh ordered list
/// through an `ArcSwap`, so `list()` never blocks on a concurrent
/// register/deregister.
pub struct Registry {
    by_id: DashMap<String, Arc<Backend>>,
    ordered: ArcSwap<Vec<Arc<Backend>>>,
    write_lock: Mutex<()>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
            ordered: ArcSwap::from_pointee(Vec::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Register a backend, assigning it a fresh id. The backend stays
    /// ineligible for selection until its first health report arrives.
    pub fn register(&self, address: Address) -> Result<Arc<Backend>, RouterError> {
        // A poisoned guard is still usable: the lock only fences the
        // check-then-publish sequence, it protects no data of its own.
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let current = self.ordered.load_full();
        if current.iter().any(|b| b.address == address) {
            return Err(RouterError::DuplicateBackend(address.to_string()));
        }

        let backend = Arc::new(Backend::new(address));
        let mut next = (*current).clone();
        next.push(backend.clone());

        self.by_id.insert(backend.id.clone(), backend.clone());
        self.ordered.store(Arc::new(next));

        tracing::info!(id = %backend.id, address = %backend.address, "registered backend");
        Ok(backend)
    }

    /// Remove a backend. Selections that already picked this id complete
    /// normally; there is no retroactive cancellation.
    pub fn deregister(&self, id: &str) -> Result<Arc<Backend>, RouterError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let (_, backend) = self
            .by_id
            .remove(id)
            .ok_or_else(|| RouterError::UnknownBackend(id.to_string()))?;

        let current = self.ordered.load_full();
        let next: Vec<Arc<Backend>> = current.iter().filter(|b| b.id != id).cloned().collect();
        self.ordered.store(Arc::new(next));

        tracing::info!(id = %id, "deregistered backend");
        Ok(backend)
    }

    /// Snapshot of all backends in registration order.
    pub fn list(&self) -> Arc<Vec<Arc<Backend>>> {
        self.ordered.load_full()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Backend>> {
        self.by_id.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_address_is_rejected() {
        let registry = Registry::new();
        registry.register(Address::new("host1", 8001)).unwrap();
        let err = registry.register(Address::new("host1", 8001)).unwrap_err();
        assert!(matches!(err, RouterError::DuplicateBackend(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn same_address_may_return_after_deregistration() {
        let registry = Registry::new();
        let first = registry.register(Address::new("host1", 8001)).unwrap();
        registry.deregister(&first.id).unwrap();
        let second = registry.register(Address::new("host1", 8001)).unwrap();
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn list_preserves_registration_order() {
        let registry = Registry::new();
        let a = registry.register(Address::new("host1", 8001)).unwrap();
        let b = registry.register(Address::new("host2", 8002)).unwrap();
        let c = registry.register(Address::new("host3", 8003)).unwrap();
        registry.deregister(&b.id).unwrap();

        let ids: Vec<String> = registry.list().iter().map(|b| b.id.clone()).collect();
        assert_eq!(ids, vec![a.id.clone(), c.id.clone()]);
    }

    #[test]
    fn deregister_unknown_id_fails() {
        let registry = Registry::new();
        let err = registry.deregister("missing").unwrap_err();
        assert!(matches!(err, RouterError::UnknownBackend(_)));
    }

    #[test]
    fn registration_survives_a_poisoned_write_lock() {
        let registry = Registry::new();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = registry.write_lock.lock().unwrap();
            panic!("holder dies");
        }));

        registry.register(Address::new("host1", 8001)).unwrap();
        let err = registry.register(Address::new("host1", 8001)).unwrap_err();
        assert!(matches!(err, RouterError::DuplicateBackend(_)));
        assert_eq!(registry.len(), 1);
    }
}
