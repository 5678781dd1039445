//! In-memory storage backend.
//!
//! State is process-local, so this backend is never cluster compatible. All
//! collections sit behind one [`RwLock`]: the unregister cascade runs under a
//! single write lock, and an undo log restores earlier steps if a later one
//! fails, so readers only ever observe the state before or after a cascade.

mod transaction;

use std::collections::BTreeSet;

use async_trait::async_trait;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, trace};

use crate::domain::{
    timestamp_now, Allocation, AllocationId, CascadeStep, Presence, Resource, StorageKind, User,
};
use crate::error::{Error, Result, StoreError};
use crate::port::outbound::store::{
    AllocationStore, PresenceStore, ResourceStore, StorageBackend, UserStore,
};

use transaction::{MemoryState, Transaction};

/// Process-local backend used for single-node deployments and tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: RwLock<MemoryState>,
    #[cfg(any(test, feature = "testkit"))]
    fault: parking_lot::Mutex<Option<CascadeStep>>,
}

impl MemoryStorage {
    /// Create a new empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(
        &self,
        operation: &'static str,
        target: &str,
    ) -> Result<RwLockReadGuard<'_, MemoryState>> {
        let state = self.state.read();
        if state.closed {
            return Err(Error::store(operation, target, StoreError::Closed));
        }
        Ok(state)
    }

    fn write(
        &self,
        operation: &'static str,
        target: &str,
    ) -> Result<RwLockWriteGuard<'_, MemoryState>> {
        let state = self.state.write();
        if state.closed {
            return Err(Error::store(operation, target, StoreError::Closed));
        }
        Ok(state)
    }
}

#[cfg(any(test, feature = "testkit"))]
impl MemoryStorage {
    /// Make the next unregister cascade fail when it reaches `step`.
    pub fn fail_cascade_at(&self, step: CascadeStep) {
        *self.fault.lock() = Some(step);
    }

    fn check_fault(&self, step: CascadeStep) -> std::result::Result<(), StoreError> {
        let mut fault = self.fault.lock();
        if *fault == Some(step) {
            *fault = None;
            return Err(StoreError::Database(format!("injected failure at {step}")));
        }
        Ok(())
    }
}

#[cfg(not(any(test, feature = "testkit")))]
impl MemoryStorage {
    #[inline]
    fn check_fault(&self, _step: CascadeStep) -> std::result::Result<(), StoreError> {
        Ok(())
    }
}

fn session_key(username: &str, resource: &str) -> (String, String) {
    (username.to_string(), resource.to_string())
}

#[async_trait]
impl AllocationStore for MemoryStorage {
    async fn register_allocation(&self, id: &AllocationId) -> Result<()> {
        const OP: &str = "register_allocation";
        id.ensure_valid()
            .map_err(|e| Error::store(OP, id.as_str(), e))?;

        let now = timestamp_now();
        let mut state = self.write(OP, id.as_str())?;
        state
            .allocations
            .entry(id.clone())
            .and_modify(|allocation| allocation.refresh(now))
            .or_insert_with(|| Allocation::new(id.clone(), now));
        debug!(allocation_id = %id, "allocation registered");
        Ok(())
    }

    async fn unregister_allocation(&self, id: &AllocationId) -> Result<()> {
        const OP: &str = "unregister_allocation";
        id.ensure_valid()
            .map_err(|e| Error::store(OP, id.as_str(), e))?;

        let mut state = self.write(OP, id.as_str())?;
        let mut tx = Transaction::begin(&mut *state);
        for step in CascadeStep::ORDER {
            self.check_fault(step)
                .map_err(|e| Error::store(OP, id.as_str(), e))?;
            let deleted = tx.delete(step, id);
            trace!(allocation_id = %id, %step, deleted, "cascade step");
        }
        tx.commit();
        debug!(allocation_id = %id, "allocation unregistered");
        Ok(())
    }

    async fn fetch_allocations(&self) -> Result<BTreeSet<AllocationId>> {
        let state = self.read("fetch_allocations", "")?;
        Ok(state.allocations.keys().cloned().collect())
    }

    async fn fetch_allocation(&self, id: &AllocationId) -> Result<Option<Allocation>> {
        let state = self.read("fetch_allocation", id.as_str())?;
        Ok(state.allocations.get(id).cloned())
    }
}

#[async_trait]
impl PresenceStore for MemoryStorage {
    async fn upsert_presence(&self, presence: &Presence) -> Result<()> {
        let mut state = self.write("upsert_presence", &presence.username)?;
        let mut stored = presence.clone();
        stored.updated_at = timestamp_now();
        state
            .presences
            .insert(session_key(&presence.username, &presence.resource), stored);
        Ok(())
    }

    async fn fetch_presence(&self, username: &str, resource: &str) -> Result<Option<Presence>> {
        let state = self.read("fetch_presence", username)?;
        Ok(state.presences.get(&session_key(username, resource)).cloned())
    }

    async fn fetch_presences(&self, username: &str) -> Result<Vec<Presence>> {
        let state = self.read("fetch_presences", username)?;
        Ok(state
            .presences
            .values()
            .filter(|p| p.username == username)
            .cloned()
            .collect())
    }

    async fn delete_presence(&self, username: &str, resource: &str) -> Result<bool> {
        let mut state = self.write("delete_presence", username)?;
        Ok(state
            .presences
            .remove(&session_key(username, resource))
            .is_some())
    }

    async fn fetch_allocation_presences(
        &self,
        allocation_id: &AllocationId,
    ) -> Result<Vec<Presence>> {
        let state = self.read("fetch_allocation_presences", allocation_id.as_str())?;
        Ok(state
            .presences
            .values()
            .filter(|p| p.allocation_id == *allocation_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ResourceStore for MemoryStorage {
    async fn upsert_resource(&self, resource: &Resource) -> Result<()> {
        let mut state = self.write("upsert_resource", &resource.username)?;
        let mut stored = resource.clone();
        stored.updated_at = timestamp_now();
        state
            .resources
            .insert(session_key(&resource.username, &resource.resource), stored);
        Ok(())
    }

    async fn fetch_resource(&self, username: &str, resource: &str) -> Result<Option<Resource>> {
        let state = self.read("fetch_resource", username)?;
        Ok(state.resources.get(&session_key(username, resource)).cloned())
    }

    async fn fetch_resources(&self, username: &str) -> Result<Vec<Resource>> {
        let state = self.read("fetch_resources", username)?;
        Ok(state
            .resources
            .values()
            .filter(|r| r.username == username)
            .cloned()
            .collect())
    }

    async fn delete_resource(&self, username: &str, resource: &str) -> Result<bool> {
        let mut state = self.write("delete_resource", username)?;
        Ok(state
            .resources
            .remove(&session_key(username, resource))
            .is_some())
    }

    async fn fetch_allocation_resources(
        &self,
        allocation_id: &AllocationId,
    ) -> Result<Vec<Resource>> {
        let state = self.read("fetch_allocation_resources", allocation_id.as_str())?;
        Ok(state
            .resources
            .values()
            .filter(|r| r.allocation_id == *allocation_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryStorage {
    async fn upsert_user(&self, user: &User) -> Result<()> {
        let now = timestamp_now();
        let mut state = self.write("upsert_user", &user.username)?;
        state
            .users
            .entry(user.username.clone())
            .and_modify(|stored| {
                stored.password_hash = user.password_hash.clone();
                stored.updated_at = now;
            })
            .or_insert_with(|| User {
                created_at: now,
                updated_at: now,
                ..user.clone()
            });
        Ok(())
    }

    async fn fetch_user(&self, username: &str) -> Result<Option<User>> {
        let state = self.read("fetch_user", username)?;
        Ok(state.users.get(username).cloned())
    }

    async fn delete_user(&self, username: &str) -> Result<bool> {
        let mut state = self.write("delete_user", username)?;
        Ok(state.users.remove(username).is_some())
    }

    async fn user_exists(&self, username: &str) -> Result<bool> {
        let state = self.read("user_exists", username)?;
        Ok(state.users.contains_key(username))
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Memory
    }

    fn is_cluster_compatible(&self) -> bool {
        false
    }

    async fn shutdown(&self) -> Result<()> {
        let mut state = self.state.write();
        state.closed = true;
        state.clear();
        info!(backend = "memory", "storage backend shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn node(id: &str) -> AllocationId {
        AllocationId::new(id)
    }

    async fn seed(store: &MemoryStorage, id: &AllocationId) {
        store.register_allocation(id).await.unwrap();
        for user in ["alice", "bob"] {
            store
                .upsert_presence(&Presence::new(user, id.as_str(), id.clone()))
                .await
                .unwrap();
        }
        store
            .upsert_resource(&Resource::new("alice", id.as_str(), id.clone()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn register_twice_refreshes_without_duplicating() {
        let store = MemoryStorage::new();
        let id = node("node-a");

        store.register_allocation(&id).await.unwrap();
        let first = store.fetch_allocation(&id).await.unwrap().unwrap();
        store.register_allocation(&id).await.unwrap();
        let second = store.fetch_allocation(&id).await.unwrap().unwrap();

        assert_eq!(store.fetch_allocations().await.unwrap().len(), 1);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);
    }

    #[tokio::test]
    async fn back_to_back_heartbeats_always_advance() {
        let store = MemoryStorage::new();
        for round in 0..500 {
            let id = node(&format!("node-{round}"));
            store.register_allocation(&id).await.unwrap();
            store.register_allocation(&id).await.unwrap();
            let allocation = store.fetch_allocation(&id).await.unwrap().unwrap();
            assert!(
                allocation.updated_at > allocation.created_at,
                "heartbeat did not advance on round {round}"
            );
        }
    }

    #[tokio::test]
    async fn register_rejects_empty_id() {
        let store = MemoryStorage::new();
        let err = store.register_allocation(&node("")).await.unwrap_err();
        assert!(matches!(
            err.store_error(),
            Some(StoreError::InvalidArgument(_))
        ));
        assert!(store.fetch_allocations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unregister_rejects_empty_id() {
        let store = MemoryStorage::new();
        let err = store.unregister_allocation(&node("  ")).await.unwrap_err();
        assert!(matches!(
            err.store_error(),
            Some(StoreError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn unregister_removes_owned_state() {
        let store = MemoryStorage::new();
        let a = node("node-a");
        let b = node("node-b");
        seed(&store, &a).await;
        seed(&store, &b).await;

        store.unregister_allocation(&a).await.unwrap();

        assert!(store.fetch_allocation(&a).await.unwrap().is_none());
        assert!(store.fetch_allocation_presences(&a).await.unwrap().is_empty());
        assert!(store.fetch_allocation_resources(&a).await.unwrap().is_empty());
        assert_eq!(store.fetch_allocation_presences(&b).await.unwrap().len(), 2);
        assert_eq!(store.fetch_allocation_resources(&b).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unregister_unknown_allocation_succeeds() {
        let store = MemoryStorage::new();
        store.unregister_allocation(&node("ghost")).await.unwrap();
        store.unregister_allocation(&node("ghost")).await.unwrap();
    }

    #[tokio::test]
    async fn failed_cascade_step_rolls_back_earlier_steps() {
        let store = MemoryStorage::new();
        let a = node("node-a");
        seed(&store, &a).await;

        store.fail_cascade_at(CascadeStep::Resources);
        let err = store.unregister_allocation(&a).await.unwrap_err();
        assert!(matches!(err.store_error(), Some(StoreError::Database(_))));

        assert!(store.fetch_allocations().await.unwrap().contains(&a));
        assert_eq!(store.fetch_allocation_presences(&a).await.unwrap().len(), 2);
        assert_eq!(store.fetch_allocation_resources(&a).await.unwrap().len(), 1);

        // The fault is one-shot; a retry completes the cascade.
        store.unregister_allocation(&a).await.unwrap();
        assert!(store.fetch_allocations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_at_final_step_keeps_owned_state() {
        let store = MemoryStorage::new();
        let a = node("node-a");
        seed(&store, &a).await;

        store.fail_cascade_at(CascadeStep::Allocation);
        assert!(store.unregister_allocation(&a).await.is_err());

        assert_eq!(store.fetch_allocation_presences(&a).await.unwrap().len(), 2);
        assert_eq!(store.fetch_allocation_resources(&a).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_see_a_partial_cascade() {
        let store = Arc::new(MemoryStorage::new());
        let ids: Vec<AllocationId> = (0..50).map(|i| node(&format!("node-{i}"))).collect();
        for id in &ids {
            seed(&store, id).await;
        }

        let reader = {
            let store = Arc::clone(&store);
            let ids = ids.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    let live = store.fetch_allocations().await.unwrap();
                    for id in ids.iter().filter(|id| !live.contains(*id)) {
                        assert!(store.fetch_allocation_presences(id).await.unwrap().is_empty());
                        assert!(store.fetch_allocation_resources(id).await.unwrap().is_empty());
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for id in &ids {
                    store.unregister_allocation(id).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        writer.await.unwrap();
        reader.await.unwrap();
        assert!(store.fetch_allocations().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_register_and_unregister_end_in_a_clean_state() {
        let store = Arc::new(MemoryStorage::new());
        let id = node("node-a");

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = Arc::clone(&store);
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    store.register_allocation(&id).await.unwrap();
                } else {
                    store.unregister_allocation(&id).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let ids = store.fetch_allocations().await.unwrap();
        assert!(ids.len() <= 1);
        if ids.is_empty() {
            assert!(store.fetch_allocation_presences(&id).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn operations_fail_after_shutdown() {
        let store = MemoryStorage::new();
        seed(&store, &node("node-a")).await;

        store.shutdown().await.unwrap();

        let err = store.fetch_allocations().await.unwrap_err();
        assert!(matches!(err.store_error(), Some(StoreError::Closed)));
        let err = store.register_allocation(&node("node-b")).await.unwrap_err();
        assert!(matches!(err.store_error(), Some(StoreError::Closed)));
    }

    #[tokio::test]
    async fn presence_upsert_replaces_existing_record() {
        let store = MemoryStorage::new();
        let a = node("node-a");
        let b = node("node-b");

        store
            .upsert_presence(&Presence::new("alice", "desk", a.clone()))
            .await
            .unwrap();
        store
            .upsert_presence(&Presence::new("alice", "desk", b.clone()).with_priority(3))
            .await
            .unwrap();

        let presence = store.fetch_presence("alice", "desk").await.unwrap().unwrap();
        assert_eq!(presence.allocation_id, b);
        assert_eq!(presence.priority, 3);
        assert!(store.fetch_allocation_presences(&a).await.unwrap().is_empty());
        assert!(store.delete_presence("alice", "desk").await.unwrap());
        assert!(!store.delete_presence("alice", "desk").await.unwrap());
    }

    #[tokio::test]
    async fn user_upsert_keeps_creation_time() {
        let store = MemoryStorage::new();
        store.upsert_user(&User::new("alice", "hash-1")).await.unwrap();
        let first = store.fetch_user("alice").await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        store.upsert_user(&User::new("alice", "hash-2")).await.unwrap();
        let second = store.fetch_user("alice").await.unwrap().unwrap();

        assert_eq!(second.password_hash, "hash-2");
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);
        assert!(store.user_exists("alice").await.unwrap());
        assert!(store.delete_user("alice").await.unwrap());
        assert!(!store.user_exists("alice").await.unwrap());
    }

    #[test]
    fn memory_backend_is_process_local() {
        let store = MemoryStorage::new();
        assert_eq!(store.kind(), StorageKind::Memory);
        assert!(!store.is_cluster_compatible());
    }
}
