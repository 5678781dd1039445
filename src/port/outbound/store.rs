//! Persistence ports for cluster allocations and the session state they own.
//!
//! Every backend implements the full set through [`StorageBackend`]. All
//! operations are cancellable by dropping their future: a backend must either
//! finish an operation completely or leave no trace of it.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::domain::{Allocation, AllocationId, Presence, Resource, StorageKind, User};
use crate::error::Result;

/// Lifecycle of cluster node allocations.
#[async_trait]
pub trait AllocationStore: Send + Sync {
    /// Register a node, or refresh its heartbeat if it is already known.
    ///
    /// `created_at` is set only when the row is created. A blank id fails
    /// with [`StoreError::InvalidArgument`](crate::error::StoreError::InvalidArgument).
    async fn register_allocation(&self, id: &AllocationId) -> Result<()>;

    /// Remove a node together with every presence and resource it owns.
    ///
    /// All-or-nothing: on failure nothing has been deleted. Unknown ids
    /// succeed, since departure notifications may arrive more than once. A
    /// blank id is rejected with
    /// [`StoreError::InvalidArgument`](crate::error::StoreError::InvalidArgument),
    /// as on registration.
    async fn unregister_allocation(&self, id: &AllocationId) -> Result<()>;

    /// Distinct ids of every known node.
    async fn fetch_allocations(&self) -> Result<BTreeSet<AllocationId>>;

    /// Full record for one node.
    async fn fetch_allocation(&self, id: &AllocationId) -> Result<Option<Allocation>>;
}

/// Storage operations for presence records.
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Insert or replace the presence of `(username, resource)`.
    async fn upsert_presence(&self, presence: &Presence) -> Result<()>;

    async fn fetch_presence(&self, username: &str, resource: &str) -> Result<Option<Presence>>;

    /// Presences of every resource of a user, ordered by resource.
    async fn fetch_presences(&self, username: &str) -> Result<Vec<Presence>>;

    /// Delete one presence. Returns whether it existed.
    async fn delete_presence(&self, username: &str, resource: &str) -> Result<bool>;

    /// Presences owned by a node.
    async fn fetch_allocation_presences(
        &self,
        allocation_id: &AllocationId,
    ) -> Result<Vec<Presence>>;
}

/// Storage operations for resource bindings.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Insert or replace the binding of `(username, resource)`.
    async fn upsert_resource(&self, resource: &Resource) -> Result<()>;

    async fn fetch_resource(&self, username: &str, resource: &str) -> Result<Option<Resource>>;

    /// Bindings of every resource of a user, ordered by resource.
    async fn fetch_resources(&self, username: &str) -> Result<Vec<Resource>>;

    /// Delete one binding. Returns whether it existed.
    async fn delete_resource(&self, username: &str, resource: &str) -> Result<bool>;

    /// Bindings owned by a node.
    async fn fetch_allocation_resources(
        &self,
        allocation_id: &AllocationId,
    ) -> Result<Vec<Resource>>;
}

/// Storage operations for user accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user or replace its credentials. Keeps the original `created_at`.
    async fn upsert_user(&self, user: &User) -> Result<()>;

    async fn fetch_user(&self, username: &str) -> Result<Option<User>>;

    /// Delete a user. Returns whether it existed.
    async fn delete_user(&self, username: &str) -> Result<bool>;

    async fn user_exists(&self, username: &str) -> Result<bool>;
}

/// The full capability set a persistence engine must provide.
///
/// Adding an engine means implementing this trait once; call sites only see
/// the storage facade.
#[async_trait]
pub trait StorageBackend: AllocationStore + PresenceStore + ResourceStore + UserStore {
    /// Engine behind this backend.
    fn kind(&self) -> StorageKind;

    /// Whether state is shared by every node of the cluster.
    fn is_cluster_compatible(&self) -> bool;

    /// Release connections and in-memory state.
    ///
    /// Every operation issued afterwards fails with
    /// [`StoreError::Closed`](crate::error::StoreError::Closed).
    async fn shutdown(&self) -> Result<()>;
}
