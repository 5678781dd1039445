//! The storage facade handed to the rest of a node.
//!
//! [`Storage`] is built once from configuration, owns the selected backend,
//! and exposes every store operation by forwarding to it. The
//! cluster-compatibility flag is captured at construction and never changes.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::domain::{Allocation, AllocationId, Presence, Resource, StorageKind, User};
use crate::error::Result;
use crate::infrastructure::config::storage::StorageConfig;
use crate::infrastructure::factory::persistence::build_backend;
use crate::port::outbound::store::{
    AllocationStore, PresenceStore, ResourceStore, StorageBackend, UserStore,
};

/// Handle to the configured persistence engine.
///
/// Cheap to clone; clones share the backend. [`Storage::shutdown`] consumes
/// the handle it is called on, other clones observe a closed backend.
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn StorageBackend>,
    kind: StorageKind,
    cluster_compatible: bool,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("kind", &self.kind)
            .field("cluster_compatible", &self.cluster_compatible)
            .finish_non_exhaustive()
    }
}

/// An allocation with everything it owns, as shown by operators.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationReport {
    pub allocation: Allocation,
    pub presences: Vec<Presence>,
    pub resources: Vec<Resource>,
}

impl Storage {
    /// Build the backend selected by `config` and bind every store to it.
    ///
    /// # Errors
    /// Fails with a configuration error if the engine was not compiled in, or
    /// with a store error if it cannot be reached or migrated.
    pub async fn initialize(config: &StorageConfig) -> Result<Self> {
        config.validate()?;
        let backend = build_backend(config).await?;
        let storage = Self::from_backend(backend);
        info!(
            backend = %storage.kind,
            cluster_compatible = storage.cluster_compatible,
            "storage initialized"
        );
        Ok(storage)
    }

    /// Wrap an already built backend.
    #[must_use]
    pub fn from_backend(backend: Arc<dyn StorageBackend>) -> Self {
        let kind = backend.kind();
        let cluster_compatible = backend.is_cluster_compatible();
        Self {
            backend,
            kind,
            cluster_compatible,
        }
    }

    #[must_use]
    pub fn kind(&self) -> StorageKind {
        self.kind
    }

    /// Whether cluster membership can rely on this storage.
    #[must_use]
    pub fn is_cluster_compatible(&self) -> bool {
        self.cluster_compatible
    }

    /// A node's record with its presences and resources, or `None` if unknown.
    ///
    /// # Errors
    /// Propagates backend failures.
    pub async fn allocation_report(&self, id: &AllocationId) -> Result<Option<AllocationReport>> {
        let Some(allocation) = self.backend.fetch_allocation(id).await? else {
            return Ok(None);
        };
        let presences = self.backend.fetch_allocation_presences(id).await?;
        let resources = self.backend.fetch_allocation_resources(id).await?;
        Ok(Some(AllocationReport {
            allocation,
            presences,
            resources,
        }))
    }

    /// Release the backend. Later operations through any clone fail with
    /// [`StoreError::Closed`](crate::error::StoreError::Closed).
    ///
    /// # Errors
    /// Propagates the backend's shutdown failure.
    pub async fn shutdown(self) -> Result<()> {
        self.backend.shutdown().await?;
        info!(backend = %self.kind, "storage shut down");
        Ok(())
    }
}

#[async_trait]
impl AllocationStore for Storage {
    async fn register_allocation(&self, id: &AllocationId) -> Result<()> {
        self.backend.register_allocation(id).await
    }

    async fn unregister_allocation(&self, id: &AllocationId) -> Result<()> {
        self.backend.unregister_allocation(id).await
    }

    async fn fetch_allocations(&self) -> Result<BTreeSet<AllocationId>> {
        self.backend.fetch_allocations().await
    }

    async fn fetch_allocation(&self, id: &AllocationId) -> Result<Option<Allocation>> {
        self.backend.fetch_allocation(id).await
    }
}

#[async_trait]
impl PresenceStore for Storage {
    async fn upsert_presence(&self, presence: &Presence) -> Result<()> {
        self.backend.upsert_presence(presence).await
    }

    async fn fetch_presence(&self, username: &str, resource: &str) -> Result<Option<Presence>> {
        self.backend.fetch_presence(username, resource).await
    }

    async fn fetch_presences(&self, username: &str) -> Result<Vec<Presence>> {
        self.backend.fetch_presences(username).await
    }

    async fn delete_presence(&self, username: &str, resource: &str) -> Result<bool> {
        self.backend.delete_presence(username, resource).await
    }

    async fn fetch_allocation_presences(
        &self,
        allocation_id: &AllocationId,
    ) -> Result<Vec<Presence>> {
        self.backend.fetch_allocation_presences(allocation_id).await
    }
}

#[async_trait]
impl ResourceStore for Storage {
    async fn upsert_resource(&self, resource: &Resource) -> Result<()> {
        self.backend.upsert_resource(resource).await
    }

    async fn fetch_resource(&self, username: &str, resource: &str) -> Result<Option<Resource>> {
        self.backend.fetch_resource(username, resource).await
    }

    async fn fetch_resources(&self, username: &str) -> Result<Vec<Resource>> {
        self.backend.fetch_resources(username).await
    }

    async fn delete_resource(&self, username: &str, resource: &str) -> Result<bool> {
        self.backend.delete_resource(username, resource).await
    }

    async fn fetch_allocation_resources(
        &self,
        allocation_id: &AllocationId,
    ) -> Result<Vec<Resource>> {
        self.backend.fetch_allocation_resources(allocation_id).await
    }
}

#[async_trait]
impl UserStore for Storage {
    async fn upsert_user(&self, user: &User) -> Result<()> {
        self.backend.upsert_user(user).await
    }

    async fn fetch_user(&self, username: &str) -> Result<Option<User>> {
        self.backend.fetch_user(username).await
    }

    async fn delete_user(&self, username: &str) -> Result<bool> {
        self.backend.delete_user(username).await
    }

    async fn user_exists(&self, username: &str) -> Result<bool> {
        self.backend.user_exists(username).await
    }
}
