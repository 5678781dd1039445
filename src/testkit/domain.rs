//! Builders for domain records used across tests.

use crate::domain::{AllocationId, Presence, Resource, User};
use crate::error::Result;
use crate::port::outbound::store::StorageBackend;

/// Create an [`AllocationId`] from a string.
pub fn allocation(id: &str) -> AllocationId {
    AllocationId::new(id)
}

/// Available presence of `username` on `resource`, owned by `owner`.
pub fn presence(username: &str, resource: &str, owner: &AllocationId) -> Presence {
    Presence::new(username, resource, owner.clone())
}

/// Resource binding of `username` on `resource`, owned by `owner`.
pub fn resource(username: &str, resource: &str, owner: &AllocationId) -> Resource {
    Resource::new(username, resource, owner.clone())
}

/// User with a placeholder password hash.
pub fn user(username: &str) -> User {
    User::new(username, format!("hash-of-{username}"))
}

/// What [`seed`] wrote, for assertions.
#[derive(Debug, Clone)]
pub struct Seeded {
    pub id: AllocationId,
    pub presences: Vec<Presence>,
    pub resources: Vec<Resource>,
}

/// Register `id` and give it `presences` presences and `resources` bindings.
///
/// Usernames are derived from the id so several seeded allocations never
/// overwrite each other.
pub async fn seed(
    store: &dyn StorageBackend,
    id: &str,
    presences: usize,
    resources: usize,
) -> Result<Seeded> {
    let id = allocation(id);
    store.register_allocation(&id).await?;

    let mut seeded = Seeded {
        id: id.clone(),
        presences: Vec::with_capacity(presences),
        resources: Vec::with_capacity(resources),
    };
    for n in 0..presences {
        let record = presence(&format!("{id}-user{n}"), "desk", &id);
        store.upsert_presence(&record).await?;
        seeded.presences.push(record);
    }
    for n in 0..resources {
        let record = resource(&format!("{id}-user{n}"), "desk", &id);
        store.upsert_resource(&record).await?;
        seeded.resources.push(record);
    }
    Ok(seeded)
}
