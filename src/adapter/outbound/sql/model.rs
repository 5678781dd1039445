//! Database model types for Diesel ORM.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use super::schema::{allocations, presences, resources, users};
use crate::domain::{Allocation, AllocationId, Presence, Resource, User};

/// Database row for an allocation.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = allocations)]
pub struct AllocationRow {
    pub id: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<AllocationRow> for Allocation {
    fn from(row: AllocationRow) -> Self {
        Self {
            id: AllocationId::from(row.id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Database row for a presence.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = presences)]
pub struct PresenceRow {
    pub username: String,
    pub resource: String,
    pub allocation_id: String,
    pub available: bool,
    pub priority: i16,
    pub status: Option<String>,
    pub updated_at: NaiveDateTime,
}

impl PresenceRow {
    /// Row for `presence`, stamped with the write time.
    pub fn stamped(presence: &Presence, now: NaiveDateTime) -> Self {
        Self {
            username: presence.username.clone(),
            resource: presence.resource.clone(),
            allocation_id: presence.allocation_id.to_string(),
            available: presence.available,
            priority: presence.priority,
            status: presence.status.clone(),
            updated_at: now,
        }
    }
}

impl From<PresenceRow> for Presence {
    fn from(row: PresenceRow) -> Self {
        Self {
            username: row.username,
            resource: row.resource,
            allocation_id: AllocationId::from(row.allocation_id),
            available: row.available,
            priority: row.priority,
            status: row.status,
            updated_at: row.updated_at,
        }
    }
}

/// Database row for a resource binding.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = resources)]
pub struct ResourceRow {
    pub username: String,
    pub resource: String,
    pub allocation_id: String,
    pub priority: i16,
    pub updated_at: NaiveDateTime,
}

impl ResourceRow {
    /// Row for `resource`, stamped with the write time.
    pub fn stamped(resource: &Resource, now: NaiveDateTime) -> Self {
        Self {
            username: resource.username.clone(),
            resource: resource.resource.clone(),
            allocation_id: resource.allocation_id.to_string(),
            priority: resource.priority,
            updated_at: now,
        }
    }
}

impl From<ResourceRow> for Resource {
    fn from(row: ResourceRow) -> Self {
        Self {
            username: row.username,
            resource: row.resource,
            allocation_id: AllocationId::from(row.allocation_id),
            priority: row.priority,
            updated_at: row.updated_at,
        }
    }
}

/// Database row for a user.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = users)]
pub struct UserRow {
    pub username: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            username: row.username,
            password_hash: row.password_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
