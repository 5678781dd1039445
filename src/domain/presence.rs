//! Presence records for connected resources.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::id::AllocationId;
use super::timestamp_now;

/// Availability of one connected resource, owned by the node serving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    pub username: String,
    pub resource: String,
    /// Node that holds the session; the record dies with it.
    pub allocation_id: AllocationId,
    pub available: bool,
    pub priority: i16,
    pub status: Option<String>,
    pub updated_at: NaiveDateTime,
}

impl Presence {
    /// An available presence with default priority.
    pub fn new(
        username: impl Into<String>,
        resource: impl Into<String>,
        allocation_id: AllocationId,
    ) -> Self {
        Self {
            username: username.into(),
            resource: resource.into(),
            allocation_id,
            available: true,
            priority: 0,
            status: None,
            updated_at: timestamp_now(),
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i16) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}
