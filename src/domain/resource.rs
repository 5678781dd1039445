//! Resource bindings for live sessions.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::id::AllocationId;
use super::timestamp_now;

/// A session resource bound on a specific cluster node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub username: String,
    pub resource: String,
    pub allocation_id: AllocationId,
    pub priority: i16,
    pub updated_at: NaiveDateTime,
}

impl Resource {
    pub fn new(
        username: impl Into<String>,
        resource: impl Into<String>,
        allocation_id: AllocationId,
    ) -> Self {
        Self {
            username: username.into(),
            resource: resource.into(),
            allocation_id,
            priority: 0,
            updated_at: timestamp_now(),
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i16) -> Self {
        self.priority = priority;
        self
    }
}
