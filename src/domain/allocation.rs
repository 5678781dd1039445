//! Cluster node allocations and the cleanup performed when one departs.

use std::fmt;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::id::AllocationId;

/// One live cluster node.
///
/// `created_at` is stamped by the first registration and never changes;
/// `updated_at` moves forward on every heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: AllocationId,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Allocation {
    /// A freshly registered allocation.
    #[must_use]
    pub fn new(id: AllocationId, now: NaiveDateTime) -> Self {
        Self {
            id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a heartbeat.
    ///
    /// Stamps have microsecond resolution, so a heartbeat landing in the same
    /// tick as the previous one still moves `updated_at` forward by one tick.
    pub fn refresh(&mut self, now: NaiveDateTime) {
        self.updated_at = now.max(self.updated_at + Duration::microseconds(1));
    }
}

/// One deletion performed while unregistering an allocation.
///
/// Owned state goes first so that no reader can find a presence or resource
/// whose allocation row is already gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CascadeStep {
    /// Presence records owned by the allocation.
    Presences,
    /// Resource bindings owned by the allocation.
    Resources,
    /// The allocation row itself.
    Allocation,
}

impl CascadeStep {
    /// Execution order of the unregister cascade.
    pub const ORDER: [CascadeStep; 3] = [
        CascadeStep::Presences,
        CascadeStep::Resources,
        CascadeStep::Allocation,
    ];

    /// Table or collection the step deletes from.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            CascadeStep::Presences => "presences",
            CascadeStep::Resources => "resources",
            CascadeStep::Allocation => "allocations",
        }
    }
}

impl fmt::Display for CascadeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
