//! Domain identifier types with proper encapsulation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Cluster node identifier - newtype for type safety.
///
/// The inner String is private to ensure all construction goes through
/// the defined constructors. Ordering is lexical so sets of ids are stable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AllocationId(String);

impl AllocationId {
    /// Create a new `AllocationId` from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random allocation id for a node that has none configured.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the allocation ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check the non-empty precondition every store operation relies on.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidArgument`] for an empty or blank id.
    pub fn ensure_valid(&self) -> Result<(), StoreError> {
        if self.0.trim().is_empty() {
            return Err(StoreError::InvalidArgument(
                "allocation id must not be empty".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AllocationId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for AllocationId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
