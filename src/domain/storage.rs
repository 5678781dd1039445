//! Backend kinds and their coordination capabilities.

use std::fmt;

use serde::Serialize;

/// The persistence engine behind a storage handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Mysql,
    Postgresql,
    /// Single-host relational engine; the database file is local to one machine.
    Sqlite,
    /// Process-local maps.
    Memory,
}

impl StorageKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            StorageKind::Mysql => "mysql",
            StorageKind::Postgresql => "postgresql",
            StorageKind::Sqlite => "sqlite",
            StorageKind::Memory => "memory",
        }
    }

    /// Whether state written through this engine is visible to every node.
    ///
    /// Only a shared networked database qualifies; cluster membership
    /// features must stay off otherwise.
    #[must_use]
    pub const fn is_cluster_compatible(self) -> bool {
        matches!(self, StorageKind::Mysql | StorageKind::Postgresql)
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn networked_engines_are_cluster_compatible() {
        assert!(StorageKind::Mysql.is_cluster_compatible());
        assert!(StorageKind::Postgresql.is_cluster_compatible());
    }

    #[test]
    fn local_engines_are_not_cluster_compatible() {
        assert!(!StorageKind::Sqlite.is_cluster_compatible());
        assert!(!StorageKind::Memory.is_cluster_compatible());
    }

    #[test]
    fn kind_serializes_lowercase() {
        let json = serde_json::to_string(&StorageKind::Postgresql).unwrap();
        assert_eq!(json, "\"postgresql\"");
    }
}
