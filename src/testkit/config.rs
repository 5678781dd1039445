//! Canonical test configurations.

use std::path::Path;

use crate::infrastructure::config::storage::{SqliteConfig, StorageConfig};

/// SQLite configuration for a database file at `path`.
pub fn sqlite(path: &Path) -> StorageConfig {
    StorageConfig::Sqlite(SqliteConfig {
        busy_timeout_ms: 1_000,
        connection_timeout_secs: 2,
        ..SqliteConfig::at(path.to_string_lossy())
    })
}

/// TOML document selecting the in-memory backend.
pub fn memory_toml() -> String {
    "[logging]\nlevel = \"warn\"\n\n[storage]\ntype = \"memory\"\n".to_string()
}

/// TOML document selecting a SQLite database file at `path`.
pub fn sqlite_toml(path: &Path) -> String {
    format!(
        "[logging]\nlevel = \"warn\"\n\n[storage]\ntype = \"sqlite\"\npath = {:?}\n",
        path.to_string_lossy()
    )
}
