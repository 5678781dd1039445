use std::sync::Arc;

use diesel::prelude::*;
use stowage::adapter::outbound::sqlite::SqliteStorage;
use stowage::infrastructure::config::storage::StorageConfig;
use stowage::testkit;
use tempfile::TempDir;

/// Temporary SQLite-backed storage for integration tests.
pub struct TempDb {
    _dir: TempDir,
    storage: Arc<SqliteStorage>,
}

impl TempDb {
    pub fn create() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let StorageConfig::Sqlite(config) = testkit::config::sqlite(&dir.path().join("stowage.db"))
        else {
            unreachable!("testkit::config::sqlite builds a sqlite config");
        };
        let storage = SqliteStorage::connect(&config).expect("open sqlite storage");
        Self {
            _dir: dir,
            storage: Arc::new(storage),
        }
    }

    pub fn storage(&self) -> Arc<SqliteStorage> {
        Arc::clone(&self.storage)
    }

    /// Run raw SQL against the database, e.g. to install a trigger.
    pub fn execute(&self, sql: &str) {
        let pool = self.storage.pool().expect("storage is open");
        let mut conn = pool.get().expect("get sqlite connection");
        diesel::sql_query(sql)
            .execute(&mut conn)
            .expect("execute sql");
    }
}
