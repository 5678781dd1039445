//! MySQL storage backend.
//!
//! Upserts use `ON DUPLICATE KEY UPDATE`, which fires on any unique key; the
//! tables carry no unique key besides their primary key.

use diesel::MysqlConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations};
use tracing::info;

use crate::adapter::outbound::sql::{
    connect_pool, impl_sql_stores, redact, run_migrations, SqlStorage,
};
use crate::domain::StorageKind;
use crate::error::Result;
use crate::infrastructure::config::storage::RelationalConfig;

pub const DEFAULT_PORT: u16 = 3306;

/// Embedded migrations compiled from `migrations/mysql`.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/mysql");

/// MySQL-backed storage.
pub type MysqlStorage = SqlStorage<MysqlConnection>;

impl SqlStorage<MysqlConnection> {
    /// Connect to the server described by `config`, applying migrations if enabled.
    ///
    /// Blocks while connections are opened; call from a blocking context.
    ///
    /// # Errors
    /// Returns an error if the url is invalid, the server is unreachable, or a
    /// migration fails.
    pub fn connect(config: &RelationalConfig) -> Result<Self> {
        let url = config.connection_url("mysql", DEFAULT_PORT)?;
        let pool = connect_pool::<MysqlConnection>(&url, config)?;
        if config.run_migrations {
            let applied = run_migrations(&pool, MIGRATIONS)?;
            info!(url = %redact(&url), applied, "mysql migrations applied");
        }
        Ok(Self::from_pool(pool, StorageKind::Mysql))
    }
}

impl_sql_stores!(MysqlConnection, duplicate_key, deferred);
