//! SQLite storage backend.
//!
//! Same tables and cascade as the networked engines, but the database file is
//! local to one host, so this backend is never cluster compatible.

pub mod connection;

use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations};
use tracing::info;

use crate::adapter::outbound::sql::{impl_sql_stores, run_migrations, SqlStorage};
use crate::domain::StorageKind;
use crate::error::Result;
use crate::infrastructure::config::storage::SqliteConfig;

/// Embedded migrations compiled from `migrations/sqlite`.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/sqlite");

/// SQLite-backed storage.
pub type SqliteStorage = SqlStorage<SqliteConnection>;

impl SqlStorage<SqliteConnection> {
    /// Open the database described by `config`, applying migrations if enabled.
    ///
    /// Blocks while connections are opened; call from a blocking context.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn connect(config: &SqliteConfig) -> Result<Self> {
        let pool = connection::create_pool(config)?;
        if config.run_migrations {
            let applied = run_migrations(&pool, MIGRATIONS)?;
            info!(path = %config.path, applied, "sqlite migrations applied");
        }
        Ok(Self::from_pool(pool, StorageKind::Sqlite))
    }
}

impl_sql_stores!(SqliteConnection, on_conflict, immediate);
