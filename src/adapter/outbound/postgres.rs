//! PostgreSQL storage backend.

use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations};
use tracing::info;

use crate::adapter::outbound::sql::{
    connect_pool, impl_sql_stores, redact, run_migrations, SqlStorage,
};
use crate::domain::StorageKind;
use crate::error::Result;
use crate::infrastructure::config::storage::RelationalConfig;

/// Port used when neither `url` nor `port` names one.
pub const DEFAULT_PORT: u16 = 5432;

/// Embedded migrations compiled from `migrations/postgres`.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/postgres");

/// PostgreSQL-backed storage.
pub type PostgresStorage = SqlStorage<PgConnection>;

impl SqlStorage<PgConnection> {
    /// Connect to the server described by `config`, applying migrations if enabled.
    ///
    /// Blocks while connections are opened; call from a blocking context.
    ///
    /// # Errors
    /// Returns an error if the url is invalid, the server is unreachable, or a
    /// migration fails.
    pub fn connect(config: &RelationalConfig) -> Result<Self> {
        let url = config.connection_url("postgres", DEFAULT_PORT)?;
        let pool = connect_pool::<PgConnection>(&url, config)?;
        if config.run_migrations {
            let applied = run_migrations(&pool, MIGRATIONS)?;
            info!(url = %redact(&url), applied, "postgresql migrations applied");
        }
        Ok(Self::from_pool(pool, StorageKind::Postgresql))
    }
}

impl_sql_stores!(PgConnection, on_conflict, deferred);
