//! SQLite connection pooling and per-connection pragmas.

use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::SqliteConnection;

use crate::adapter::outbound::sql::DbPool;
use crate::error::{Error, Result, StoreError};
use crate::infrastructure::config::storage::SqliteConfig;

/// Pragmas applied to every connection when the pool opens it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SqlitePragmas {
    pub busy_timeout_ms: u64,
    pub wal: bool,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        let mut pragmas = format!("PRAGMA busy_timeout = {};", self.busy_timeout_ms);
        if self.wal {
            pragmas.push_str(" PRAGMA journal_mode = WAL;");
        }
        conn.batch_execute(&pragmas)
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Create a connection pool for `config`.
///
/// A `:memory:` database exists only as long as its connection, so it is
/// pinned to one connection that is never recycled.
///
/// # Errors
/// Returns an error if the initial connections cannot be opened.
pub fn create_pool(config: &SqliteConfig) -> Result<DbPool<SqliteConnection>> {
    let manager = ConnectionManager::<SqliteConnection>::new(config.path.as_str());
    let in_memory = config.is_in_memory();

    let mut builder = Pool::builder()
        .connection_timeout(Duration::from_secs(config.connection_timeout_secs))
        .connection_customizer(Box::new(SqlitePragmas {
            busy_timeout_ms: config.busy_timeout_ms,
            wal: !in_memory,
        }));
    builder = if in_memory {
        builder.max_size(1).max_lifetime(None).idle_timeout(None)
    } else {
        builder.max_size(config.pool_size)
    };

    builder.build(manager).map_err(|e| {
        Error::store(
            "connect",
            config.path.clone(),
            StoreError::Connection(e.to_string()),
        )
    })
}
