//! Diesel-backed relational storage shared by every SQL dialect.
//!
//! [`SqlStorage`] owns an r2d2 connection pool. Each operation checks out a
//! connection on the blocking thread pool so Diesel never stalls the async
//! runtime. Store trait implementations are generated per connection type by
//! [`impl_sql_stores`] since upsert syntax differs between dialects.
//!
//! # Cancellation
//!
//! Dropping an operation's future trips a [`CancellationToken`] through a drop
//! guard. Transactions check the token before every step and before commit,
//! and return [`StoreError::Cancelled`], which rolls the transaction back.

pub mod model;
pub mod schema;
pub(crate) mod stores;

use std::time::Duration;

use async_trait::async_trait;
use diesel::r2d2::{ConnectionManager, Pool, R2D2Connection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::domain::StorageKind;
use crate::error::{Error, Result, StoreError};
use crate::infrastructure::config::storage::RelationalConfig;
use crate::port::outbound::store::{
    AllocationStore, PresenceStore, ResourceStore, StorageBackend, UserStore,
};

pub(crate) use stores::impl_sql_stores;

/// Connection pool type for a Diesel connection.
pub type DbPool<C> = Pool<ConnectionManager<C>>;

/// Relational backend over one pooled Diesel connection type.
///
/// The pool is dropped on shutdown; later operations fail with
/// [`StoreError::Closed`].
pub struct SqlStorage<C>
where
    C: R2D2Connection + Send + 'static,
{
    pool: RwLock<Option<DbPool<C>>>,
    kind: StorageKind,
}

impl<C> SqlStorage<C>
where
    C: R2D2Connection + Send + 'static,
{
    /// Wrap an already configured pool.
    #[must_use]
    pub fn from_pool(pool: DbPool<C>, kind: StorageKind) -> Self {
        Self {
            pool: RwLock::new(Some(pool)),
            kind,
        }
    }

    /// A handle to the connection pool, or `None` once shut down.
    #[must_use]
    pub fn pool(&self) -> Option<DbPool<C>> {
        self.pool.read().clone()
    }

    /// Run `f` with a pooled connection on the blocking thread pool.
    ///
    /// Failures are tagged with `operation` and `target`.
    pub(crate) async fn run<T, F>(&self, operation: &'static str, target: &str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut C, &CancellationToken) -> std::result::Result<T, StoreError>
            + Send
            + 'static,
    {
        self.blocking(f)
            .await
            .map_err(|source| Error::store(operation, target, source))
    }

    async fn blocking<T, F>(&self, f: F) -> std::result::Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut C, &CancellationToken) -> std::result::Result<T, StoreError>
            + Send
            + 'static,
    {
        let pool = self.pool().ok_or(StoreError::Closed)?;
        let token = CancellationToken::new();
        let cancel = token.clone();
        // Trips the token if this future is dropped before the task finishes.
        let guard = token.drop_guard();

        let outcome = tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| StoreError::Connection(e.to_string()))?;
            f(&mut *conn, &cancel)
        })
        .await;

        let _ = guard.disarm();
        outcome.map_err(|e| StoreError::Task(e.to_string()))?
    }
}

/// Abort the surrounding transaction if the caller went away.
pub(crate) fn checkpoint(cancel: &CancellationToken) -> std::result::Result<(), StoreError> {
    if cancel.is_cancelled() {
        return Err(StoreError::Cancelled);
    }
    Ok(())
}

/// Open a pool for a networked engine.
///
/// # Errors
/// Returns an error if the initial connections cannot be opened.
#[cfg_attr(not(any(feature = "mysql", feature = "postgres")), allow(dead_code))]
pub(crate) fn connect_pool<C>(url: &str, config: &RelationalConfig) -> Result<DbPool<C>>
where
    C: R2D2Connection + Send + 'static,
{
    let manager = ConnectionManager::<C>::new(url);
    Pool::builder()
        .max_size(config.pool_size)
        .connection_timeout(Duration::from_secs(config.connection_timeout_secs))
        .build(manager)
        .map_err(|e| Error::store("connect", redact(url), StoreError::Connection(e.to_string())))
}

/// `url` with any password removed, for logs and error targets.
#[cfg_attr(not(any(feature = "mysql", feature = "postgres")), allow(dead_code))]
pub(crate) fn redact(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            let _ = parsed.set_password(None);
            parsed.into()
        }
        Err(_) => "<invalid url>".to_string(),
    }
}

/// Apply every pending embedded migration. Returns how many ran.
///
/// # Errors
/// Returns an error if a connection cannot be checked out or a migration fails.
pub fn run_migrations<C>(pool: &DbPool<C>, migrations: EmbeddedMigrations) -> Result<usize>
where
    C: R2D2Connection + MigrationHarness<<C as diesel::Connection>::Backend> + Send + 'static,
{
    let mut conn = pool
        .get()
        .map_err(|e| Error::store("run_migrations", "", StoreError::Connection(e.to_string())))?;
    let applied = conn
        .run_pending_migrations(migrations)
        .map_err(|e| Error::store("run_migrations", "", StoreError::Migration(e.to_string())))?;
    Ok(applied.len())
}

#[async_trait]
impl<C> StorageBackend for SqlStorage<C>
where
    C: R2D2Connection + Send + 'static,
    Self: AllocationStore + PresenceStore + ResourceStore + UserStore,
{
    fn kind(&self) -> StorageKind {
        self.kind
    }

    fn is_cluster_compatible(&self) -> bool {
        self.kind.is_cluster_compatible()
    }

    async fn shutdown(&self) -> Result<()> {
        // Operations already running hold their own pool handle; the last
        // of them to finish closes the connections.
        let Some(pool) = self.pool.write().take() else {
            return Ok(());
        };
        let state = pool.state();
        drop(pool);
        info!(
            backend = %self.kind,
            connections = state.connections,
            idle = state.idle_connections,
            "storage backend shut down"
        );
        Ok(())
    }
}
