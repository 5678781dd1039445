//! Persistence factory: builds the storage backend selected by configuration.

use std::sync::Arc;

use crate::adapter::outbound::memory::MemoryStorage;
use crate::adapter::outbound::sqlite::SqliteStorage;
use crate::error::{Error, Result, StoreError};
use crate::infrastructure::config::storage::StorageConfig;
use crate::port::outbound::store::StorageBackend;

/// Build and connect the backend named by `config`.
///
/// Relational engines are opened on the blocking thread pool since opening a
/// pool and running migrations is synchronous I/O.
///
/// # Errors
/// Returns [`ConfigError::UnsupportedBackend`](crate::error::ConfigError::UnsupportedBackend)
/// for an engine that was not compiled in, or a store error if the engine
/// cannot be reached.
pub async fn build_backend(config: &StorageConfig) -> Result<Arc<dyn StorageBackend>> {
    match config {
        StorageConfig::Memory => Ok(Arc::new(MemoryStorage::new())),
        StorageConfig::Sqlite(sqlite) => {
            let sqlite = sqlite.clone();
            let storage = connect_blocking(move || SqliteStorage::connect(&sqlite)).await?;
            Ok(Arc::new(storage))
        }
        StorageConfig::Mysql(relational) => build_mysql(relational).await,
        StorageConfig::Postgresql(relational) => build_postgres(relational).await,
    }
}

#[cfg(feature = "mysql")]
async fn build_mysql(
    config: &crate::infrastructure::config::storage::RelationalConfig,
) -> Result<Arc<dyn StorageBackend>> {
    use crate::adapter::outbound::mysql::MysqlStorage;

    let config = config.clone();
    let storage = connect_blocking(move || MysqlStorage::connect(&config)).await?;
    Ok(Arc::new(storage))
}

#[cfg(not(feature = "mysql"))]
async fn build_mysql(
    _config: &crate::infrastructure::config::storage::RelationalConfig,
) -> Result<Arc<dyn StorageBackend>> {
    Err(crate::error::ConfigError::UnsupportedBackend {
        kind: "mysql",
        feature: "mysql",
    }
    .into())
}

#[cfg(feature = "postgres")]
async fn build_postgres(
    config: &crate::infrastructure::config::storage::RelationalConfig,
) -> Result<Arc<dyn StorageBackend>> {
    use crate::adapter::outbound::postgres::PostgresStorage;

    let config = config.clone();
    let storage = connect_blocking(move || PostgresStorage::connect(&config)).await?;
    Ok(Arc::new(storage))
}

#[cfg(not(feature = "postgres"))]
async fn build_postgres(
    _config: &crate::infrastructure::config::storage::RelationalConfig,
) -> Result<Arc<dyn StorageBackend>> {
    Err(crate::error::ConfigError::UnsupportedBackend {
        kind: "postgresql",
        feature: "postgres",
    }
    .into())
}

async fn connect_blocking<T, F>(connect: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(connect)
        .await
        .map_err(|e| Error::store("connect", "", StoreError::Task(e.to_string())))?
}
