//! Storage backend selection and per-engine connection settings.

use serde::Deserialize;
use url::Url;

use crate::domain::StorageKind;
use crate::error::{ConfigError, Result};

/// Which engine backs the storage facade, with its own settings.
///
/// The active variant is chosen by the `type` field of the `[storage]` table.
/// Unknown types are rejected while parsing.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    Mysql(RelationalConfig),
    Postgresql(RelationalConfig),
    Sqlite(SqliteConfig),
    Memory,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Sqlite(SqliteConfig::default())
    }
}

impl StorageConfig {
    /// Engine selected by this configuration.
    #[must_use]
    pub fn kind(&self) -> StorageKind {
        match self {
            Self::Mysql(_) => StorageKind::Mysql,
            Self::Postgresql(_) => StorageKind::Postgresql,
            Self::Sqlite(_) => StorageKind::Sqlite,
            Self::Memory => StorageKind::Memory,
        }
    }

    /// Settings of a networked engine, if one is selected.
    pub fn relational_mut(&mut self) -> Option<&mut RelationalConfig> {
        match self {
            Self::Mysql(config) | Self::Postgresql(config) => Some(config),
            Self::Sqlite(_) | Self::Memory => None,
        }
    }

    /// Validate the settings of the selected engine.
    ///
    /// # Errors
    /// Returns [`ConfigError`] describing the first offending field.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Mysql(config) | Self::Postgresql(config) => config.validate(),
            Self::Sqlite(config) => config.validate(),
            Self::Memory => Ok(()),
        }
    }
}

/// Connection settings for MySQL and PostgreSQL.
///
/// Either a full `url` or discrete `host`/`database` fields must be given.
/// Discrete fields fill in whatever the url leaves out.
#[derive(Debug, Clone, Deserialize)]
pub struct RelationalConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    /// Falls back to `STOWAGE_DATABASE_PASSWORD` when absent.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    /// Maximum pooled connections.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    /// How long to wait for a pooled connection before failing.
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,
    /// Apply embedded migrations on startup.
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

impl Default for RelationalConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: None,
            port: None,
            user: None,
            password: None,
            database: None,
            pool_size: default_pool_size(),
            connection_timeout_secs: default_connection_timeout_secs(),
            run_migrations: default_run_migrations(),
        }
    }
}

impl RelationalConfig {
    /// Build the connection url for `scheme`, e.g. `mysql` or `postgres`.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] if the pieces do not form a valid url.
    #[allow(clippy::result_large_err)]
    pub fn connection_url(&self, scheme: &str, default_port: u16) -> Result<String> {
        let mut url = match (&self.url, &self.host) {
            (Some(raw), _) => Url::parse(raw).map_err(|e| invalid("url", e.to_string()))?,
            (None, Some(host)) => {
                let mut url = Url::parse(&format!("{scheme}://{host}"))
                    .map_err(|e| invalid("host", e.to_string()))?;
                url.set_port(Some(self.port.unwrap_or(default_port)))
                    .map_err(|()| invalid("port", "cannot be set on this host".into()))?;
                url
            }
            (None, None) => return Err(ConfigError::MissingField { field: "url" }.into()),
        };

        if let Some(user) = self.user.as_deref().filter(|_| url.username().is_empty()) {
            url.set_username(user)
                .map_err(|()| invalid("user", "cannot be set on this url".into()))?;
        }
        if let Some(password) = self.password.as_deref().filter(|_| url.password().is_none()) {
            url.set_password(Some(password))
                .map_err(|()| invalid("password", "cannot be set on this url".into()))?;
        }
        if let Some(database) = self.database.as_deref() {
            if url.path().trim_start_matches('/').is_empty() {
                url.set_path(&format!("/{database}"));
            }
        }
        Ok(url.into())
    }

    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        if self.url.is_none() {
            if self.host.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::MissingField { field: "host" }.into());
            }
            if self.database.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::MissingField { field: "database" }.into());
            }
        }
        validate_pool(self.pool_size, self.connection_timeout_secs)
    }
}

/// Settings for a single-host SQLite database.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteConfig {
    /// Database file, or `:memory:` for a private in-process database.
    #[serde(default = "default_sqlite_path")]
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,
    /// How long a writer waits on a locked database.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: default_sqlite_path(),
            pool_size: default_pool_size(),
            connection_timeout_secs: default_connection_timeout_secs(),
            busy_timeout_ms: default_busy_timeout_ms(),
            run_migrations: default_run_migrations(),
        }
    }
}

impl SqliteConfig {
    /// Settings for a file at `path` with every other field defaulted.
    pub fn at(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Whether the database lives only inside this process.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.path == ":memory:"
    }

    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "path" }.into());
        }
        validate_pool(self.pool_size, self.connection_timeout_secs)
    }
}

#[allow(clippy::result_large_err)]
fn validate_pool(pool_size: u32, connection_timeout_secs: u64) -> Result<()> {
    if pool_size == 0 {
        return Err(invalid("pool_size", "must be greater than 0".into()).into());
    }
    if connection_timeout_secs == 0 {
        return Err(invalid("connection_timeout_secs", "must be greater than 0".into()).into());
    }
    Ok(())
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::InvalidValue { field, reason }
}

fn default_pool_size() -> u32 {
    u32::try_from(num_cpus::get() * 2).unwrap_or(u32::MAX)
}

fn default_connection_timeout_secs() -> u64 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_run_migrations() -> bool {
    true
}

fn default_sqlite_path() -> String {
    "stowage.db".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn discrete() -> RelationalConfig {
        RelationalConfig {
            host: Some("db.internal".into()),
            user: Some("stowage".into()),
            password: Some("p@ss word".into()),
            database: Some("cluster".into()),
            ..RelationalConfig::default()
        }
    }

    #[test]
    fn discrete_fields_build_a_url_with_default_port() {
        let url = discrete().connection_url("mysql", 3306).unwrap();
        assert!(url.starts_with("mysql://stowage:"));
        assert!(url.ends_with("@db.internal:3306/cluster"));
        // Credentials are percent-encoded.
        assert!(!url.contains("p@ss word"));
    }

    #[test]
    fn explicit_url_wins_over_discrete_fields() {
        let config = RelationalConfig {
            url: Some("postgres://admin:secret@pg:6543/main".into()),
            ..discrete()
        };
        let url = config.connection_url("postgres", 5432).unwrap();
        assert_eq!(url, "postgres://admin:secret@pg:6543/main");
    }

    #[test]
    fn url_without_password_takes_the_configured_one() {
        let config = RelationalConfig {
            url: Some("postgres://admin@pg/main".into()),
            password: Some("secret".into()),
            ..RelationalConfig::default()
        };
        let url = config.connection_url("postgres", 5432).unwrap();
        assert_eq!(url, "postgres://admin:secret@pg/main");
    }

    #[test]
    fn relational_requires_url_or_host() {
        let err = StorageConfig::Mysql(RelationalConfig::default())
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::MissingField { field: "host" })
        ));
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let config = StorageConfig::Sqlite(SqliteConfig {
            pool_size: 0,
            ..SqliteConfig::default()
        });
        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::InvalidValue {
                field: "pool_size",
                ..
            }))
        ));
    }

    #[test]
    fn kind_follows_variant() {
        assert_eq!(StorageConfig::Memory.kind(), StorageKind::Memory);
        assert_eq!(StorageConfig::default().kind(), StorageKind::Sqlite);
        assert_eq!(
            StorageConfig::Postgresql(discrete()).kind(),
            StorageKind::Postgresql
        );
    }

    #[test]
    fn in_memory_sqlite_is_detected() {
        assert!(SqliteConfig::at(":memory:").is_in_memory());
        assert!(!SqliteConfig::at("/var/lib/stowage.db").is_in_memory());
    }
}
