use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("storage backend '{kind}' is not compiled in (enable the '{feature}' feature)")]
    UnsupportedBackend {
        kind: &'static str,
        feature: &'static str,
    },
}

/// Failures raised by a storage backend while serving one operation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("storage has been shut down")]
    Closed,

    #[error("storage task failed: {0}")]
    Task(String),
}

impl From<diesel::result::Error> for StoreError {
    fn from(err: diesel::result::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A storage operation failed; `target` names the key it was applied to.
    #[error("{operation}({target}): {source}")]
    Store {
        operation: &'static str,
        target: String,
        #[source]
        source: StoreError,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a backend failure with the operation and key it belongs to.
    pub fn store(operation: &'static str, target: impl Into<String>, source: StoreError) -> Self {
        Error::Store {
            operation,
            target: target.into(),
            source,
        }
    }

    /// The backend failure behind this error, if it came from a store.
    #[must_use]
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Error::Store { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display_names_operation_and_target() {
        let err = Error::store(
            "unregister_allocation",
            "node-1",
            StoreError::Database("disk I/O error".into()),
        );
        assert_eq!(
            err.to_string(),
            "unregister_allocation(node-1): database error: disk I/O error"
        );
        assert!(matches!(err.store_error(), Some(StoreError::Database(_))));
    }

    #[test]
    fn config_errors_are_not_store_errors() {
        let err: Error = ConfigError::MissingField { field: "host" }.into();
        assert!(err.store_error().is_none());
        assert_eq!(err.to_string(), "missing required field: host");
    }

    #[test]
    fn diesel_errors_map_to_database_failures() {
        let err: StoreError = diesel::result::Error::NotFound.into();
        assert!(matches!(err, StoreError::Database(_)));
    }
}
