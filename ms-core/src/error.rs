//! Global error types for the MetaSnap application.
//!
//! All error categories across the application are unified into a single
//! `MsError` enum with conversions from underlying library errors.

use thiserror::Error;

/// Convenience type alias for Results using MsError.
pub type MsResult<T> = Result<T, MsError>;

/// Unified error type covering all error categories in MetaSnap.
#[derive(Error, Debug)]
pub enum MsError {
    // -- Configuration errors --
    /// Failed to load or parse process configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required configuration value is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    /// A stored or submitted setting is outside its valid range.
    ///
    /// Resolution replaces the value with its default; this variant only
    /// travels as far as the debug log.
    #[error("setting {name} out of bounds: {value:?}")]
    ConfigBounds {
        /// Setting name.
        name: String,
        /// Raw rejected value.
        value: String,
    },

    // -- Storage errors --
    /// A read or write transaction against the record store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Database migration failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// Database connection pool error.
    #[error("connection pool error: {0}")]
    Pool(String),

    /// Database integrity check failed.
    #[error("database integrity check failed: {0}")]
    IntegrityCheck(String),

    /// A record with the given key does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    // -- Network errors --
    /// The remote endpoint could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// HTTP request timed out.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Server returned a non-success response.
    #[error("server error (status {status}): {message}")]
    ServerError {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    // -- Encoding errors --
    /// Photo metadata re-encoding failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Service errors --
    /// A service failed to initialize.
    #[error("service init error: {0}")]
    ServiceInit(String),

    /// A service operation failed.
    #[error("service error: {0}")]
    Service(String),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MsError {
    /// Whether the error came from the record store.
    ///
    /// Callers use this to decide whether a suspended control must be
    /// restored and the failure escalated to the application log.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            MsError::Storage(_)
                | MsError::Pool(_)
                | MsError::Migration(_)
                | MsError::IntegrityCheck(_)
        )
    }
}

impl From<serde_json::Error> for MsError {
    fn from(e: serde_json::Error) -> Self {
        MsError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for MsError {
    fn from(e: toml::de::Error) -> Self {
        MsError::Config(e.to_string())
    }
}
