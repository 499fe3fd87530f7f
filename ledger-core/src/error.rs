//! Error types for the ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// The three externally meaningful kinds are `Configuration` (caller
/// error, surfaced verbatim with the missing field name, never
/// retried), `Resolution` (wallet/account lookup failed, fatal to the
/// batch) and `Persistence` (atomic write failed or batch rejected,
/// zero visible effect). Everything else is internal plumbing.
#[derive(Error, Debug)]
pub enum Error {
    /// A field required by the selected strategy or fee leg is missing
    #[error("required field missing: {field}")]
    Configuration {
        /// Name of the missing request field
        field: &'static str,
    },

    /// Wallet or account lookup failed
    #[error("resolution failed: {0}")]
    Resolution(String),

    /// Atomic write failed or the batch was rejected before commit
    #[error("persistence failed: {0}")]
    Persistence(String),

    /// Requested rows do not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Configuration file error
    #[error("config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a missing-field error
    pub fn missing(field: &'static str) -> Self {
        Error::Configuration { field }
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Persistence(err.to_string())
    }
}
