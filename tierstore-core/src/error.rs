//! Error types for tierstore operations

use thiserror::Error;

/// Identifier validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Identifier does not match the expected pattern: {candidate:?}")]
    PatternMismatch { candidate: String },

    #[error("Identifier {candidate:?} is not canonical (canonical form: {canonical:?})")]
    NotCanonical { candidate: String, canonical: String },

    #[error("Identifier {candidate:?} is not a single path component: {reason}")]
    UnsafeComponent { candidate: String, reason: String },

    #[error("Identifier {candidate:?} resolves outside the store root")]
    EscapesRoot { candidate: String },
}

/// Storage layer errors.
///
/// Reasons are plain strings so the error stays `Clone` and never carries the
/// absolute path of the file involved.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),

    #[error("Record not found: {uid}")]
    NotFound { uid: String },

    #[error("I/O failure during {operation} of {uid}: {reason}")]
    Io {
        operation: &'static str,
        uid: String,
        reason: String,
    },

    #[error("Can't encode record {uid} as JSON: {reason}")]
    Encode { uid: String, reason: String },

    #[error("Can't parse record {uid} as JSON: {reason}")]
    Decode { uid: String, reason: String },

    #[error("Can't read the store root: {reason}")]
    RootUnreadable { reason: String },
}

impl StorageError {
    /// Build an I/O error tagged with the operation that failed.
    pub fn io(operation: &'static str, uid: impl Into<String>, err: &std::io::Error) -> Self {
        StorageError::Io {
            operation,
            uid: uid.into(),
            reason: err.kind().to_string(),
        }
    }

    pub fn not_found(uid: impl Into<String>) -> Self {
        StorageError::NotFound { uid: uid.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

/// Tiering policy errors raised by the coordinator and the startup loader.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TierError {
    /// The durable write of a Forever record failed; the fast tier was not touched.
    #[error("Can't store data into the persistent storage: {0}")]
    DurableWrite(StorageError),

    /// The fast-tier write failed. A preceding durable write may have succeeded.
    #[error("Can't store data into the memory storage: {0}")]
    CacheWrite(StorageError),

    /// A record could not be republished into the fast tier during startup.
    #[error("Can't load persistent record {uid} into the memory storage: {source}")]
    Reconciliation { uid: String, source: StorageError },

    /// The persistent store could not be scanned at all.
    #[error("Can't initialize the persistent storage: {0}")]
    ScanFailed(StorageError),
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to parse config TOML: {reason}")]
    Parse { reason: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all tierstore errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TierStoreError {
    #[error("Identifier error: {0}")]
    Identifier(#[from] IdentifierError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Tier error: {0}")]
    Tier(#[from] TierError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for tierstore operations.
pub type TierStoreResult<T> = Result<T, TierStoreError>;

/// Result type alias for single-tier storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// TESTS
// =============================================================================
