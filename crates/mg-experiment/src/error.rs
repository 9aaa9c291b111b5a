//! Error types for the experiment engine
//!
//! Malformed persisted values are never errors here: readers fall back to
//! their defaults. What remains are failures of the storage capability
//! itself, invalid catalog/config definitions, and the export/reset paths.

use std::path::PathBuf;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum ExperimentError {
    /// Storage capability failed
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Catalog definition is invalid
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Reset left or nearly left the store inconsistent
    #[error("reset failed: {0}")]
    Reset(#[from] ResetError),

    /// Export artifact could not be produced or delivered
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
}

impl ExperimentError {
    /// Whether the page can keep running after this error
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_transient(),
            Self::Catalog(_) | Self::Config(_) => false,
            Self::Reset(ResetError::PartialReset { rollback_failures, .. }) => {
                rollback_failures.is_empty()
            }
            Self::Reset(ResetError::Snapshot(_)) | Self::Export(_) => true,
        }
    }
}

/// Failures of the key-value storage capability
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backing file could not be read or written
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backing file exists but is not a JSON object of strings
    #[error("backing file {path} is not a string map: {message}")]
    CorruptBackingFile { path: PathBuf, message: String },

    /// Value could not be encoded as JSON
    #[error("could not encode value for key '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Store refused the write
    #[error("write rejected for key '{key}': {reason}")]
    WriteRejected { key: String, reason: String },

    /// Store refused the removal
    #[error("remove rejected for key '{key}': {reason}")]
    RemoveRejected { key: String, reason: String },
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether retrying the same operation may succeed
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::WriteRejected { .. } | Self::RemoveRejected { .. }
        )
    }
}

/// Invalid catalog definitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// Both variants share a key
    #[error("duplicate variant key: '{0}'")]
    DuplicateKey(String),

    /// Variant key is empty
    #[error("variant key must not be empty")]
    EmptyKey,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Two storage keys collide
    #[error("storage key '{0}' is used for more than one record")]
    DuplicateStorageKey(String),
}

/// Multi-key reset failures
#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    /// A deletion failed; earlier deletions were rolled back
    #[error("could not clear '{failed_key}': {source}")]
    PartialReset {
        failed_key: String,
        #[source]
        source: StoreError,
        /// Keys whose previous value could not be restored
        rollback_failures: Vec<String>,
    },

    /// Snapshot before deleting could not be taken
    #[error("could not snapshot state before reset: {0}")]
    Snapshot(#[source] StoreError),
}

/// Export path errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Bundle could not be serialized
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Reading current state failed
    #[error("could not read state: {0}")]
    Store(#[from] StoreError),

    /// Download sink failed
    #[error("could not deliver {file_name}: {source}")]
    Delivery {
        file_name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience result alias
pub type Result<T, E = ExperimentError> = std::result::Result<T, E>;
