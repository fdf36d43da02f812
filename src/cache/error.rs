//! Session cache error handling.

use std::path::PathBuf;

use thiserror::Error;

/// Session cache errors.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The configured TTL is zero or too large to represent.
    #[error("Session cache TTL must be positive and representable, got {0:?}")]
    InvalidTtl(std::time::Duration),

    /// The current repository could not be identified.
    #[error("Failed to resolve repository identity")]
    Identity(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// No cached entry carries the given session ID.
    #[error("Session not found in cache: {0}")]
    SessionNotFound(String),

    /// The cache directory could not be created.
    #[error("Failed to create cache directory {}", path.display())]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The cache file exists but could not be read.
    #[error("Failed to read session cache {}", path.display())]
    Read {
        /// Cache file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The cache file could not be written.
    #[error("Failed to write session cache {}", path.display())]
    Write {
        /// Cache file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The cache file is not a valid session mapping.
    #[error("Malformed session cache {}", path.display())]
    Malformed {
        /// Cache file path.
        path: PathBuf,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The in-memory mapping could not be serialized.
    #[error("Failed to serialize session cache")]
    Serialize(#[from] serde_json::Error),

    /// A thread panicked while holding the cache lock.
    #[error("Session cache lock poisoned")]
    LockPoisoned,
}

impl CacheError {
    /// Returns true for the "nothing to update" condition of
    /// [`SessionStore::touch`](super::SessionStore::touch).
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::SessionNotFound(_))
    }
}
