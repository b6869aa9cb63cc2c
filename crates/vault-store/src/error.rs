//! Error types for vault-store

use std::path::PathBuf;

use crate::ObjectId;

/// Result type for vault-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in vault-store operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid storage URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("Unsupported storage scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    #[error("No repository at {location}")]
    RepositoryNotFound { location: String },

    #[error("Repository already exists at {location}")]
    RepositoryExists { location: String },

    #[error("Object not found: {id}")]
    ObjectNotFound { id: ObjectId },

    #[error("Version {version} of object {id} not found")]
    VersionNotFound { id: ObjectId, version: u64 },

    #[error("Storage location {location} is locked by another writer")]
    Locked { location: String },

    #[error("Corrupted data at {location}: {message}")]
    Corrupted { location: String, message: String },

    #[error("Failed to serialize {what}: {message}")]
    Serialize { what: String, message: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_uri(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    pub fn corrupted(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Corrupted {
            location: location.into(),
            message: message.into(),
        }
    }
}
