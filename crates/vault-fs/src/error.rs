//! Error types for vault-fs

use std::io::ErrorKind;

/// Result type for vault-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in vault-fs operations
///
/// Every variant names the path or repository URI it concerns.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Not found: {path}")]
    NotFound { path: String },

    #[error("Already exists: {path}")]
    AlreadyExists { path: String },

    #[error("Not a directory: {path}")]
    NotADirectory { path: String },

    #[error("Not a file: {path}")]
    NotAFile { path: String },

    #[error("Directory not empty: {path}")]
    DirectoryNotEmpty { path: String },

    #[error("Operation not permitted on the root directory: {path}")]
    IsRoot { path: String },

    #[error("File not open for reading: {path}")]
    NotReadable { path: String },

    #[error("File not open for writing: {path}")]
    NotWritable { path: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("I/O operation on closed file: {path}")]
    ClosedHandle { path: String },

    #[error("File already open for writing: {path}")]
    InUse { path: String },

    #[error("Repository is read-only: {path}")]
    ReadOnly { path: String },

    #[error("Repository is closed: {uri}")]
    RepoClosed { uri: String },

    #[error("Wrong passphrase for repository {uri}")]
    Authentication { uri: String },

    #[error("Repository {uri} is locked by another writer")]
    Locked { uri: String },

    #[error("Failed to load config at {path}: {message}")]
    Config { path: String, message: String },

    #[error("Storage error ({context}): {source}")]
    Storage {
        context: String,
        #[source]
        source: vault_store::Error,
    },
}

impl Error {
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Wrap a backend failure with the path or operation it happened under.
    pub fn storage(context: impl Into<String>, source: vault_store::Error) -> Self {
        match source {
            vault_store::Error::Locked { location } => Self::Locked { uri: location },
            source => Self::Storage {
                context: context.into(),
                source,
            },
        }
    }

    /// The closest `std::io::ErrorKind` for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPath { .. } | Self::InvalidArgument { .. } => ErrorKind::InvalidInput,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::NotADirectory { .. } => ErrorKind::NotADirectory,
            Self::NotAFile { .. } => ErrorKind::IsADirectory,
            Self::DirectoryNotEmpty { .. } => ErrorKind::DirectoryNotEmpty,
            Self::NotReadable { .. }
            | Self::NotWritable { .. }
            | Self::ReadOnly { .. }
            | Self::IsRoot { .. }
            | Self::Authentication { .. } => ErrorKind::PermissionDenied,
            Self::InUse { .. } | Self::Locked { .. } => ErrorKind::ResourceBusy,
            Self::ClosedHandle { .. } | Self::RepoClosed { .. } => ErrorKind::BrokenPipe,
            Self::Config { .. } => ErrorKind::InvalidData,
            Self::Storage { source, .. } => match source {
                vault_store::Error::Io { source, .. } => source.kind(),
                vault_store::Error::Corrupted { .. } => ErrorKind::InvalidData,
                _ => ErrorKind::Other,
            },
        }
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        std::io::Error::new(err.kind(), err)
    }
}
