//! Error taxonomy of the capability contract

/// Result type for capability-contract operations
pub type Result<T> = std::result::Result<T, FsError>;

/// Errors raised through the [`Filesystem`](crate::Filesystem) contract.
///
/// Each variant names the path the caller passed in, not the normalized
/// repository path.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("Resource not found: {path}")]
    ResourceNotFound { path: String },

    #[error("Destination exists: {path}")]
    DestinationExists { path: String },

    #[error("Directory exists: {path}")]
    DirectoryExists { path: String },

    #[error("Directory expected: {path}")]
    DirectoryExpected { path: String },

    #[error("File expected: {path}")]
    FileExpected { path: String },

    #[error("Directory not empty: {path}")]
    DirectoryNotEmpty { path: String },

    #[error("Resource is read only: {path}")]
    ResourceReadOnly { path: String },

    #[error("Root directory may not be removed: {path}")]
    RemoveRoot { path: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Invalid argument for {path}: {message}")]
    InvalidArgument { path: String, message: String },

    #[error("Resource locked: {path}")]
    ResourceLocked { path: String },

    #[error("Authentication failed for {uri}")]
    AuthenticationFailed { uri: String },

    #[error("Operation failed on {path}: {source}")]
    OperationFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl FsError {
    /// Translate a repository error raised while operating on `path`.
    pub fn from_vault(err: vault_fs::Error, path: &str) -> Self {
        use vault_fs::Error as E;

        let path = path.to_string();
        match err {
            E::NotFound { .. } => Self::ResourceNotFound { path },
            E::AlreadyExists { .. } => Self::DestinationExists { path },
            E::NotADirectory { .. } => Self::DirectoryExpected { path },
            E::NotAFile { .. } => Self::FileExpected { path },
            E::DirectoryNotEmpty { .. } => Self::DirectoryNotEmpty { path },
            E::ReadOnly { .. } => Self::ResourceReadOnly { path },
            E::IsRoot { .. } => Self::RemoveRoot { path },
            E::InvalidPath { reason, .. } => Self::InvalidPath { path, reason },
            E::InvalidArgument { message } => Self::InvalidArgument { path, message },
            E::InUse { .. } | E::Locked { .. } => Self::ResourceLocked { path },
            E::Authentication { uri } => Self::AuthenticationFailed { uri },
            other => Self::OperationFailed {
                path,
                source: Box::new(other),
            },
        }
    }

    /// Wrap a stream error raised while reading or writing `path`.
    pub fn from_io(err: std::io::Error, path: &str) -> Self {
        match err.downcast::<vault_fs::Error>() {
            Ok(vault) => Self::from_vault(vault, path),
            Err(other) => Self::OperationFailed {
                path: path.to_string(),
                source: Box::new(other),
            },
        }
    }
}
