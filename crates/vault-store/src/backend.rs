//! Storage backend abstraction
//!
//! Every URI scheme maps to one [`Storage`] implementation. The filesystem
//! layer only ever talks to this trait.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::{
    Error, FileStorage, MemStorage, ObjectId, Result, StoreUri, Superblock, VersionInfo,
};

/// Exclusive writer lock on a storage location.
///
/// Released when dropped.
pub struct StorageLock {
    location: String,
    _guard: Box<dyn Any + Send + Sync>,
}

impl StorageLock {
    /// Wrap a backend-specific guard whose `Drop` releases the lock.
    pub fn new(location: impl Into<String>, guard: impl Any + Send + Sync) -> Self {
        Self {
            location: location.into(),
            _guard: Box::new(guard),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl fmt::Debug for StorageLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageLock")
            .field("location", &self.location)
            .finish()
    }
}

/// Keyed, versioned object store behind one storage location.
///
/// Versions are numbered from 1 and only grow. A backend retains at most
/// `Superblock::version_limit` versions per object, dropping the oldest.
pub trait Storage: Send + Sync + fmt::Debug {
    /// The URI this backend was opened for.
    fn uri(&self) -> &StoreUri;

    /// Whether a repository has been created at this location.
    fn exists(&self) -> Result<bool>;

    /// Initialize the location with `superblock`.
    ///
    /// Fails with [`Error::RepositoryExists`] if a repository is already there.
    fn create(&self, superblock: &Superblock) -> Result<()>;

    /// Load the superblock of an existing repository.
    fn open(&self) -> Result<Superblock>;

    /// Remove every object and the superblock.
    fn destroy(&self) -> Result<()>;

    /// Take the single-writer lock, failing with [`Error::Locked`] if held.
    fn lock(&self) -> Result<StorageLock>;

    /// Store `data` as the next version of `id`, returning its version number.
    fn put_object(&self, id: ObjectId, data: &[u8]) -> Result<u64>;

    /// Read up to `len` bytes of one version starting at `offset`.
    ///
    /// Returns fewer bytes at the end of content and none past it.
    fn read_object(&self, id: ObjectId, version: u64, offset: u64, len: usize)
    -> Result<Vec<u8>>;

    /// Delete an object and all its versions.
    fn delete_object(&self, id: ObjectId) -> Result<()>;

    /// Retained versions of an object, oldest first.
    fn versions(&self, id: ObjectId) -> Result<Vec<VersionInfo>>;

    /// Whether any version of `id` is stored.
    fn has_object(&self, id: ObjectId) -> Result<bool> {
        match self.versions(id) {
            Ok(versions) => Ok(!versions.is_empty()),
            Err(Error::ObjectNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// The newest retained version of an object.
    fn current_version(&self, id: ObjectId) -> Result<VersionInfo> {
        self.versions(id)?
            .pop()
            .ok_or(Error::ObjectNotFound { id })
    }

    /// Length of one version.
    fn object_len(&self, id: ObjectId, version: u64) -> Result<u64> {
        self.versions(id)?
            .into_iter()
            .find(|v| v.version == version)
            .map(|v| v.len)
            .ok_or(Error::VersionNotFound { id, version })
    }

    /// Full content of the current version.
    fn get_object(&self, id: ObjectId) -> Result<Vec<u8>> {
        let current = self.current_version(id)?;
        let len = usize::try_from(current.len)
            .map_err(|_| Error::corrupted(id.to_string(), "object too large for memory"))?;
        self.read_object(id, current.version, 0, len)
    }
}

/// Open the backend selected by the URI scheme.
pub fn open_storage(uri: &StoreUri) -> Result<Arc<dyn Storage>> {
    tracing::debug!(%uri, "Opening storage backend");
    match uri.scheme() {
        "mem" => Ok(Arc::new(MemStorage::open(uri))),
        "file" => Ok(Arc::new(FileStorage::open(uri)?)),
        other => Err(Error::UnsupportedScheme {
            scheme: other.to_string(),
        }),
    }
}
