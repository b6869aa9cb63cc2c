//! Repository facade
//!
//! A [`Repo`] owns the directory tree of one storage location and hands out
//! [`FileHandle`]s. All state that handles need after opening lives in
//! [`Shared`], so closing the repository invalidates every handle at once.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard};
use vault_store::{
    DEFAULT_VERSION_LIMIT, ObjectId, Storage, StorageLock, StoreUri, Superblock, VersionInfo,
    open_storage,
};

use crate::file::{FileHandle, OpenMode};
use crate::tree::{DirEntry, DirectoryTree, FileState, Metadata, RemoveMode};
use crate::{Error, NormalizedPath, Result};

/// State shared by a repository and every handle opened from it.
#[derive(Debug)]
pub(crate) struct Shared {
    storage: Arc<dyn Storage>,
    uri: String,
    superblock: Superblock,
    read_only: bool,
    tree: RwLock<DirectoryTree>,
    writers: Mutex<HashSet<ObjectId>>,
    lock: Mutex<Option<StorageLock>>,
    closed: AtomicBool,
}

impl Shared {
    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::RepoClosed {
                uri: self.uri.clone(),
            });
        }
        Ok(())
    }

    fn ensure_writable(&self, path: &NormalizedPath) -> Result<()> {
        self.ensure_open()?;
        if self.read_only {
            return Err(Error::ReadOnly {
                path: path.to_string(),
            });
        }
        Ok(())
    }

    fn tree(&self) -> Result<RwLockReadGuard<'_, DirectoryTree>> {
        self.ensure_open()?;
        Ok(self.tree.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Apply `f` to a copy of the tree, persist the copy, then publish it.
    ///
    /// Readers keep seeing the previous tree until the copy is durable; a
    /// failure anywhere leaves the visible tree untouched.
    fn mutate<T>(&self, f: impl FnOnce(&mut DirectoryTree) -> Result<T>) -> Result<T> {
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = tree.clone();
        let value = f(&mut next)?;
        self.persist(&next)?;
        *tree = next;
        Ok(value)
    }

    fn persist(&self, tree: &DirectoryTree) -> Result<()> {
        let data = serde_json::to_vec(tree).map_err(|e| {
            Error::storage(
                "persist tree",
                vault_store::Error::Serialize {
                    what: "directory tree".into(),
                    message: e.to_string(),
                },
            )
        })?;
        self.storage
            .put_object(ObjectId::TREE, &data)
            .map_err(|e| Error::storage("persist tree", e))?;
        Ok(())
    }

    pub(crate) fn read_object(
        &self,
        path: &NormalizedPath,
        object: ObjectId,
        version: u64,
        offset: u64,
        len: usize,
    ) -> Result<Vec<u8>> {
        self.ensure_open()?;
        self.storage
            .read_object(object, version, offset, len)
            .map_err(|e| Error::storage(path.to_string(), e))
    }

    /// Store `data` as the next version of `object` and point the tree at it.
    pub(crate) fn commit(
        &self,
        path: &NormalizedPath,
        object: ObjectId,
        data: &[u8],
    ) -> Result<u64> {
        self.ensure_open()?;
        let version = self.mutate(|tree| {
            if !tree.contains_object(object) {
                return Err(Error::NotFound {
                    path: path.to_string(),
                });
            }
            let version = self
                .storage
                .put_object(object, data)
                .map_err(|e| Error::storage(path.to_string(), e))?;
            tree.commit_file(object, data.len() as u64, version)?;
            Ok(version)
        })?;
        tracing::debug!(%path, version, len = data.len(), "Committed file");
        Ok(version)
    }

    fn claim_writer(&self, path: &NormalizedPath, object: ObjectId) -> Result<()> {
        let mut writers = self.writers.lock().unwrap_or_else(PoisonError::into_inner);
        if !writers.insert(object) {
            return Err(Error::InUse {
                path: path.to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn release_writer(&self, object: ObjectId) {
        self.writers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&object);
    }

    /// Delete storage objects no entry refers to anymore.
    fn delete_objects(&self, objects: &[ObjectId]) -> Result<()> {
        for object in objects {
            self.storage
                .delete_object(*object)
                .map_err(|e| Error::storage(format!("delete object {object}"), e))?;
        }
        Ok(())
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            tracing::debug!(uri = %self.uri, "Closed repository");
        }
    }
}

/// Summary of an open repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoInfo {
    pub uri: String,
    pub created: DateTime<Utc>,
    pub version_limit: u8,
    pub read_only: bool,
}

/// Builder for opening or creating a [`Repo`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoOpener {
    create: bool,
    overwrite: bool,
    read_only: bool,
    version_limit: u8,
}

impl Default for RepoOpener {
    fn default() -> Self {
        Self::new()
    }
}

impl RepoOpener {
    pub fn new() -> Self {
        Self {
            create: false,
            overwrite: false,
            read_only: false,
            version_limit: DEFAULT_VERSION_LIMIT,
        }
    }

    /// Initialize a new repository if the location is empty.
    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// With `create`, destroy and reinitialize an existing repository.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Open without taking the writer lock; every mutation fails.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Versions retained per file in a newly created repository.
    pub fn version_limit(mut self, limit: u8) -> Self {
        self.version_limit = limit;
        self
    }

    /// Open the repository at `uri`, selecting the backend by scheme.
    pub fn open(&self, uri: &str, passphrase: &str) -> Result<Repo> {
        let uri = StoreUri::parse(uri).map_err(|e| Error::storage("parse uri", e))?;
        let storage = open_storage(&uri).map_err(|e| Error::storage(uri.to_string(), e))?;
        self.open_with_storage(storage, passphrase)
    }

    /// Open a repository on an already constructed backend.
    pub fn open_with_storage(&self, storage: Arc<dyn Storage>, passphrase: &str) -> Result<Repo> {
        let uri = storage.uri().to_string();
        let store_err = |e| Error::storage(uri.clone(), e);

        if self.read_only && self.create {
            return Err(Error::invalid_argument(
                "cannot create a repository in read-only mode",
            ));
        }
        if !storage.exists().map_err(store_err)? && !self.create {
            return Err(Error::NotFound { path: uri });
        }

        let lock = if self.read_only {
            None
        } else {
            Some(storage.lock().map_err(store_err)?)
        };

        // The location may have changed while waiting for the lock
        let exists = storage.exists().map_err(store_err)?;
        let (superblock, tree) = if self.create && (!exists || self.overwrite) {
            if exists {
                tracing::info!(%uri, "Overwriting existing repository");
                storage.destroy().map_err(store_err)?;
            }
            let superblock = Superblock::new(passphrase, self.version_limit);
            storage.create(&superblock).map_err(store_err)?;
            tracing::info!(%uri, version_limit = superblock.version_limit, "Created repository");
            (superblock, None)
        } else if exists && self.create {
            return Err(Error::AlreadyExists { path: uri });
        } else if !exists {
            return Err(Error::NotFound { path: uri });
        } else {
            let superblock = storage.open().map_err(store_err)?;
            if !superblock.verify(passphrase) {
                return Err(Error::Authentication { uri });
            }
            let tree = load_tree(storage.as_ref()).map_err(store_err)?;
            (superblock, Some(tree))
        };

        let created = tree.is_none();
        let shared = Arc::new(Shared {
            storage,
            uri: uri.clone(),
            superblock,
            read_only: self.read_only,
            tree: RwLock::new(tree.unwrap_or_default()),
            writers: Mutex::new(HashSet::new()),
            lock: Mutex::new(lock),
            closed: AtomicBool::new(false),
        });
        if created {
            let tree = shared.tree()?;
            shared.persist(&tree)?;
        }

        tracing::debug!(%uri, read_only = self.read_only, "Opened repository");
        Ok(Repo { shared })
    }
}

fn load_tree(storage: &dyn Storage) -> vault_store::Result<DirectoryTree> {
    if !storage.has_object(ObjectId::TREE)? {
        return Ok(DirectoryTree::new());
    }
    let data = storage.get_object(ObjectId::TREE)?;
    serde_json::from_slice(&data).map_err(|e| {
        vault_store::Error::corrupted(storage.uri().to_string(), format!("directory tree: {e}"))
    })
}

/// An open repository.
///
/// `Repo` is `Send + Sync`; share it between threads behind an `Arc`.
/// Dropping it closes it.
#[derive(Debug)]
pub struct Repo {
    shared: Arc<Shared>,
}

impl Repo {
    /// Whether a repository exists at `uri`.
    pub fn exists(uri: &str) -> Result<bool> {
        let uri = StoreUri::parse(uri).map_err(|e| Error::storage("parse uri", e))?;
        let storage = open_storage(&uri).map_err(|e| Error::storage(uri.to_string(), e))?;
        storage
            .exists()
            .map_err(|e| Error::storage(uri.to_string(), e))
    }

    /// Remove the repository at `uri` and everything in it.
    ///
    /// Fails with [`Error::Locked`] while a writable `Repo` is open on it.
    pub fn destroy(uri: &str) -> Result<()> {
        let uri = StoreUri::parse(uri).map_err(|e| Error::storage("parse uri", e))?;
        let storage = open_storage(&uri).map_err(|e| Error::storage(uri.to_string(), e))?;
        let store_err = |e| Error::storage(uri.to_string(), e);

        let _lock = storage.lock().map_err(store_err)?;
        if !storage.exists().map_err(store_err)? {
            return Err(Error::NotFound {
                path: uri.to_string(),
            });
        }
        storage.destroy().map_err(store_err)?;
        tracing::info!(%uri, "Destroyed repository");
        Ok(())
    }

    pub fn info(&self) -> RepoInfo {
        RepoInfo {
            uri: self.shared.uri.clone(),
            created: self.shared.superblock.created,
            version_limit: self.shared.superblock.version_limit,
            read_only: self.shared.read_only,
        }
    }

    pub fn uri(&self) -> &str {
        &self.shared.uri
    }

    pub fn is_read_only(&self) -> bool {
        self.shared.read_only
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Close the repository and release its writer lock.
    ///
    /// Idempotent. Handles opened from it fail with [`Error::RepoClosed`].
    pub fn close(&self) {
        self.shared.close();
    }

    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let path = NormalizedPath::validate(path)?;
        self.shared.tree()?.read_dir(&path)
    }

    pub fn create_dir(&self, path: &str) -> Result<()> {
        let path = NormalizedPath::validate(path)?;
        self.shared.ensure_writable(&path)?;
        self.shared.mutate(|tree| tree.create_dir(&path))?;
        tracing::debug!(%path, "Created directory");
        Ok(())
    }

    pub fn create_dir_all(&self, path: &str) -> Result<()> {
        let path = NormalizedPath::validate(path)?;
        self.shared.ensure_writable(&path)?;
        if self.shared.tree()?.is_dir(&path) {
            return Ok(());
        }
        self.shared.mutate(|tree| tree.create_dir_all(&path))?;
        tracing::debug!(%path, "Created directory tree");
        Ok(())
    }

    /// Whether `path` names an entry; false for invalid paths.
    pub fn path_exists(&self, path: &str) -> bool {
        self.probe(path, DirectoryTree::exists)
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.probe(path, DirectoryTree::is_dir)
    }

    pub fn is_file(&self, path: &str) -> bool {
        self.probe(path, DirectoryTree::is_file)
    }

    fn probe(&self, path: &str, f: impl Fn(&DirectoryTree, &NormalizedPath) -> bool) -> bool {
        match (NormalizedPath::validate(path), self.shared.tree()) {
            (Ok(path), Ok(tree)) => f(&tree, &path),
            _ => false,
        }
    }

    pub fn metadata(&self, path: &str) -> Result<Metadata> {
        let path = NormalizedPath::validate(path)?;
        self.shared.tree()?.metadata(&path)
    }

    pub fn set_modified(&self, path: &str, modified: DateTime<Utc>) -> Result<()> {
        let path = NormalizedPath::validate(path)?;
        self.shared.ensure_writable(&path)?;
        self.shared
            .mutate(|tree| tree.set_modified(&path, modified))
    }

    /// Retained versions of a file, oldest first.
    pub fn history(&self, path: &str) -> Result<Vec<VersionInfo>> {
        let path = NormalizedPath::validate(path)?;
        let state = self.shared.tree()?.file_state(&path)?;
        self.shared
            .storage
            .versions(state.object)
            .map_err(|e| Error::storage(path.to_string(), e))
    }

    fn remove_with(&self, path: &str, mode: RemoveMode) -> Result<()> {
        let path = NormalizedPath::validate(path)?;
        self.shared.ensure_writable(&path)?;
        let objects = self.shared.mutate(|tree| tree.remove(&path, mode))?;
        tracing::debug!(%path, ?mode, objects = objects.len(), "Removed entry");
        self.shared.delete_objects(&objects)
    }

    /// Remove a file or an empty directory.
    pub fn remove(&self, path: &str) -> Result<()> {
        self.remove_with(path, RemoveMode::Any)
    }

    pub fn remove_file(&self, path: &str) -> Result<()> {
        self.remove_with(path, RemoveMode::File)
    }

    pub fn remove_dir(&self, path: &str) -> Result<()> {
        self.remove_with(path, RemoveMode::EmptyDir)
    }

    /// Remove a directory and everything below it.
    pub fn remove_tree(&self, path: &str) -> Result<()> {
        self.remove_with(path, RemoveMode::Tree)
    }

    /// Move a file or directory.
    pub fn rename(&self, src: &str, dst: &str, overwrite: bool) -> Result<()> {
        let src = NormalizedPath::validate(src)?;
        let dst = NormalizedPath::validate(dst)?;
        self.shared.ensure_writable(&src)?;
        let replaced = self
            .shared
            .mutate(|tree| tree.rename(&src, &dst, overwrite))?;
        tracing::debug!(%src, %dst, "Moved entry");
        self.shared.delete_objects(&replaced)
    }

    /// Copy the current content of a file into a new, independent file.
    pub fn copy(&self, src: &str, dst: &str, overwrite: bool) -> Result<()> {
        let src = NormalizedPath::validate(src)?;
        let dst = NormalizedPath::validate(dst)?;
        self.shared.ensure_writable(&dst)?;

        let shared = &self.shared;
        let replaced = shared.mutate(|tree| {
            let state = tree.check_copy(&src, &dst, overwrite)?;
            let len = usize::try_from(state.len)
                .map_err(|_| Error::invalid_argument(format!("{src} is too large to copy")))?;
            let data = shared.read_object(&src, state.object, state.version, 0, len)?;

            let object = ObjectId::new();
            let version = shared
                .storage
                .put_object(object, &data)
                .map_err(|e| Error::storage(dst.to_string(), e))?;
            let copy = FileState {
                object,
                len: state.len,
                version,
            };
            tree.place_copy(&dst, copy, overwrite)
        })?;
        tracing::debug!(%src, %dst, "Copied file");
        shared.delete_objects(&replaced)
    }

    /// Open a file with a mode string such as `"r"`, `"w+"` or `"ab"`.
    pub fn open(&self, path: &str, mode: &str) -> Result<FileHandle> {
        self.open_with(path, OpenMode::parse(mode)?)
    }

    pub fn open_with(&self, path: &str, mode: OpenMode) -> Result<FileHandle> {
        let path = NormalizedPath::validate(path)?;
        if mode.writable() {
            self.shared.ensure_writable(&path)?;
        }

        let (state, created) = match self.lookup(&path)? {
            Some(_) if mode.exclusive() => {
                return Err(Error::AlreadyExists {
                    path: path.to_string(),
                });
            }
            Some(state) => (state, false),
            None if mode.must_exist() => {
                return Err(Error::NotFound {
                    path: path.to_string(),
                });
            }
            None => match self.create_empty_file(&path) {
                Ok(state) => (state, true),
                // Lost a race against another creator
                Err(Error::AlreadyExists { .. }) if !mode.exclusive() => {
                    let state = self.lookup(&path)?.ok_or_else(|| Error::NotFound {
                        path: path.to_string(),
                    })?;
                    (state, false)
                }
                Err(e) => return Err(e),
            },
        };

        if mode.writable() {
            self.shared.claim_writer(&path, state.object)?;
        }
        tracing::debug!(%path, %mode, version = state.version, "Opened file");
        Ok(FileHandle::new(
            Arc::clone(&self.shared),
            path,
            mode,
            state,
            mode.truncate() && !created,
        ))
    }

    fn lookup(&self, path: &NormalizedPath) -> Result<Option<FileState>> {
        match self.shared.tree()?.file_state(path) {
            Ok(state) => Ok(Some(state)),
            Err(Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn create_empty_file(&self, path: &NormalizedPath) -> Result<FileState> {
        let shared = &self.shared;
        let state = shared.mutate(|tree| {
            let object = ObjectId::new();
            // Checks the parent before anything reaches storage
            tree.create_file(
                path,
                FileState {
                    object,
                    len: 0,
                    version: 0,
                },
            )?;
            let version = shared
                .storage
                .put_object(object, &[])
                .map_err(|e| Error::storage(path.to_string(), e))?;
            tree.commit_file(object, 0, version)?;
            Ok(FileState {
                object,
                len: 0,
                version,
            })
        })?;
        tracing::debug!(%path, object = %state.object, "Created file");
        Ok(state)
    }

    /// Open `path`, run `f` on the handle, then close it.
    ///
    /// An error from `f` takes precedence over an error from closing.
    pub fn with_file<T>(
        &self,
        path: &str,
        mode: &str,
        f: impl FnOnce(&mut FileHandle) -> Result<T>,
    ) -> Result<T> {
        let mut file = self.open(path, mode)?;
        let result = f(&mut file);
        let closed = file.close();
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                tracing::warn!(%path, error = %close_err, "Failed to close file after error");
                Err(e)
            }
        }
    }

    /// Read the whole current content of a file.
    pub fn read_all(&self, path: &str) -> Result<Vec<u8>> {
        self.with_file(path, "r", |file| file.read(None))
    }

    /// Replace the content of a file, creating it if needed.
    pub fn write_all(&self, path: &str, data: &[u8]) -> Result<()> {
        self.with_file(path, "w", |file| file.write(data).map(|_| ()))
    }
}

impl Drop for Repo {
    fn drop(&mut self) {
        self.shared.close();
    }
}
