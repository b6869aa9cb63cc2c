//! In-process volatile backend (`mem://name`).
//!
//! Volumes live in a process-wide registry keyed by name, so reopening the
//! same URI sees the same state until the process exits.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::checksum::compute_checksum;
use crate::{Error, ObjectId, Result, Storage, StorageLock, StoreUri, Superblock, VersionInfo};

static VOLUMES: LazyLock<Mutex<HashMap<String, Arc<MemVolume>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

#[derive(Debug)]
struct StoredVersion {
    info: VersionInfo,
    data: Arc<Vec<u8>>,
}

#[derive(Debug, Default)]
struct VolumeState {
    superblock: Option<Superblock>,
    objects: HashMap<ObjectId, Vec<StoredVersion>>,
}

#[derive(Debug, Default)]
struct MemVolume {
    state: RwLock<VolumeState>,
    locked: AtomicBool,
}

impl MemVolume {
    fn read(&self) -> RwLockReadGuard<'_, VolumeState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, VolumeState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the volume's writer flag on drop.
struct MemLockGuard(Arc<MemVolume>);

impl Drop for MemLockGuard {
    fn drop(&mut self) {
        self.0.locked.store(false, Ordering::Release);
    }
}

/// Backend for `mem://` URIs.
#[derive(Debug)]
pub struct MemStorage {
    uri: StoreUri,
    volume: Arc<MemVolume>,
}

impl MemStorage {
    /// Attach to the named volume, creating an empty one on first use.
    pub fn open(uri: &StoreUri) -> Self {
        let mut volumes = VOLUMES.lock().unwrap_or_else(PoisonError::into_inner);
        let volume = volumes
            .entry(uri.location().to_string())
            .or_default()
            .clone();
        Self {
            uri: uri.clone(),
            volume,
        }
    }

    fn location(&self) -> String {
        self.uri.to_string()
    }
}

impl Storage for MemStorage {
    fn uri(&self) -> &StoreUri {
        &self.uri
    }

    fn exists(&self) -> Result<bool> {
        Ok(self.volume.read().superblock.is_some())
    }

    fn create(&self, superblock: &Superblock) -> Result<()> {
        let mut state = self.volume.write();
        if state.superblock.is_some() {
            return Err(Error::RepositoryExists {
                location: self.location(),
            });
        }
        state.superblock = Some(superblock.clone());
        state.objects.clear();
        Ok(())
    }

    fn open(&self) -> Result<Superblock> {
        self.volume
            .read()
            .superblock
            .clone()
            .ok_or_else(|| Error::RepositoryNotFound {
                location: self.location(),
            })
    }

    fn destroy(&self) -> Result<()> {
        let mut state = self.volume.write();
        state.superblock = None;
        state.objects.clear();
        Ok(())
    }

    fn lock(&self) -> Result<StorageLock> {
        if self
            .volume
            .locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::Locked {
                location: self.location(),
            });
        }
        Ok(StorageLock::new(
            self.location(),
            MemLockGuard(Arc::clone(&self.volume)),
        ))
    }

    fn put_object(&self, id: ObjectId, data: &[u8]) -> Result<u64> {
        let mut state = self.volume.write();
        let limit = state
            .superblock
            .as_ref()
            .map(|sb| usize::from(sb.version_limit))
            .ok_or_else(|| Error::RepositoryNotFound {
                location: self.location(),
            })?;

        let versions = state.objects.entry(id).or_default();
        let version = versions.last().map_or(1, |v| v.info.version + 1);
        versions.push(StoredVersion {
            info: VersionInfo {
                version,
                len: data.len() as u64,
                created: Utc::now(),
                checksum: compute_checksum(data),
            },
            data: Arc::new(data.to_vec()),
        });
        if versions.len() > limit {
            let excess = versions.len() - limit;
            versions.drain(..excess);
        }
        Ok(version)
    }

    fn read_object(
        &self,
        id: ObjectId,
        version: u64,
        offset: u64,
        len: usize,
    ) -> Result<Vec<u8>> {
        let state = self.volume.read();
        let versions = state.objects.get(&id).ok_or(Error::ObjectNotFound { id })?;
        let stored = versions
            .iter()
            .find(|v| v.info.version == version)
            .ok_or(Error::VersionNotFound { id, version })?;

        let data = stored.data.as_slice();
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let end = start.saturating_add(len).min(data.len());
        Ok(data[start..end].to_vec())
    }

    fn delete_object(&self, id: ObjectId) -> Result<()> {
        self.volume
            .write()
            .objects
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::ObjectNotFound { id })
    }

    fn versions(&self, id: ObjectId) -> Result<Vec<VersionInfo>> {
        let state = self.volume.read();
        let versions = state.objects.get(&id).ok_or(Error::ObjectNotFound { id })?;
        Ok(versions.iter().map(|v| v.info.clone()).collect())
    }
}
