//! Durable on-disk backend (`file:///path`).
//!
//! Layout under the root directory:
//!
//! ```text
//! superblock.toml
//! vault.lock
//! objects/<id>/index.toml     retained versions
//! objects/<id>/<version>.bin  content of one version
//! ```

use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::checksum::{compute_checksum, verify_checksum};
use crate::io::{RobustnessConfig, write_atomic};
use crate::{Error, ObjectId, Result, Storage, StorageLock, StoreUri, Superblock, VersionInfo};

const SUPERBLOCK_FILE: &str = "superblock.toml";
const LOCK_FILE: &str = "vault.lock";
const OBJECTS_DIR: &str = "objects";
const INDEX_FILE: &str = "index.toml";

#[derive(Debug, Default, Serialize, Deserialize)]
struct ObjectIndex {
    versions: Vec<VersionInfo>,
}

/// Unlocks the lock file on drop.
struct FileLockGuard(File);

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        let _ = self.0.unlock();
    }
}

/// Backend for `file://` URIs.
#[derive(Debug)]
pub struct FileStorage {
    uri: StoreUri,
    root: PathBuf,
    robustness: RobustnessConfig,
    superblock: RwLock<Option<Superblock>>,
}

impl FileStorage {
    /// Bind to the directory named by the URI. Nothing is created yet.
    pub fn open(uri: &StoreUri) -> Result<Self> {
        Self::with_robustness(uri, RobustnessConfig::default())
    }

    pub fn with_robustness(uri: &StoreUri, robustness: RobustnessConfig) -> Result<Self> {
        let raw = PathBuf::from(uri.location());
        let root = if raw.exists() {
            dunce::canonicalize(&raw).map_err(|e| Error::io(&raw, e))?
        } else {
            raw
        };
        Ok(Self {
            uri: uri.clone(),
            root,
            robustness,
            superblock: RwLock::new(None),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_dir(&self, id: ObjectId) -> PathBuf {
        self.root.join(OBJECTS_DIR).join(id.to_string())
    }

    fn version_path(&self, id: ObjectId, version: u64) -> PathBuf {
        self.object_dir(id).join(format!("{:020}.bin", version))
    }

    fn load_index(&self, id: ObjectId) -> Result<ObjectIndex> {
        let path = self.object_dir(id).join(INDEX_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::ObjectNotFound { id });
            }
            Err(e) => return Err(Error::io(&path, e)),
        };
        toml::from_str(&content)
            .map_err(|e| Error::corrupted(path.display().to_string(), e.to_string()))
    }

    fn save_index(&self, id: ObjectId, index: &ObjectIndex) -> Result<()> {
        let content = toml::to_string_pretty(index).map_err(|e| Error::Serialize {
            what: format!("index of {}", id),
            message: e.to_string(),
        })?;
        write_atomic(
            &self.object_dir(id).join(INDEX_FILE),
            content.as_bytes(),
            self.robustness,
        )
    }

    fn version_limit(&self) -> Result<usize> {
        if let Some(sb) = self
            .superblock
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(usize::from(sb.version_limit));
        }
        Ok(usize::from(self.open()?.version_limit))
    }

    fn cache_superblock(&self, superblock: Option<Superblock>) {
        *self
            .superblock
            .write()
            .unwrap_or_else(PoisonError::into_inner) = superblock;
    }
}

impl Storage for FileStorage {
    fn uri(&self) -> &StoreUri {
        &self.uri
    }

    fn exists(&self) -> Result<bool> {
        Ok(self.root.join(SUPERBLOCK_FILE).is_file())
    }

    fn create(&self, superblock: &Superblock) -> Result<()> {
        if self.exists()? {
            return Err(Error::RepositoryExists {
                location: self.uri.to_string(),
            });
        }
        let content = toml::to_string_pretty(superblock).map_err(|e| Error::Serialize {
            what: "superblock".into(),
            message: e.to_string(),
        })?;
        let objects = self.root.join(OBJECTS_DIR);
        fs::create_dir_all(&objects).map_err(|e| Error::io(&objects, e))?;
        write_atomic(
            &self.root.join(SUPERBLOCK_FILE),
            content.as_bytes(),
            self.robustness,
        )?;
        self.cache_superblock(Some(superblock.clone()));
        Ok(())
    }

    fn open(&self) -> Result<Superblock> {
        let path = self.root.join(SUPERBLOCK_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::RepositoryNotFound {
                    location: self.uri.to_string(),
                });
            }
            Err(e) => return Err(Error::io(&path, e)),
        };
        let superblock: Superblock = toml::from_str(&content)
            .map_err(|e| Error::corrupted(path.display().to_string(), e.to_string()))?;
        self.cache_superblock(Some(superblock.clone()));
        Ok(superblock)
    }

    fn destroy(&self) -> Result<()> {
        // The lock file stays so a held lock keeps guarding the location.
        let objects = self.root.join(OBJECTS_DIR);
        if objects.exists() {
            fs::remove_dir_all(&objects).map_err(|e| Error::io(&objects, e))?;
        }
        let superblock = self.root.join(SUPERBLOCK_FILE);
        if superblock.exists() {
            fs::remove_file(&superblock).map_err(|e| Error::io(&superblock, e))?;
        }
        self.cache_superblock(None);
        tracing::info!(root = %self.root.display(), "Destroyed file storage");
        Ok(())
    }

    fn lock(&self) -> Result<StorageLock> {
        fs::create_dir_all(&self.root).map_err(|e| Error::io(&self.root, e))?;
        let path = self.root.join(LOCK_FILE);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::io(&path, e))?;
        file.try_lock_exclusive().map_err(|_| Error::Locked {
            location: self.uri.to_string(),
        })?;
        Ok(StorageLock::new(self.uri.to_string(), FileLockGuard(file)))
    }

    fn put_object(&self, id: ObjectId, data: &[u8]) -> Result<u64> {
        let limit = self.version_limit()?;
        let mut index = match self.load_index(id) {
            Ok(index) => index,
            Err(Error::ObjectNotFound { .. }) => ObjectIndex::default(),
            Err(e) => return Err(e),
        };

        let version = index.versions.last().map_or(1, |v| v.version + 1);
        write_atomic(&self.version_path(id, version), data, self.robustness)?;
        index.versions.push(VersionInfo {
            version,
            len: data.len() as u64,
            created: Utc::now(),
            checksum: compute_checksum(data),
        });

        let excess = index.versions.len().saturating_sub(limit);
        let pruned: Vec<VersionInfo> = index.versions.drain(..excess).collect();
        self.save_index(id, &index)?;

        for old in pruned {
            let path = self.version_path(id, old.version);
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != ErrorKind::NotFound {
                    return Err(Error::io(&path, e));
                }
            }
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
        let path = self.version_path(id, version);
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::VersionNotFound { id, version });
            }
            Err(e) => return Err(Error::io(&path, e)),
        };
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| Error::io(&path, e))?;

        let mut buf = Vec::with_capacity(len.min(64 * 1024));
        file.take(len as u64)
            .read_to_end(&mut buf)
            .map_err(|e| Error::io(&path, e))?;
        Ok(buf)
    }

    fn delete_object(&self, id: ObjectId) -> Result<()> {
        let dir = self.object_dir(id);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::ObjectNotFound { id }),
            Err(e) => Err(Error::io(&dir, e)),
        }
    }

    fn versions(&self, id: ObjectId) -> Result<Vec<VersionInfo>> {
        Ok(self.load_index(id)?.versions)
    }

    fn get_object(&self, id: ObjectId) -> Result<Vec<u8>> {
        let current = self.current_version(id)?;
        let path = self.version_path(id, current.version);
        let data = fs::read(&path).map_err(|e| Error::io(&path, e))?;
        if !verify_checksum(&data, &current.checksum) {
            return Err(Error::corrupted(
                path.display().to_string(),
                format!("checksum mismatch for version {}", current.version),
            ));
        }
        Ok(data)
    }
}
