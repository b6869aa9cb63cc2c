//! [`Filesystem`] over a vault repository

use vault_fs::{Error, FileHandle, NormalizedPath, Repo, RepoOpener};

use crate::{
    BasicInfo, Capabilities, DetailsInfo, Filesystem, FsError, Info, InfoUpdate, ResourceType,
    Result,
};

/// Namespace holding size, type and timestamps
pub const DETAILS: &str = "details";

/// A repository exposed through the [`Filesystem`] contract.
#[derive(Debug)]
pub struct VaultFs {
    repo: Repo,
}

impl VaultFs {
    pub fn new(repo: Repo) -> Self {
        Self { repo }
    }

    /// Open, or with `create` initialize, the repository at `uri`.
    pub fn open(uri: &str, passphrase: &str, create: bool) -> Result<Self> {
        let repo = RepoOpener::new()
            .create(create)
            .open(uri, passphrase)
            .map_err(|e| FsError::from_vault(e, uri))?;
        tracing::debug!(%uri, create, "Opened vault filesystem");
        Ok(Self::new(repo))
    }

    pub fn repo(&self) -> &Repo {
        &self.repo
    }

    pub fn into_inner(self) -> Repo {
        self.repo
    }

    pub fn close(&self) {
        self.repo.close();
    }

    /// Validate `path`, treating a relative path as relative to the root.
    fn resolve(&self, path: &str) -> Result<NormalizedPath> {
        let absolute = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        NormalizedPath::validate(&absolute).map_err(|e| FsError::from_vault(e, path))
    }

    fn probe(&self, path: &str, f: impl Fn(&Repo, &str) -> bool) -> bool {
        self.resolve(path)
            .map(|p| f(&self.repo, p.as_str()))
            .unwrap_or(false)
    }
}

impl Filesystem for VaultFs {
    type File = FileHandle;

    fn exists(&self, path: &str) -> bool {
        self.probe(path, Repo::path_exists)
    }

    fn isdir(&self, path: &str) -> bool {
        self.probe(path, Repo::is_dir)
    }

    fn isfile(&self, path: &str) -> bool {
        self.probe(path, Repo::is_file)
    }

    fn listdir(&self, path: &str) -> Result<Vec<String>> {
        let resolved = self.resolve(path)?;
        let entries = self
            .repo
            .read_dir(resolved.as_str())
            .map_err(|e| FsError::from_vault(e, path))?;
        Ok(entries.into_iter().map(|entry| entry.name).collect())
    }

    fn makedir(&self, path: &str, recreate: bool) -> Result<()> {
        let resolved = self.resolve(path)?;
        match self.repo.create_dir(resolved.as_str()) {
            Ok(()) => Ok(()),
            Err(Error::AlreadyExists { .. }) if recreate && self.repo.is_dir(resolved.as_str()) => {
                Ok(())
            }
            Err(Error::AlreadyExists { .. }) => Err(FsError::DirectoryExists {
                path: path.to_string(),
            }),
            Err(e) => Err(FsError::from_vault(e, path)),
        }
    }

    fn openbin(&self, path: &str, mode: &str) -> Result<FileHandle> {
        let resolved = self.resolve(path)?;
        match self.repo.open(resolved.as_str(), mode) {
            Ok(file) => Ok(file),
            // A file where a parent directory should be
            Err(Error::NotADirectory { .. }) => Err(FsError::ResourceNotFound {
                path: path.to_string(),
            }),
            Err(e) => Err(FsError::from_vault(e, path)),
        }
    }

    fn remove(&self, path: &str) -> Result<()> {
        let resolved = self.resolve(path)?;
        self.repo
            .remove_file(resolved.as_str())
            .map_err(|e| FsError::from_vault(e, path))
    }

    fn removedir(&self, path: &str) -> Result<()> {
        let resolved = self.resolve(path)?;
        self.repo
            .remove_dir(resolved.as_str())
            .map_err(|e| FsError::from_vault(e, path))
    }

    fn getinfo(&self, path: &str, namespaces: &[&str]) -> Result<Info> {
        let resolved = self.resolve(path)?;
        let meta = self
            .repo
            .metadata(resolved.as_str())
            .map_err(|e| FsError::from_vault(e, path))?;

        let details = namespaces.contains(&DETAILS).then(|| DetailsInfo {
            size: meta.len,
            resource_type: if meta.is_dir() {
                ResourceType::Directory
            } else {
                ResourceType::File
            },
            created: meta.created,
            modified: meta.modified,
        });
        Ok(Info {
            basic: BasicInfo {
                name: resolved.file_name().unwrap_or("").to_string(),
                is_dir: meta.is_dir(),
            },
            details,
        })
    }

    fn setinfo(&self, path: &str, update: &InfoUpdate) -> Result<()> {
        let resolved = self.resolve(path)?;
        if !self.repo.path_exists(resolved.as_str()) {
            return Err(FsError::ResourceNotFound {
                path: path.to_string(),
            });
        }
        if let Some(modified) = update.details.as_ref().and_then(|d| d.modified) {
            self.repo
                .set_modified(resolved.as_str(), modified)
                .map_err(|e| FsError::from_vault(e, path))?;
        }
        Ok(())
    }

    fn move_file(&self, src: &str, dst: &str, overwrite: bool) -> Result<()> {
        let from = self.resolve(src)?;
        let to = self.resolve(dst)?;
        if self.repo.is_dir(from.as_str()) {
            return Err(FsError::FileExpected {
                path: src.to_string(),
            });
        }
        self.repo
            .rename(from.as_str(), to.as_str(), overwrite)
            .map_err(|e| match e {
                Error::AlreadyExists { .. } | Error::NotAFile { .. } => {
                    FsError::DestinationExists {
                        path: dst.to_string(),
                    }
                }
                e => FsError::from_vault(e, src),
            })
    }

    fn copy(&self, src: &str, dst: &str, overwrite: bool) -> Result<()> {
        let from = self.resolve(src)?;
        let to = self.resolve(dst)?;
        if self.repo.is_dir(from.as_str()) {
            return Err(FsError::FileExpected {
                path: src.to_string(),
            });
        }
        self.repo
            .copy(from.as_str(), to.as_str(), overwrite)
            .map_err(|e| match e {
                Error::AlreadyExists { .. } | Error::NotAFile { .. } => {
                    FsError::DestinationExists {
                        path: dst.to_string(),
                    }
                }
                e => FsError::from_vault(e, src),
            })
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            case_insensitive: false,
            invalid_path_chars: "\0".to_string(),
            max_sys_path_length: None,
            read_only: self.repo.is_read_only(),
            supports_rename: true,
            thread_safe: true,
            unicode_paths: true,
            virtual_fs: true,
        }
    }
}
