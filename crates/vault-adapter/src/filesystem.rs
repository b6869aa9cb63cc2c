//! The generic filesystem capability contract

use std::io::{Read, Write};

use crate::{Capabilities, FsError, Info, InfoUpdate, Result};

/// Operations a higher-level framework expects from any filesystem.
///
/// Paths are `/`-separated; relative paths are taken relative to the root.
/// The provided methods are built on the required ones.
pub trait Filesystem {
    /// Open file returned by [`openbin`](Self::openbin).
    type File: Read + Write;

    /// Whether `path` exists; never fails.
    fn exists(&self, path: &str) -> bool;

    fn isdir(&self, path: &str) -> bool;

    fn isfile(&self, path: &str) -> bool;

    /// Names in a directory.
    fn listdir(&self, path: &str) -> Result<Vec<String>>;

    /// Create one directory. With `recreate`, an existing directory is fine.
    fn makedir(&self, path: &str, recreate: bool) -> Result<()>;

    /// Open a file in binary mode (`"r"`, `"w+"`, `"ab"`, ...).
    fn openbin(&self, path: &str, mode: &str) -> Result<Self::File>;

    /// Remove a file.
    fn remove(&self, path: &str) -> Result<()>;

    /// Remove an empty directory.
    fn removedir(&self, path: &str) -> Result<()>;

    /// Information in the `basic` namespace plus any requested ones.
    fn getinfo(&self, path: &str, namespaces: &[&str]) -> Result<Info>;

    fn setinfo(&self, path: &str, update: &InfoUpdate) -> Result<()>;

    /// Move a file; directories are refused with `FileExpected`.
    fn move_file(&self, src: &str, dst: &str, overwrite: bool) -> Result<()>;

    /// Copy a file.
    fn copy(&self, src: &str, dst: &str, overwrite: bool) -> Result<()>;

    fn capabilities(&self) -> Capabilities;

    /// Whole content of a file.
    fn readbytes(&self, path: &str) -> Result<Vec<u8>> {
        let mut file = self.openbin(path, "rb")?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| FsError::from_io(e, path))?;
        Ok(data)
    }

    /// Replace the content of a file, creating it if needed.
    fn writebytes(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut file = self.openbin(path, "wb")?;
        file.write_all(data)
            .and_then(|()| file.flush())
            .map_err(|e| FsError::from_io(e, path))
    }

    /// Create a directory and its missing ancestors.
    ///
    /// Fails with `DirectoryExists` if the directory exists and `exist_ok`
    /// is false.
    fn makedirs(&self, path: &str, exist_ok: bool) -> Result<()> {
        let exists = || FsError::DirectoryExists {
            path: path.to_string(),
        };
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        if parts.is_empty() {
            return if exist_ok { Ok(()) } else { Err(exists()) };
        }

        let mut current = String::new();
        for (idx, part) in parts.iter().enumerate() {
            current.push('/');
            current.push_str(part);
            let last = idx + 1 == parts.len();
            if self.isdir(&current) {
                if last && !exist_ok {
                    return Err(exists());
                }
                continue;
            }
            if self.isfile(&current) {
                return Err(FsError::DirectoryExpected { path: current });
            }
            self.makedir(&current, true)?;
        }
        Ok(())
    }

    /// Remove a directory and everything below it.
    ///
    /// On the root this empties the filesystem and keeps the root.
    fn removetree(&self, path: &str) -> Result<()> {
        if !self.isdir(path) {
            return Err(if self.exists(path) {
                FsError::DirectoryExpected {
                    path: path.to_string(),
                }
            } else {
                FsError::ResourceNotFound {
                    path: path.to_string(),
                }
            });
        }

        let base = path.trim_end_matches('/');
        for name in self.listdir(path)? {
            let child = format!("{base}/{name}");
            if self.isdir(&child) {
                self.removetree(&child)?;
            } else {
                self.remove(&child)?;
            }
        }

        match self.removedir(path) {
            Err(FsError::RemoveRoot { .. }) => {
                tracing::debug!("Emptied root directory, root kept");
                Ok(())
            }
            other => other,
        }
    }
}
