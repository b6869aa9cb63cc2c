//! [`TestVault`] fixture for repository tests.

use std::path::Path;
use tempfile::TempDir;
use vault_fs::{Repo, RepoOpener};
use vault_store::{ObjectId, StoreUri};

/// Passphrase used by every fixture unless overridden.
pub const TEST_PASSPHRASE: &str = "correct horse battery staple";

/// Which storage backend a fixture uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Mem,
    File,
}

/// A unique repository location that lives as long as the fixture.
///
/// `mem://` fixtures get a fresh volume name; `file://` fixtures get a
/// temporary directory that is removed on drop.
///
/// # Example
///
/// ```rust,no_run
/// use vault_test_utils::TestVault;
///
/// let vault = TestVault::mem();
/// let repo = vault.create();
/// TestVault::seed(&repo, &[("/docs/a.txt", b"alpha")]);
/// TestVault::assert_content(&repo, "/docs/a.txt", b"alpha");
/// ```
#[derive(Debug)]
pub struct TestVault {
    uri: String,
    passphrase: String,
    temp_dir: Option<TempDir>,
}

impl TestVault {
    pub fn new(backend: Backend) -> Self {
        match backend {
            Backend::Mem => Self::mem(),
            Backend::File => Self::file(),
        }
    }

    /// Fresh in-memory location.
    pub fn mem() -> Self {
        Self {
            uri: StoreUri::mem(format!("test-{}", ObjectId::new())).to_string(),
            passphrase: TEST_PASSPHRASE.to_string(),
            temp_dir: None,
        }
    }

    /// Fresh on-disk location under a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let uri = StoreUri::file(temp_dir.path().join("vault")).to_string();
        Self {
            uri,
            passphrase: TEST_PASSPHRASE.to_string(),
            temp_dir: Some(temp_dir),
        }
    }

    pub fn with_passphrase(mut self, passphrase: &str) -> Self {
        self.passphrase = passphrase.to_string();
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    /// Directory holding the `file://` repository, `None` for `mem://`.
    pub fn root(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Create the repository, panicking on failure.
    pub fn create(&self) -> Repo {
        self.create_with(RepoOpener::new())
    }

    /// Create the repository with extra opener settings.
    pub fn create_with(&self, opener: RepoOpener) -> Repo {
        opener
            .create(true)
            .open(&self.uri, &self.passphrase)
            .unwrap_or_else(|e| panic!("TestVault::create {}: {e}", self.uri))
    }

    /// Reopen the existing repository for writing.
    pub fn open(&self) -> Repo {
        RepoOpener::new()
            .open(&self.uri, &self.passphrase)
            .unwrap_or_else(|e| panic!("TestVault::open {}: {e}", self.uri))
    }

    /// Reopen the existing repository without taking the writer lock.
    pub fn open_read_only(&self) -> Repo {
        RepoOpener::new()
            .read_only(true)
            .open(&self.uri, &self.passphrase)
            .unwrap_or_else(|e| panic!("TestVault::open_read_only {}: {e}", self.uri))
    }

    /// Write files, creating their parent directories.
    pub fn seed(repo: &Repo, files: &[(&str, &[u8])]) {
        for (path, content) in files {
            if let Some((parent, _)) = path.rsplit_once('/') {
                if !parent.is_empty() {
                    repo.create_dir_all(parent).unwrap();
                }
            }
            repo.write_all(path, content).unwrap();
        }
    }

    /// Assert the current content of a file.
    ///
    /// # Panics
    /// Panics with the path and both contents on mismatch.
    pub fn assert_content(repo: &Repo, path: &str, expected: &[u8]) {
        let actual = repo
            .read_all(path)
            .unwrap_or_else(|e| panic!("Expected readable file {path}: {e}"));
        assert!(
            actual == expected,
            "Content mismatch at {path}: expected {:?}, got {:?}",
            String::from_utf8_lossy(expected),
            String::from_utf8_lossy(&actual)
        );
    }

    /// Assert the names listed in a directory, in order.
    pub fn assert_listing(repo: &Repo, path: &str, expected: &[&str]) {
        let names: Vec<String> = repo
            .read_dir(path)
            .unwrap_or_else(|e| panic!("Expected directory {path}: {e}"))
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(names, expected, "Listing mismatch at {path}");
    }
}
