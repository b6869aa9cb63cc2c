//! Path-addressed filesystem over versioned storage
//!
//! A [`Repo`] maps absolute paths onto objects in a [`vault_store::Storage`]
//! backend and hands out [`FileHandle`]s with stream semantics:
//!
//! ```no_run
//! use vault_fs::{RepoOpener, Whence};
//!
//! # fn main() -> vault_fs::Result<()> {
//! let repo = RepoOpener::new().create(true).open("mem://docs", "secret")?;
//! repo.create_dir("/notes")?;
//!
//! let mut file = repo.open("/notes/today.txt", "w+")?;
//! file.write(b"hello\nworld\n")?;
//! file.seek(0, Whence::Start)?;
//! assert_eq!(file.readline()?, b"hello\n");
//! file.close()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod file;
pub mod path;
pub mod repo;
pub mod tree;

pub use config::{ConfigStore, OpenerConfig};
pub use error::{Error, Result};
pub use file::{FileHandle, Lines, OpenMode, Whence};
pub use path::{MAX_NAME_LEN, NormalizedPath};
pub use repo::{Repo, RepoInfo, RepoOpener};
pub use tree::{DirEntry, EntryKind, Metadata};
