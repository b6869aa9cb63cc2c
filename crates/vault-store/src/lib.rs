//! Versioned object storage for the vault filesystem
//!
//! A storage location holds a superblock and a set of objects, each with a
//! bounded history of versions. The backend is chosen by URI scheme:
//!
//! - `mem://name` - process-global volatile volume
//! - `file:///path` - durable directory on the local filesystem
//!
//! Other schemes plug in by implementing [`Storage`].

pub mod backend;
pub mod checksum;
pub mod error;
pub mod file;
pub mod io;
pub mod mem;
pub mod object;
pub mod superblock;
pub mod uri;

pub use backend::{Storage, StorageLock, open_storage};
pub use checksum::{compute_checksum, verify_checksum};
pub use error::{Error, Result};
pub use file::FileStorage;
pub use io::RobustnessConfig;
pub use mem::MemStorage;
pub use object::{ObjectId, VersionInfo};
pub use superblock::{DEFAULT_VERSION_LIMIT, FORMAT_VERSION, Superblock};
pub use uri::StoreUri;
