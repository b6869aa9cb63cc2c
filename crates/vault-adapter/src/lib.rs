//! Generic filesystem capability contract for vault repositories
//!
//! [`Filesystem`] is the interface frameworks program against;
//! [`VaultFs`] implements it over a [`vault_fs::Repo`]. Core errors are
//! translated into the [`FsError`] taxonomy with the caller's path.

pub mod error;
pub mod filesystem;
pub mod info;
pub mod vault;

pub use error::{FsError, Result};
pub use filesystem::Filesystem;
pub use info::{BasicInfo, Capabilities, DetailsInfo, DetailsUpdate, Info, InfoUpdate, ResourceType};
pub use vault::{DETAILS, VaultFs};
