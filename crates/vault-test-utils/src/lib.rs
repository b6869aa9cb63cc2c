//! Shared test utilities for the vault workspace.
//!
//! Dev-dependency only, never published.
//!
//! - [`vault`]: [`TestVault`] fixture over `mem://` or a temporary `file://` root

pub mod vault;

pub use vault::{Backend, TestVault};
