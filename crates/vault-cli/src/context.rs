//! Repository context resolution
//!
//! Combines command-line flags, environment fallbacks and an optional
//! opener config file into everything needed to open a repository.

use std::path::Path;
use vault_fs::{ConfigStore, OpenerConfig, Repo};

use crate::error::{CliError, Result};

/// Where and how to open the repository for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub uri: String,
    passphrase: String,
    pub config: OpenerConfig,
}

impl Context {
    /// Resolve the context. Flags win over the config file.
    pub fn resolve(
        uri: Option<&str>,
        passphrase: Option<&str>,
        config_path: Option<&Path>,
    ) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading opener config");
                ConfigStore::new().load::<OpenerConfig>(path)?
            }
            None => OpenerConfig::default(),
        };

        let uri = uri
            .map(str::to_string)
            .or_else(|| config.uri.clone())
            .ok_or_else(|| {
                CliError::user("no repository URI; pass --uri, set VAULT_URI or use a config file")
            })?;
        let passphrase = passphrase
            .map(str::to_string)
            .ok_or_else(|| CliError::user("no passphrase; pass --passphrase or set VAULT_PASSPHRASE"))?;

        Ok(Self {
            uri,
            passphrase,
            config,
        })
    }

    /// Create the repository, replacing an existing one when `force` is set.
    pub fn create(&self, force: bool) -> Result<Repo> {
        let repo = self
            .config
            .opener()
            .create(true)
            .overwrite(force)
            .read_only(false)
            .open(&self.uri, &self.passphrase)?;
        Ok(repo)
    }

    /// Open an existing repository for inspection without taking the lock.
    pub fn open_read_only(&self) -> Result<Repo> {
        let repo = self
            .config
            .opener()
            .create(false)
            .overwrite(false)
            .read_only(true)
            .open(&self.uri, &self.passphrase)?;
        Ok(repo)
    }

    /// Open the repository for mutation, honouring the config file's
    /// `create` and `read_only` settings.
    pub fn open_writable(&self) -> Result<Repo> {
        let repo = self
            .config
            .opener()
            .overwrite(false)
            .open(&self.uri, &self.passphrase)?;
        Ok(repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn flags_take_precedence_over_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.toml");
        fs::write(&path, "uri = \"mem://from-config\"\nversion_limit = 4\n").unwrap();

        let ctx = Context::resolve(Some("mem://from-flag"), Some("pw"), Some(&path)).unwrap();
        assert_eq!(ctx.uri, "mem://from-flag");
        assert_eq!(ctx.config.version_limit, 4);

        let ctx = Context::resolve(None, Some("pw"), Some(&path)).unwrap();
        assert_eq!(ctx.uri, "mem://from-config");
    }

    #[test]
    fn missing_uri_is_a_user_error() {
        let err = Context::resolve(None, Some("pw"), None).unwrap_err();
        assert!(matches!(err, CliError::User { .. }));
        assert!(err.to_string().contains("VAULT_URI"));
    }

    #[test]
    fn missing_passphrase_is_a_user_error() {
        let err = Context::resolve(Some("mem://x"), None, None).unwrap_err();
        assert!(err.to_string().contains("VAULT_PASSPHRASE"));
    }

    #[test]
    fn unreadable_config_is_reported() {
        let err = Context::resolve(None, Some("pw"), Some(Path::new("/no/such/vault.yaml")))
            .unwrap_err();
        assert!(matches!(err, CliError::Fs(vault_fs::Error::Config { .. })));
    }

    #[test]
    fn create_then_open_read_only() {
        let ctx = Context::resolve(Some("mem://cli-context-create"), Some("pw"), None).unwrap();
        drop(ctx.create(false).unwrap());

        let repo = ctx.open_read_only().unwrap();
        assert!(repo.is_read_only());
    }
}
