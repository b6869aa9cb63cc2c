//! Opener configuration files

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fs;
use std::path::Path;
use vault_store::{DEFAULT_VERSION_LIMIT, RobustnessConfig};

use crate::{Error, RepoOpener, Result};

/// How to open a repository, as stored in a config file.
///
/// ```toml
/// uri = "file:///srv/vault"
/// create = true
/// version_limit = 5
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenerConfig {
    /// Repository location; command-line arguments take precedence
    pub uri: Option<String>,
    pub create: bool,
    pub overwrite: bool,
    pub read_only: bool,
    pub version_limit: u8,
}

impl Default for OpenerConfig {
    fn default() -> Self {
        Self {
            uri: None,
            create: false,
            overwrite: false,
            read_only: false,
            version_limit: DEFAULT_VERSION_LIMIT,
        }
    }
}

impl OpenerConfig {
    pub fn opener(&self) -> RepoOpener {
        RepoOpener::new()
            .create(self.create)
            .overwrite(self.overwrite)
            .read_only(self.read_only)
            .version_limit(self.version_limit)
    }
}

impl From<&OpenerConfig> for RepoOpener {
    fn from(config: &OpenerConfig) -> Self {
        config.opener()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

fn format_of(path: &Path) -> Result<Format> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    match extension.as_str() {
        "toml" => Ok(Format::Toml),
        "json" => Ok(Format::Json),
        other => Err(Error::Config {
            path: path.display().to_string(),
            message: format!("unsupported config format '{other}'"),
        }),
    }
}

/// Format-agnostic configuration store.
///
/// The format follows the file extension: `.toml` or `.json`.
#[derive(Debug, Default)]
pub struct ConfigStore {
    robustness: RobustnessConfig,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_robustness(robustness: RobustnessConfig) -> Self {
        Self { robustness }
    }

    pub fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let config_err = |message: String| Error::Config {
            path: path.display().to_string(),
            message,
        };
        let format = format_of(path)?;
        let content = fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;

        match format {
            Format::Toml => toml::from_str(&content).map_err(|e| config_err(e.to_string())),
            Format::Json => serde_json::from_str(&content).map_err(|e| config_err(e.to_string())),
        }
    }

    /// Save a value, replacing the file atomically.
    pub fn save<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let config_err = |message: String| Error::Config {
            path: path.display().to_string(),
            message,
        };
        let content = match format_of(path)? {
            Format::Toml => toml::to_string_pretty(value).map_err(|e| config_err(e.to_string()))?,
            Format::Json => {
                serde_json::to_string_pretty(value).map_err(|e| config_err(e.to_string()))?
            }
        };

        vault_store::io::write_atomic(path, content.as_bytes(), self.robustness)
            .map_err(|e| Error::storage(path.display().to_string(), e))
    }
}
