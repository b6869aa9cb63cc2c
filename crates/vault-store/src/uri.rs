//! Storage location URIs (`mem://name`, `file:///path`).

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::{Error, Result};

const SEPARATOR: &str = "://";

/// A parsed storage URI.
///
/// The scheme selects the backend, the location is handed to it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreUri {
    scheme: String,
    location: String,
}

impl StoreUri {
    /// Parse a `scheme://location` string.
    ///
    /// The scheme is lowercased. `file` URIs require a non-empty location;
    /// `mem://` with no name addresses the anonymous volume.
    pub fn parse(uri: &str) -> Result<Self> {
        let (scheme, location) = uri
            .split_once(SEPARATOR)
            .ok_or_else(|| Error::invalid_uri(uri, "missing '://' separator"))?;

        if scheme.is_empty() {
            return Err(Error::invalid_uri(uri, "empty scheme"));
        }
        if !scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            return Err(Error::invalid_uri(uri, "scheme contains invalid characters"));
        }
        if location.contains('\0') {
            return Err(Error::invalid_uri(uri, "location contains a NUL byte"));
        }

        let scheme = scheme.to_ascii_lowercase();
        if scheme == "file" && location.is_empty() {
            return Err(Error::invalid_uri(uri, "file location must not be empty"));
        }

        Ok(Self {
            scheme,
            location: location.to_string(),
        })
    }

    /// Build a `file://` URI for a native directory.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            scheme: "file".to_string(),
            location: path.into().to_string_lossy().into_owned(),
        }
    }

    /// Build a `mem://` URI for a named in-process volume.
    pub fn mem(name: impl Into<String>) -> Self {
        Self {
            scheme: "mem".to_string(),
            location: name.into(),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl fmt::Display for StoreUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.scheme, SEPARATOR, self.location)
    }
}

impl FromStr for StoreUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
