//! Absolute repository paths
//!
//! Every path that enters the repository goes through
//! [`NormalizedPath::validate`] first.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Longest allowed single path component, in bytes
pub const MAX_NAME_LEN: usize = 255;

/// A validated, absolute, `/`-separated repository path.
///
/// Redundant separators are collapsed and `.`/`..` components resolved;
/// `..` at the root stays at the root. The root is `/`; no other path ends
/// with a separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NormalizedPath {
    inner: String,
}

impl NormalizedPath {
    /// The root directory.
    pub fn root() -> Self {
        Self {
            inner: "/".to_string(),
        }
    }

    /// Validate and normalize a path string.
    ///
    /// Fails when the path is empty, relative, contains a NUL byte, or has a
    /// component longer than [`MAX_NAME_LEN`].
    pub fn validate(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::invalid_path(path, "path is empty"));
        }
        if path.contains('\0') {
            return Err(Error::invalid_path(path, "path contains a NUL byte"));
        }
        if !path.starts_with('/') {
            return Err(Error::invalid_path(path, "path is not absolute"));
        }

        let mut parts: Vec<&str> = Vec::new();
        for part in path.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                name if name.len() > MAX_NAME_LEN => {
                    return Err(Error::invalid_path(path, "name too long"));
                }
                name => parts.push(name),
            }
        }

        Ok(Self {
            inner: format!("/{}", parts.join("/")),
        })
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn is_root(&self) -> bool {
        self.inner == "/"
    }

    /// Names from the root down, excluding the root itself.
    pub fn components(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.inner.split('/').filter(|part| !part.is_empty())
    }

    /// Get the parent directory; `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.inner.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self {
                inner: self.inner[..idx].to_string(),
            }),
            None => None,
        }
    }

    /// Get the last component; `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.components().next_back()
    }

    /// Join a relative segment, normalizing the result.
    pub fn join(&self, segment: &str) -> Result<Self> {
        Self::validate(&format!("{}/{}", self.inner, segment))
    }

    /// Component-wise prefix test: `/a` is a prefix of `/a/b` but not `/ab`.
    pub fn starts_with(&self, base: &NormalizedPath) -> bool {
        base.is_root()
            || self.inner == base.inner
            || (self.inner.starts_with(&base.inner)
                && self.inner.as_bytes().get(base.inner.len()) == Some(&b'/'))
    }
}

impl AsRef<str> for NormalizedPath {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl FromStr for NormalizedPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::validate(s)
    }
}

impl TryFrom<&str> for NormalizedPath {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::validate(s)
    }
}
