//! Resource information and filesystem capabilities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a resource, numbered as in the wider filesystem contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Unknown = 0,
    Directory = 1,
    File = 2,
    Character = 3,
    BlockSpecialFile = 4,
    Fifo = 5,
    Socket = 6,
    Symlink = 7,
}

impl ResourceType {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// The `basic` namespace, always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicInfo {
    /// Last path component; empty for the root
    pub name: String,
    pub is_dir: bool,
}

/// The `details` namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsInfo {
    pub size: u64,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// Information about one resource, split into namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    pub basic: BasicInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<DetailsInfo>,
}

impl Info {
    pub fn name(&self) -> &str {
        &self.basic.name
    }

    pub fn is_dir(&self) -> bool {
        self.basic.is_dir
    }

    pub fn is_file(&self) -> bool {
        !self.basic.is_dir
    }

    /// Size in bytes, if the `details` namespace was requested.
    pub fn size(&self) -> Option<u64> {
        self.details.as_ref().map(|d| d.size)
    }

    pub fn resource_type(&self) -> Option<ResourceType> {
        self.details.as_ref().map(|d| d.resource_type)
    }

    /// Whether a namespace is present in this info.
    pub fn has_namespace(&self, namespace: &str) -> bool {
        match namespace {
            "basic" => true,
            "details" => self.details.is_some(),
            _ => false,
        }
    }
}

/// Writable fields of the `details` namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsUpdate {
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

/// Changes applied by [`Filesystem::setinfo`](crate::Filesystem::setinfo).
///
/// Only `details.modified` is applied. Unknown namespaces and fields are
/// ignored when deserializing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoUpdate {
    #[serde(default)]
    pub details: Option<DetailsUpdate>,
}

impl InfoUpdate {
    pub fn modified(when: DateTime<Utc>) -> Self {
        Self {
            details: Some(DetailsUpdate {
                modified: Some(when),
            }),
        }
    }
}

/// What a filesystem implementation supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub case_insensitive: bool,
    pub invalid_path_chars: String,
    pub max_sys_path_length: Option<usize>,
    pub read_only: bool,
    pub supports_rename: bool,
    pub thread_safe: bool,
    pub unicode_paths: bool,
    pub virtual_fs: bool,
}
