//! In-memory directory hierarchy
//!
//! The tree maps paths to nodes; file nodes point at a storage object and
//! record the version the tree currently considers committed. It never
//! touches storage itself: mutations report which objects became
//! unreachable so the caller can delete them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vault_store::ObjectId;

use crate::{Error, NormalizedPath, Result};

/// Kind of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Dir,
    File,
}

/// Metadata of one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub kind: EntryKind,
    /// Content length for files, 0 for directories
    pub len: u64,
    /// Current committed version for files, 0 for directories
    pub curr_version: u64,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Metadata {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// One child of a directory, as returned by [`DirectoryTree::read_dir`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    pub name: String,
    pub path: NormalizedPath,
    pub metadata: Metadata,
}

/// Storage binding of a file entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileState {
    pub object: ObjectId,
    pub len: u64,
    pub version: u64,
}

/// Which entries a removal accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveMode {
    /// A file or an empty directory
    Any,
    /// Files only
    File,
    /// Empty directories only
    EmptyDir,
    /// A directory and everything below it
    Tree,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum NodeKind {
    Dir { children: BTreeMap<String, Node> },
    File(FileState),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Node {
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
    kind: NodeKind,
}

impl Node {
    fn dir() -> Self {
        let now = Utc::now();
        Self {
            created: now,
            modified: now,
            kind: NodeKind::Dir {
                children: BTreeMap::new(),
            },
        }
    }

    fn file(state: FileState) -> Self {
        let now = Utc::now();
        Self {
            created: now,
            modified: now,
            kind: NodeKind::File(state),
        }
    }

    fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Dir { .. })
    }

    fn children(&self) -> Option<&BTreeMap<String, Node>> {
        match &self.kind {
            NodeKind::Dir { children } => Some(children),
            NodeKind::File(_) => None,
        }
    }

    fn children_mut(&mut self) -> Option<&mut BTreeMap<String, Node>> {
        match &mut self.kind {
            NodeKind::Dir { children } => Some(children),
            NodeKind::File(_) => None,
        }
    }

    fn metadata(&self) -> Metadata {
        let (kind, len, curr_version) = match &self.kind {
            NodeKind::Dir { .. } => (EntryKind::Dir, 0, 0),
            NodeKind::File(state) => (EntryKind::File, state.len, state.version),
        };
        Metadata {
            kind,
            len,
            curr_version,
            created: self.created,
            modified: self.modified,
        }
    }

    /// File objects in this subtree, descendants before ancestors.
    fn collect_objects(&self, out: &mut Vec<ObjectId>) {
        match &self.kind {
            NodeKind::Dir { children } => {
                for child in children.values() {
                    child.collect_objects(out);
                }
            }
            NodeKind::File(state) => out.push(state.object),
        }
    }

    fn find_file_mut(&mut self, object: ObjectId) -> Option<&mut Node> {
        if matches!(&self.kind, NodeKind::File(state) if state.object == object) {
            return Some(self);
        }
        self.children_mut()?
            .values_mut()
            .find_map(|child| child.find_file_mut(object))
    }
}

/// The directory hierarchy of one repository, rooted at `/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryTree {
    root: Node,
}

impl Default for DirectoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryTree {
    /// A tree holding only the empty root directory.
    pub fn new() -> Self {
        Self { root: Node::dir() }
    }

    fn node(&self, path: &NormalizedPath) -> Option<&Node> {
        let mut current = &self.root;
        for name in path.components() {
            current = current.children()?.get(name)?;
        }
        Some(current)
    }

    fn node_mut(&mut self, path: &NormalizedPath) -> Option<&mut Node> {
        let mut current = &mut self.root;
        for name in path.components() {
            current = current.children_mut()?.get_mut(name)?;
        }
        Some(current)
    }

    fn dir_mut(&mut self, path: &NormalizedPath) -> Result<&mut Node> {
        match self.node_mut(path) {
            None => Err(Error::NotFound {
                path: path.to_string(),
            }),
            Some(node) if !node.is_dir() => Err(Error::NotADirectory {
                path: path.to_string(),
            }),
            Some(node) => Ok(node),
        }
    }

    /// Parent directory node and leaf name of a non-root path.
    fn parent_of(&mut self, path: &NormalizedPath) -> Result<(&mut Node, String)> {
        let (parent, name) = match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) => (parent, name.to_string()),
            _ => {
                return Err(Error::IsRoot {
                    path: path.to_string(),
                });
            }
        };
        Ok((self.dir_mut(&parent)?, name))
    }

    /// Insert `node` under a non-existing path whose parent is a directory.
    fn insert(&mut self, path: &NormalizedPath, node: Node) -> Result<()> {
        let (parent, name) = self.parent_of(path)?;
        let children = parent.children_mut().ok_or_else(|| Error::NotADirectory {
            path: path.to_string(),
        })?;
        if children.contains_key(&name) {
            return Err(Error::AlreadyExists {
                path: path.to_string(),
            });
        }
        children.insert(name, node);
        parent.modified = Utc::now();
        Ok(())
    }

    fn detach(&mut self, path: &NormalizedPath) -> Result<Node> {
        let (parent, name) = self.parent_of(path)?;
        let node = parent
            .children_mut()
            .and_then(|children| children.remove(&name))
            .ok_or_else(|| Error::NotFound {
                path: path.to_string(),
            })?;
        parent.modified = Utc::now();
        Ok(node)
    }

    pub fn exists(&self, path: &NormalizedPath) -> bool {
        self.node(path).is_some()
    }

    pub fn is_dir(&self, path: &NormalizedPath) -> bool {
        self.node(path).is_some_and(Node::is_dir)
    }

    pub fn is_file(&self, path: &NormalizedPath) -> bool {
        self.node(path).is_some_and(|node| !node.is_dir())
    }

    pub fn metadata(&self, path: &NormalizedPath) -> Result<Metadata> {
        self.node(path)
            .map(Node::metadata)
            .ok_or_else(|| Error::NotFound {
                path: path.to_string(),
            })
    }

    /// Storage binding of the file at `path`.
    pub fn file_state(&self, path: &NormalizedPath) -> Result<FileState> {
        match self.node(path).map(|node| &node.kind) {
            Some(NodeKind::File(state)) => Ok(*state),
            Some(NodeKind::Dir { .. }) => Err(Error::NotAFile {
                path: path.to_string(),
            }),
            None => Err(Error::NotFound {
                path: path.to_string(),
            }),
        }
    }

    /// Whether some file entry is bound to `object`.
    pub fn contains_object(&self, object: ObjectId) -> bool {
        let mut objects = Vec::new();
        self.root.collect_objects(&mut objects);
        objects.contains(&object)
    }

    /// Snapshot of a directory's children in name order.
    pub fn read_dir(&self, path: &NormalizedPath) -> Result<Vec<DirEntry>> {
        let node = self.node(path).ok_or_else(|| Error::NotFound {
            path: path.to_string(),
        })?;
        let children = node.children().ok_or_else(|| Error::NotADirectory {
            path: path.to_string(),
        })?;

        children
            .iter()
            .map(|(name, child)| {
                Ok(DirEntry {
                    name: name.clone(),
                    path: path.join(name)?,
                    metadata: child.metadata(),
                })
            })
            .collect()
    }

    /// Create one directory whose parent exists.
    pub fn create_dir(&mut self, path: &NormalizedPath) -> Result<()> {
        if path.is_root() {
            return Err(Error::AlreadyExists {
                path: path.to_string(),
            });
        }
        self.insert(path, Node::dir())
    }

    /// Create a directory and every missing ancestor.
    ///
    /// Succeeds without change if `path` already is a directory.
    pub fn create_dir_all(&mut self, path: &NormalizedPath) -> Result<()> {
        let mut walked = NormalizedPath::root();
        for name in path.components() {
            walked = walked.join(name)?;
            match self.node(&walked) {
                Some(node) if node.is_dir() => {}
                Some(_) => {
                    return Err(Error::NotADirectory {
                        path: walked.to_string(),
                    });
                }
                None => self.insert(&walked, Node::dir())?,
            }
        }
        Ok(())
    }

    /// Add a new file entry.
    pub fn create_file(&mut self, path: &NormalizedPath, state: FileState) -> Result<()> {
        if path.is_root() {
            return Err(Error::AlreadyExists {
                path: path.to_string(),
            });
        }
        self.insert(path, Node::file(state))
    }

    /// Point the file bound to `object` at a newly committed version.
    pub fn commit_file(&mut self, object: ObjectId, len: u64, version: u64) -> Result<()> {
        let node = self
            .root
            .find_file_mut(object)
            .ok_or_else(|| Error::NotFound {
                path: object.to_string(),
            })?;
        node.kind = NodeKind::File(FileState {
            object,
            len,
            version,
        });
        node.modified = Utc::now();
        Ok(())
    }

    pub fn set_modified(&mut self, path: &NormalizedPath, modified: DateTime<Utc>) -> Result<()> {
        let node = self.node_mut(path).ok_or_else(|| Error::NotFound {
            path: path.to_string(),
        })?;
        node.modified = modified;
        Ok(())
    }

    /// Remove an entry, returning the storage objects that became unreachable.
    pub fn remove(&mut self, path: &NormalizedPath, mode: RemoveMode) -> Result<Vec<ObjectId>> {
        if path.is_root() {
            return Err(Error::IsRoot {
                path: path.to_string(),
            });
        }
        let node = self.node(path).ok_or_else(|| Error::NotFound {
            path: path.to_string(),
        })?;

        match (mode, node.children()) {
            (RemoveMode::File, Some(_)) => {
                return Err(Error::NotAFile {
                    path: path.to_string(),
                });
            }
            (RemoveMode::EmptyDir | RemoveMode::Tree, None) => {
                return Err(Error::NotADirectory {
                    path: path.to_string(),
                });
            }
            (RemoveMode::Any | RemoveMode::EmptyDir, Some(children)) if !children.is_empty() => {
                return Err(Error::DirectoryNotEmpty {
                    path: path.to_string(),
                });
            }
            _ => {}
        }

        let node = self.detach(path)?;
        let mut objects = Vec::new();
        node.collect_objects(&mut objects);
        Ok(objects)
    }

    /// Check that `node_is_dir` may land on `dst`, returning the objects a
    /// replacement would drop.
    fn check_destination(
        &self,
        node_is_dir: bool,
        dst: &NormalizedPath,
        overwrite: bool,
    ) -> Result<Vec<ObjectId>> {
        if dst.is_root() {
            return Err(Error::IsRoot {
                path: dst.to_string(),
            });
        }
        let parent = dst.parent().unwrap_or_else(NormalizedPath::root);
        match self.node(&parent) {
            None => {
                return Err(Error::NotFound {
                    path: parent.to_string(),
                });
            }
            Some(node) if !node.is_dir() => {
                return Err(Error::NotADirectory {
                    path: parent.to_string(),
                });
            }
            Some(_) => {}
        }

        let Some(existing) = self.node(dst) else {
            return Ok(Vec::new());
        };
        let occupied_dir = existing.children().is_some_and(|c| !c.is_empty());
        if !overwrite || occupied_dir {
            return Err(Error::AlreadyExists {
                path: dst.to_string(),
            });
        }
        match (node_is_dir, existing.is_dir()) {
            (false, true) => Err(Error::NotAFile {
                path: dst.to_string(),
            }),
            (true, false) => Err(Error::NotADirectory {
                path: dst.to_string(),
            }),
            _ => {
                let mut objects = Vec::new();
                existing.collect_objects(&mut objects);
                Ok(objects)
            }
        }
    }

    /// Move an entry, returning the objects of a replaced destination.
    pub fn rename(
        &mut self,
        src: &NormalizedPath,
        dst: &NormalizedPath,
        overwrite: bool,
    ) -> Result<Vec<ObjectId>> {
        if src.is_root() {
            return Err(Error::IsRoot {
                path: src.to_string(),
            });
        }
        let src_is_dir = self
            .node(src)
            .map(Node::is_dir)
            .ok_or_else(|| Error::NotFound {
                path: src.to_string(),
            })?;
        if src == dst {
            return Ok(Vec::new());
        }
        if dst.starts_with(src) {
            return Err(Error::invalid_argument(format!(
                "cannot move {} into its own subtree {}",
                src, dst
            )));
        }

        let replaced = self.check_destination(src_is_dir, dst, overwrite)?;
        if self.exists(dst) {
            self.detach(dst)?;
        }
        let node = self.detach(src)?;
        self.insert(dst, node)?;
        Ok(replaced)
    }

    /// Validate a file copy, returning the source binding.
    pub fn check_copy(
        &self,
        src: &NormalizedPath,
        dst: &NormalizedPath,
        overwrite: bool,
    ) -> Result<FileState> {
        let state = self.file_state(src)?;
        if src == dst {
            return Err(Error::AlreadyExists {
                path: dst.to_string(),
            });
        }
        self.check_destination(false, dst, overwrite)?;
        Ok(state)
    }

    /// Place a copied file at `dst`, replacing an existing file if allowed.
    pub fn place_copy(
        &mut self,
        dst: &NormalizedPath,
        state: FileState,
        overwrite: bool,
    ) -> Result<Vec<ObjectId>> {
        let replaced = self.check_destination(false, dst, overwrite)?;
        if self.exists(dst) {
            self.detach(dst)?;
        }
        self.insert(dst, Node::file(state))?;
        Ok(replaced)
    }
}
