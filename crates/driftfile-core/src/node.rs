//! File and directory node types.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Unique identifier for a node within a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Create a new NodeId from a u64.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Cached stat record for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Last modification time.
    pub modified: Option<SystemTime>,
    /// Last access time (if available).
    pub accessed: Option<SystemTime>,
    /// Last status change time (unix only).
    pub changed: Option<SystemTime>,
}

impl Stat {
    /// Build a stat record from filesystem metadata.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            size: if metadata.is_dir() { 0 } else { metadata.len() },
            modified: metadata.modified().ok(),
            accessed: metadata.accessed().ok(),
            changed: changed_time(metadata),
        }
    }
}

#[cfg(unix)]
fn changed_time(metadata: &Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;
    let secs = u64::try_from(metadata.ctime()).ok()?;
    let nanos = u32::try_from(metadata.ctime_nsec()).ok()?;
    SystemTime::UNIX_EPOCH.checked_add(std::time::Duration::new(secs, nanos))
}

#[cfg(not(unix))]
fn changed_time(_metadata: &Metadata) -> Option<SystemTime> {
    None
}

/// Type of file system node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Regular file.
    File {
        /// Whether the file is executable.
        executable: bool,
    },
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink {
        /// Link target path.
        target: CompactString,
        /// Whether the link resolves to a directory.
        to_dir: bool,
        /// Whether the link target exists.
        broken: bool,
    },
}

impl NodeKind {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, NodeKind::Directory)
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, NodeKind::File { .. })
    }

    /// Check if this is a symlink.
    pub fn is_symlink(&self) -> bool {
        matches!(self, NodeKind::Symlink { .. })
    }

    /// Directories and links to directories can be expanded.
    pub fn is_expandable(&self) -> bool {
        match self {
            NodeKind::Directory => true,
            NodeKind::Symlink { to_dir, broken, .. } => *to_dir && !*broken,
            NodeKind::File { .. } => false,
        }
    }

    /// Derive the kind for `path` from its (non-followed) metadata.
    pub fn from_metadata(path: &Path, metadata: &Metadata) -> Self {
        let file_type = metadata.file_type();
        if file_type.is_symlink() {
            let target = std::fs::read_link(path)
                .map(|t| CompactString::from(t.to_string_lossy().as_ref()))
                .unwrap_or_default();
            let resolved = std::fs::metadata(path);
            NodeKind::Symlink {
                target,
                to_dir: resolved.as_ref().is_ok_and(|m| m.is_dir()),
                broken: resolved.is_err(),
            }
        } else if file_type.is_dir() {
            NodeKind::Directory
        } else {
            NodeKind::File {
                executable: is_executable(metadata),
            }
        }
    }
}

#[cfg(unix)]
fn is_executable(metadata: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &Metadata) -> bool {
    false
}

/// One directory entry as produced by a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Absolute path.
    pub path: PathBuf,
    /// File name (not full path).
    pub name: CompactString,
    /// Node type.
    pub kind: NodeKind,
    /// Stat record, if it could be read.
    pub stat: Option<Stat>,
}

impl Entry {
    /// Create an entry with explicit fields.
    pub fn new(path: impl Into<PathBuf>, kind: NodeKind, stat: Option<Stat>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| CompactString::from(n.to_string_lossy().as_ref()))
            .unwrap_or_else(|| CompactString::from(path.to_string_lossy().as_ref()));
        Self {
            path,
            name,
            kind,
            stat,
        }
    }

    /// Whether the entry is a dot-file.
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// A single file or directory in a view tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    /// Unique identifier for this node.
    pub id: NodeId,

    /// Listing record (path, name, kind, stat).
    pub entry: Entry,

    /// Nesting depth; root-level nodes have depth 0.
    pub depth: u32,

    /// Expansion state (directories only).
    pub expanded: bool,

    /// Children in sort order. Kept while collapsed and reconciled on re-expand.
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Create a collapsed node for a listing entry.
    pub fn new(id: NodeId, entry: Entry, depth: u32) -> Self {
        Self {
            id,
            entry,
            depth,
            expanded: false,
            children: Vec::new(),
        }
    }

    /// Absolute path of the node.
    pub fn path(&self) -> &Path {
        &self.entry.path
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.entry.name
    }

    /// Node kind.
    pub fn kind(&self) -> &NodeKind {
        &self.entry.kind
    }

    /// Check if this node can hold children.
    pub fn is_dir(&self) -> bool {
        self.entry.kind.is_expandable()
    }

    /// Get the number of direct children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Depth-first search for a node by id.
    pub fn find(&self, id: NodeId) -> Option<&TreeNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Mutable depth-first search for a node by id.
    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Visit this node and every descendant, cached or visible.
    pub fn walk<'a>(&'a self, out: &mut Vec<&'a TreeNode>) {
        out.push(self);
        for child in &self.children {
            child.walk(out);
        }
    }
}
