//! Directory listing.

use std::fs;
use std::path::Path;

use crate::error::FsError;
use crate::node::{Entry, NodeKind, Stat};

/// Something that can list the direct children of a directory.
///
/// Remote directories are listed through their local cache mirror, so a
/// single local implementation serves both.
pub trait DirLister {
    /// List the direct children of `dir`, unsorted.
    fn list(&self, dir: &Path) -> Result<Vec<Entry>, FsError>;
}

/// Lists directories straight from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalLister;

impl LocalLister {
    pub fn new() -> Self {
        Self
    }
}

impl DirLister for LocalLister {
    fn list(&self, dir: &Path) -> Result<Vec<Entry>, FsError> {
        let metadata = fs::metadata(dir).map_err(|e| FsError::io(dir, e))?;
        if !metadata.is_dir() {
            return Err(FsError::NotADirectory {
                path: dir.to_path_buf(),
            });
        }

        let mut entries = Vec::new();
        for item in fs::read_dir(dir).map_err(|e| FsError::io(dir, e))? {
            let item = match item {
                Ok(item) => item,
                Err(e) => {
                    tracing::debug!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            entries.push(stat_entry(&item.path()));
        }
        Ok(entries)
    }
}

/// Stat a single path into an entry. Entries whose metadata vanished between
/// `read_dir` and `stat` are reported as plain files without a stat record.
pub fn stat_entry(path: &Path) -> Entry {
    match fs::symlink_metadata(path) {
        Ok(metadata) => {
            let kind = NodeKind::from_metadata(path, &metadata);
            Entry::new(path, kind, Some(Stat::from_metadata(&metadata)))
        }
        Err(_) => Entry::new(path, NodeKind::File { executable: false }, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_lister_reads_children() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("subdir")).unwrap();
        fs::write(tmp.path().join("a"), b"hello").unwrap();

        let mut entries = LocalLister.list(tmp.path()).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name.as_str(), "a");
        assert_eq!(entries[0].stat.map(|s| s.size), Some(5));
        assert!(entries[1].kind.is_dir());
    }

    #[test]
    fn test_local_lister_rejects_files() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a");
        fs::write(&file, b"x").unwrap();

        assert!(matches!(
            LocalLister.list(&file),
            Err(FsError::NotADirectory { .. })
        ));
        assert!(LocalLister.list(&tmp.path().join("missing")).unwrap_err().is_not_found());
    }
}
