//! Remote mounts, path classification and the sync tool's command set.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};

use driftfile_core::{EngineConfig, FsError};

use crate::job::JobCommand;
use crate::ledger::CacheLedger;

/// A remote store mirrored into a local cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMount {
    pub name: String,
    /// Root understood by the sync tool, e.g. `gdrive:` or `store:/base`.
    pub remote_root: String,
    pub cache_dir: PathBuf,
}

impl RemoteMount {
    pub fn new(
        name: impl Into<String>,
        remote_root: impl Into<String>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            remote_root: remote_root.into(),
            cache_dir: cache_dir.into(),
        }
    }

    /// Store address for a path relative to the cache directory.
    pub fn store_path(&self, rel: &Path) -> String {
        let rel = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");

        if rel.is_empty() {
            self.remote_root.clone()
        } else if self.remote_root.ends_with(':') || self.remote_root.ends_with('/') {
            format!("{}{}", self.remote_root, rel)
        } else {
            format!("{}/{}", self.remote_root, rel)
        }
    }
}

/// Where a path lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Remote {
        /// Name of the owning mount.
        mount: String,
        /// Path inside the cache mirror.
        cache: PathBuf,
        /// Address of the same entry in the store.
        store: String,
    },
}

impl Location {
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

/// All configured mounts.
#[derive(Debug, Clone, Default)]
pub struct MountTable {
    mounts: Vec<RemoteMount>,
}

impl MountTable {
    pub fn new(mounts: Vec<RemoteMount>) -> Self {
        Self { mounts }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config
                .remotes
                .iter()
                .map(|r| RemoteMount::new(&r.name, &r.remote_root, config.cache_dir_for(r)))
                .collect(),
        )
    }

    pub fn mounts(&self) -> &[RemoteMount] {
        &self.mounts
    }

    pub fn get(&self, name: &str) -> Option<&RemoteMount> {
        self.mounts.iter().find(|m| m.name == name)
    }

    /// Mount whose cache directory contains `path`. The deepest cache wins
    /// when caches nest.
    pub fn mount_for(&self, path: &Path) -> Option<&RemoteMount> {
        self.mounts
            .iter()
            .filter(|m| path.starts_with(&m.cache_dir))
            .max_by_key(|m| m.cache_dir.components().count())
    }

    /// Classify a path by cache containment.
    pub fn resolve(&self, path: &Path) -> Location {
        match self.mount_for(path) {
            Some(mount) => {
                let rel = path.strip_prefix(&mount.cache_dir).unwrap_or(Path::new(""));
                Location::Remote {
                    mount: mount.name.clone(),
                    cache: path.to_path_buf(),
                    store: mount.store_path(rel),
                }
            }
            None => Location::Local(path.to_path_buf()),
        }
    }
}

/// Builds invocations of an rclone-compatible sync tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTool {
    program: String,
}

impl SyncTool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn copyto(&self, src: impl AsRef<OsStr>, dst: impl AsRef<OsStr>) -> JobCommand {
        JobCommand::new(&self.program).arg("copyto").arg(src).arg(dst)
    }

    pub fn moveto(&self, src: impl AsRef<OsStr>, dst: impl AsRef<OsStr>) -> JobCommand {
        JobCommand::new(&self.program).arg("moveto").arg(src).arg(dst)
    }

    /// Remove a store directory and everything in it.
    pub fn purge(&self, target: &str) -> JobCommand {
        JobCommand::new(&self.program).arg("purge").arg(target)
    }

    pub fn deletefile(&self, target: &str) -> JobCommand {
        JobCommand::new(&self.program).arg("deletefile").arg(target)
    }

    pub fn mkdir(&self, target: &str) -> JobCommand {
        JobCommand::new(&self.program).arg("mkdir").arg(target)
    }

    /// Create an empty store file.
    pub fn touch(&self, target: &str) -> JobCommand {
        JobCommand::new(&self.program).arg("touch").arg(target)
    }

    /// List one store directory as `path;size` lines.
    pub fn lsf(&self, target: &str) -> JobCommand {
        JobCommand::new(&self.program)
            .args(["lsf", "--format", "ps", "--separator", ";"])
            .arg(target)
    }
}

/// One line of `lsf --format ps` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub is_dir: bool,
    /// Size in bytes; `None` for directories.
    pub size: Option<u64>,
}

/// Parse one listing line. Blank or malformed lines yield `None`.
pub fn parse_lsf_line(line: &str) -> Option<RemoteEntry> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (path, size) = line.rsplit_once(';')?;
    let is_dir = path.ends_with('/');
    let name = path.trim_end_matches('/');
    if name.is_empty() || name.contains('/') {
        return None;
    }
    let size = if is_dir {
        None
    } else {
        Some(size.trim().parse::<u64>().ok()?)
    };
    Some(RemoteEntry {
        name: name.to_string(),
        is_dir,
        size,
    })
}

/// Outcome of applying a listing to a cache directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingSync {
    pub created: usize,
    pub removed: usize,
}

/// Make `cache_dir` match a store listing.
///
/// Missing directories and files are created as empty placeholders; entries
/// the store no longer has are deleted and forgotten. Existing entries keep
/// their content, fresh or not.
pub fn apply_listing(
    cache_dir: &Path,
    entries: &[RemoteEntry],
    ledger: &mut CacheLedger,
) -> Result<ListingSync, FsError> {
    fs::create_dir_all(cache_dir).map_err(|e| FsError::io(cache_dir, e))?;
    let mut sync = ListingSync::default();

    let listed: HashSet<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    let existing = fs::read_dir(cache_dir).map_err(|e| FsError::io(cache_dir, e))?;
    for item in existing {
        let item = item.map_err(|e| FsError::io(cache_dir, e))?;
        let name = item.file_name();
        if listed.contains(name.to_string_lossy().as_ref()) {
            continue;
        }
        let path = item.path();
        let is_dir = item.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let removed = if is_dir {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|e| FsError::io(&path, e))?;
        ledger.forget(&path);
        sync.removed += 1;
    }

    for entry in entries {
        let path = cache_dir.join(&entry.name);
        if entry.is_dir {
            if path.is_file() {
                fs::remove_file(&path).map_err(|e| FsError::io(&path, e))?;
                ledger.forget(&path);
            }
            if !path.exists() {
                fs::create_dir(&path).map_err(|e| FsError::io(&path, e))?;
                sync.created += 1;
            }
        } else {
            if path.is_dir() {
                fs::remove_dir_all(&path).map_err(|e| FsError::io(&path, e))?;
                ledger.forget(&path);
            }
            if !path.exists() {
                fs::File::create(&path).map_err(|e| FsError::io(&path, e))?;
                sync.created += 1;
            }
        }
    }

    tracing::debug!(
        dir = %cache_dir.display(),
        created = sync.created,
        removed = sync.removed,
        "applied remote listing"
    );
    Ok(sync)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_path_joins() {
        let bare = RemoteMount::new("g", "gdrive:", "/cache/g");
        assert_eq!(bare.store_path(Path::new("a/b.txt")), "gdrive:a/b.txt");
        assert_eq!(bare.store_path(Path::new("")), "gdrive:");

        let based = RemoteMount::new("s", "store:/base", "/cache/s");
        assert_eq!(based.store_path(Path::new("x")), "store:/base/x");
    }

    #[test]
    fn test_resolve_prefers_deepest_cache() {
        let table = MountTable::new(vec![
            RemoteMount::new("outer", "outer:", "/cache"),
            RemoteMount::new("inner", "inner:", "/cache/inner"),
        ]);

        match table.resolve(Path::new("/cache/inner/doc.txt")) {
            Location::Remote { mount, store, .. } => {
                assert_eq!(mount, "inner");
                assert_eq!(store, "inner:doc.txt");
            }
            other => panic!("expected remote location, got {other:?}"),
        }
        assert!(!table.resolve(Path::new("/home/u/doc.txt")).is_remote());
        // Prefix match is by component, not by string.
        assert!(!table.resolve(Path::new("/cache2/x")).is_remote());
    }

    #[test]
    fn test_parse_lsf_line() {
        assert_eq!(
            parse_lsf_line("docs/;-1"),
            Some(RemoteEntry {
                name: "docs".into(),
                is_dir: true,
                size: None
            })
        );
        assert_eq!(
            parse_lsf_line("a;b.txt;12"),
            Some(RemoteEntry {
                name: "a;b.txt".into(),
                is_dir: false,
                size: Some(12)
            })
        );
        assert_eq!(parse_lsf_line(""), None);
        assert_eq!(parse_lsf_line("file;abc"), None);
    }

    #[test]
    fn test_lsf_command_shape() {
        let tool = SyncTool::new("rclone");
        assert_eq!(
            tool.lsf("gdrive:docs").to_string(),
            "rclone lsf --format ps --separator ; gdrive:docs"
        );
        assert_eq!(tool.copyto("a", "g:b").to_string(), "rclone copyto a g:b");
    }

    #[test]
    fn test_apply_listing_creates_and_prunes() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        fs::create_dir_all(cache.join("gone")).unwrap();
        fs::write(cache.join("kept.txt"), b"real content").unwrap();

        let mut ledger = CacheLedger::new();
        ledger.mark_fresh(cache.join("gone"));

        let entries = vec![
            parse_lsf_line("sub/;-1").unwrap(),
            parse_lsf_line("kept.txt;12").unwrap(),
            parse_lsf_line("new.txt;40").unwrap(),
        ];
        let sync = apply_listing(&cache, &entries, &mut ledger).unwrap();

        assert_eq!(sync, ListingSync { created: 2, removed: 1 });
        assert!(cache.join("sub").is_dir());
        assert_eq!(fs::read(cache.join("new.txt")).unwrap().len(), 0);
        assert_eq!(fs::read(cache.join("kept.txt")).unwrap(), b"real content");
        assert!(!cache.join("gone").exists());
        assert!(ledger.is_empty());
    }
}
