//! Bookmarks: single-character marks for directories.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use driftfile_core::FsError;

/// Mark character to absolute path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkTable {
    marks: BTreeMap<char, PathBuf>,
}

impl BookmarkTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, mark: char) -> Option<&Path> {
        self.marks.get(&mark).map(PathBuf::as_path)
    }

    /// Set a mark, returning the path it pointed to before.
    pub fn set(&mut self, mark: char, path: impl Into<PathBuf>) -> Option<PathBuf> {
        self.marks.insert(mark, path.into())
    }

    pub fn remove(&mut self, mark: char) -> Option<PathBuf> {
        self.marks.remove(&mark)
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, &Path)> {
        self.marks.iter().map(|(m, p)| (*m, p.as_path()))
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Read a `mark:path` line file. A missing file is an empty table;
    /// malformed lines are skipped.
    pub fn load(path: &Path) -> Result<Self, FsError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(FsError::io(path, e)),
        };

        let mut table = Self::new();
        for line in text.lines() {
            let mut chars = line.chars();
            match (chars.next(), chars.next()) {
                (Some(mark), Some(':')) if !chars.as_str().is_empty() => {
                    table.set(mark, chars.as_str());
                }
                _ if line.trim().is_empty() => {}
                _ => tracing::debug!(line, "skipping malformed bookmark line"),
            }
        }
        Ok(table)
    }

    /// Rewrite the whole file.
    pub fn save(&self, path: &Path) -> Result<(), FsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| FsError::io(parent, e))?;
        }
        let text: String = self
            .marks
            .iter()
            .map(|(mark, target)| format!("{mark}:{}\n", target.display()))
            .collect();
        fs::write(path, text).map_err(|e| FsError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_iter() {
        let mut table = BookmarkTable::new();
        assert!(table.set('b', "/b").is_none());
        table.set('a', "/a");
        assert_eq!(table.set('a', "/a2"), Some(PathBuf::from("/a")));
        assert_eq!(table.get('a'), Some(Path::new("/a2")));
        let marks: Vec<_> = table.iter().map(|(m, _)| m).collect();
        assert_eq!(marks, vec!['a', 'b']);
    }

    #[test]
    fn test_load_save() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file = tmp.path().join("sub/bookmarks");
        assert!(BookmarkTable::load(&file).unwrap().is_empty());

        let mut table = BookmarkTable::new();
        table.set('a', "/home/u/dir");
        table.set('z', "/with:colon");
        table.save(&file).unwrap();

        let loaded = BookmarkTable::load(&file).unwrap();
        assert_eq!(loaded, table);

        fs::write(&file, "a:/x\n\nbroken\nq:\n").unwrap();
        let loaded = BookmarkTable::load(&file).unwrap();
        assert_eq!(loaded.len(), 1);
    }
}
