//! Destination name conflicts.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::OpsError;

/// Pick a free destination for `name` inside `dir`.
///
/// Returns `dir/name` when it is free, otherwise the first free
/// "name (1).ext", "name (2).ext", ... A path is taken when `taken` says so
/// or when an earlier leg of the same batch already claimed it.
pub fn resolve_target(
    dir: &Path,
    name: &str,
    reserved: &mut HashSet<PathBuf>,
    taken: impl Fn(&Path) -> bool,
) -> PathBuf {
    let candidate = dir.join(name);
    let target = if taken(&candidate) || reserved.contains(&candidate) {
        auto_rename_path(&candidate, |p| taken(p) || reserved.contains(p))
    } else {
        candidate
    };
    reserved.insert(target.clone());
    target
}

/// Generate an auto-renamed path to avoid conflicts.
///
/// For "file.txt", tries "file (1).txt", "file (2).txt", etc.
pub fn auto_rename_path(path: &Path, taken: impl Fn(&Path) -> bool) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new(""));
    let (stem, extension) = split_name(path);

    for i in 1..1000 {
        let new_name = match extension {
            Some(ext) => format!("{stem} ({i}).{ext}"),
            None => format!("{stem} ({i})"),
        };

        let new_path = parent.join(&new_name);
        if !taken(&new_path) {
            return new_path;
        }
    }

    // Fallback: use timestamp
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let new_name = match extension {
        Some(ext) => format!("{stem}_{timestamp}.{ext}"),
        None => format!("{stem}_{timestamp}"),
    };

    parent.join(&new_name)
}

/// Check that `name` can be used as a single file name.
pub fn validate_name(name: &str) -> Result<(), OpsError> {
    let reason = if name.is_empty() {
        "Name cannot be empty"
    } else if name == "." || name == ".." {
        "Name is reserved"
    } else if name.len() > 255 {
        "Name is too long (max 255 bytes)"
    } else if name.contains('/') {
        "Name cannot contain '/'"
    } else if name.contains('\0') {
        "Name cannot contain NUL"
    } else {
        return Ok(());
    };
    Err(OpsError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}

// Dot-files have no extension: ".bashrc" renames to ".bashrc (1)".
fn split_name(path: &Path) -> (String, Option<&str>) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or(name);
            (stem, Some(ext))
        }
        None => (name, None),
    }
}
