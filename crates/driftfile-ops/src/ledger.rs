//! Freshness bookkeeping for remote cache mirrors.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Cache paths whose content is a full copy of the store.
///
/// Placeholders created from a remote listing are never marked. A path is
/// fresh when it or one of its ancestors is marked.
#[derive(Debug, Clone, Default)]
pub struct CacheLedger {
    fresh: BTreeSet<PathBuf>,
}

/// Ledger update applied when a step succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEffect {
    /// The path now mirrors the store.
    MarkFresh(PathBuf),
    /// The path and everything below it no longer exist in the cache.
    Forget(PathBuf),
    /// Content at `from` was copied or moved to `to`; freshness follows it.
    Mirror {
        from: PathBuf,
        to: PathBuf,
        keep_source: bool,
    },
}

impl CacheLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fresh(&self, path: &Path) -> bool {
        path.ancestors().any(|p| self.fresh.contains(p))
    }

    pub fn mark_fresh(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        // Marks below the new one are now redundant.
        self.forget_below(&path);
        self.fresh.insert(path);
    }

    /// Drop the marks on `path` and below it. A mark on an ancestor still
    /// covers `path`.
    pub fn forget(&mut self, path: &Path) {
        self.forget_below(path);
    }

    /// Carry freshness from `from` to `to`.
    pub fn mirror(&mut self, from: &Path, to: &Path, keep_source: bool) {
        let fresh_root = self.is_fresh(from);
        let moved: Vec<PathBuf> = self
            .fresh
            .iter()
            .filter(|p| p.starts_with(from))
            .filter_map(|p| p.strip_prefix(from).ok().map(|rel| to.join(rel)))
            .collect();

        if !keep_source {
            self.forget(from);
        }
        self.forget(to);
        if fresh_root {
            self.fresh.insert(to.to_path_buf());
        } else {
            self.fresh.extend(moved);
        }
    }

    pub fn apply(&mut self, effect: &CacheEffect) {
        match effect {
            CacheEffect::MarkFresh(path) => self.mark_fresh(path.clone()),
            CacheEffect::Forget(path) => self.forget(path),
            CacheEffect::Mirror {
                from,
                to,
                keep_source,
            } => self.mirror(from, to, *keep_source),
        }
    }

    /// Number of marked roots.
    pub fn len(&self) -> usize {
        self.fresh.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fresh.is_empty()
    }

    fn forget_below(&mut self, path: &Path) {
        self.fresh.retain(|p| !p.starts_with(path));
    }
}
