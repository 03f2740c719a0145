//! Patching a view tree from fresh directory listings.

use std::collections::HashMap;

use driftfile_core::{DirLister, DirRef, FsError, Level, SortOrder, TreeNode, ViewTree};

/// Counts of what a reconcile changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub added: usize,
    pub removed: usize,
    pub kept: usize,
}

impl ReconcileStats {
    /// True when the tree structure did not change.
    pub fn is_unchanged(&self) -> bool {
        self.added == 0 && self.removed == 0
    }

    fn absorb(&mut self, other: ReconcileStats) {
        self.added += other.added;
        self.removed += other.removed;
        self.kept += other.kept;
    }
}

/// Re-lists directories and patches the tree in place.
///
/// Surviving nodes keep their id, expansion and cached children; only their
/// entry (kind and stat) is refreshed. Expanded descendants are reconciled
/// recursively. Running it twice without filesystem changes changes nothing.
#[derive(Debug)]
pub struct TreeReconciler<'a, L: DirLister + ?Sized> {
    lister: &'a L,
}

impl<'a, L: DirLister + ?Sized> TreeReconciler<'a, L> {
    pub fn new(lister: &'a L) -> Self {
        Self { lister }
    }

    /// Reconcile `dir` and keep the cursor on the same node where possible.
    pub fn refresh(&self, tree: &mut ViewTree, dir: DirRef) -> Result<ReconcileStats, FsError> {
        let focused = tree.current().map(|n| n.id);
        let cursor = tree.cursor();
        let order = tree.order();
        let show_hidden = tree.show_hidden();

        let Some(level) = tree.level_mut(dir) else {
            return Ok(ReconcileStats::default());
        };
        let stats = self.reconcile_level(level, order, show_hidden)?;

        match focused {
            Some(id) if tree.focus(id) => {}
            _ => tree.set_cursor(cursor),
        }
        Ok(stats)
    }

    fn reconcile_level(
        &self,
        level: Level<'_>,
        order: SortOrder,
        show_hidden: bool,
    ) -> Result<ReconcileStats, FsError> {
        let Level {
            path,
            depth,
            children,
            ids,
        } = level;

        let mut entries = self.lister.list(&path)?;
        if !show_hidden {
            entries.retain(|e| !e.is_hidden());
        }

        let mut stats = ReconcileStats::default();
        let mut previous: HashMap<_, TreeNode> = children
            .drain(..)
            .map(|node| (node.entry.name.clone(), node))
            .collect();

        let mut next = Vec::with_capacity(entries.len());
        for entry in entries {
            match previous.remove(&entry.name) {
                Some(mut node) => {
                    if !entry.kind.is_expandable() {
                        node.expanded = false;
                        node.children.clear();
                    }
                    node.entry = entry;
                    node.depth = depth;
                    stats.kept += 1;
                    next.push(node);
                }
                None => {
                    next.push(TreeNode::new(ids.next_id(), entry, depth));
                    stats.added += 1;
                }
            }
        }
        stats.removed = previous.len();
        next.sort_by(|a, b| order.compare(&a.entry, &b.entry));

        for node in next.iter_mut().filter(|n| n.expanded) {
            let child_level = Level {
                path: node.entry.path.clone(),
                depth: depth + 1,
                children: &mut node.children,
                ids: &mut *ids,
            };
            match self.reconcile_level(child_level, order, show_hidden) {
                Ok(child) => stats.absorb(child),
                Err(e) => {
                    tracing::warn!(dir = %node.entry.path.display(), error = %e, "could not refresh expanded directory");
                    node.expanded = false;
                }
            }
        }

        *children = next;
        Ok(stats)
    }
}
