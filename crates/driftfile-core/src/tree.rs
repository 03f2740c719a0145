//! Per-view directory tree.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::node::{NodeId, TreeNode};
use crate::sort::SortOrder;

/// Allocates node ids for one tree.
///
/// Trees that take turns in the same view hand the counter on with
/// [`ViewTree::continue_ids`], so one view never sees an id twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdGen {
    next: u64,
}

impl IdGen {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Hand out the next id.
    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// Skip past every id `other` has handed out.
    pub fn advance_past(&mut self, other: &IdGen) {
        self.next = self.next.max(other.next);
    }
}

impl Default for IdGen {
    fn default() -> Self {
        Self::new()
    }
}

/// A directory whose children can be reconciled: the tree root itself or an
/// expandable node inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirRef {
    Root,
    Node(NodeId),
}

/// Mutable access to one level of the tree.
#[derive(Debug)]
pub struct Level<'a> {
    /// Directory whose children these are.
    pub path: PathBuf,
    /// Depth assigned to the children.
    pub depth: u32,
    /// The children themselves, in sort order.
    pub children: &'a mut Vec<TreeNode>,
    /// Id allocator for newly inserted nodes.
    pub ids: &'a mut IdGen,
}

/// The tree shown in one view: the nodes under a root directory plus cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewTree {
    root: PathBuf,
    nodes: Vec<TreeNode>,
    cursor: usize,
    ids: IdGen,
    order: SortOrder,
    show_hidden: bool,
}

impl ViewTree {
    /// Create an empty tree rooted at `root`. Populate it with a reconcile.
    pub fn new(root: impl Into<PathBuf>, order: SortOrder, show_hidden: bool) -> Self {
        Self {
            root: root.into(),
            nodes: Vec::new(),
            cursor: 0,
            ids: IdGen::new(),
            order,
            show_hidden,
        }
    }

    /// Root directory of the view.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Root-level nodes.
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    pub fn set_order(&mut self, order: SortOrder) {
        self.order = order;
    }

    pub fn show_hidden(&self) -> bool {
        self.show_hidden
    }

    pub fn set_show_hidden(&mut self, show: bool) {
        self.show_hidden = show;
    }

    /// Allocate ids after every id `previous` has allocated.
    pub fn continue_ids(&mut self, previous: &ViewTree) {
        self.ids.advance_past(&previous.ids);
    }

    /// Nodes in display order: every root-level node, then the children of
    /// expanded directories directly below their parent.
    pub fn visible(&self) -> Vec<&TreeNode> {
        fn push<'a>(node: &'a TreeNode, out: &mut Vec<&'a TreeNode>) {
            out.push(node);
            if node.expanded {
                for child in &node.children {
                    push(child, out);
                }
            }
        }

        let mut out = Vec::new();
        for node in &self.nodes {
            push(node, &mut out);
        }
        out
    }

    /// Every node, including cached children of collapsed directories.
    pub fn all_nodes(&self) -> Vec<&TreeNode> {
        let mut out = Vec::new();
        for node in &self.nodes {
            node.walk(&mut out);
        }
        out
    }

    /// Find a node by id.
    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.iter().find_map(|n| n.find(id))
    }

    /// Find a node by id, mutably.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.nodes.iter_mut().find_map(|n| n.find_mut(id))
    }

    /// Check whether a node id is still part of the tree.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Find the node for an absolute path.
    pub fn find_path(&self, path: &Path) -> Option<&TreeNode> {
        if !path.starts_with(&self.root) {
            return None;
        }
        self.all_nodes().into_iter().find(|n| n.path() == path)
    }

    /// Resolve a directory path to something a reconcile can target.
    pub fn dir_ref(&self, path: &Path) -> Option<DirRef> {
        if path == self.root {
            return Some(DirRef::Root);
        }
        self.find_path(path)
            .filter(|n| n.is_dir())
            .map(|n| DirRef::Node(n.id))
    }

    /// Mutable access to the children of `dir`.
    pub fn level_mut(&mut self, dir: DirRef) -> Option<Level<'_>> {
        let ids = &mut self.ids;
        match dir {
            DirRef::Root => Some(Level {
                path: self.root.clone(),
                depth: 0,
                children: &mut self.nodes,
                ids,
            }),
            DirRef::Node(id) => {
                let node = self.nodes.iter_mut().find_map(|n| n.find_mut(id))?;
                if !node.is_dir() {
                    return None;
                }
                Some(Level {
                    path: node.entry.path.clone(),
                    depth: node.depth + 1,
                    children: &mut node.children,
                    ids,
                })
            }
        }
    }

    /// Set the expansion flag of a directory node. Returns false if the node
    /// is missing or not a directory.
    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) -> bool {
        match self.node_mut(id) {
            Some(node) if node.is_dir() => {
                node.expanded = expanded;
                self.clamp_cursor();
                true
            }
            _ => false,
        }
    }

    /// Cursor position (index into [`ViewTree::visible`]).
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Node under the cursor.
    pub fn current(&self) -> Option<&TreeNode> {
        self.visible().get(self.cursor).copied()
    }

    /// Move the cursor to `index`, clamped to the visible range.
    pub fn set_cursor(&mut self, index: usize) {
        self.cursor = index;
        self.clamp_cursor();
    }

    /// Move the cursor by `delta` lines.
    pub fn move_cursor(&mut self, delta: isize) {
        let target = self.cursor.saturating_add_signed(delta);
        self.set_cursor(target);
    }

    /// Put the cursor on the node with `id` if it is visible.
    pub fn focus(&mut self, id: NodeId) -> bool {
        match self.visible().iter().position(|n| n.id == id) {
            Some(index) => {
                self.cursor = index;
                true
            }
            None => false,
        }
    }

    /// Visible index of the next node at the cursor's depth under the same
    /// parent.
    pub fn next_sibling(&self) -> Option<usize> {
        let visible = self.visible();
        let depth = visible.get(self.cursor)?.depth;
        visible
            .iter()
            .enumerate()
            .skip(self.cursor + 1)
            .take_while(|(_, n)| n.depth >= depth)
            .find(|(_, n)| n.depth == depth)
            .map(|(i, _)| i)
    }

    /// Visible index of the previous sibling, or of the parent when the
    /// cursor is on a first child.
    pub fn prev_sibling(&self) -> Option<usize> {
        let visible = self.visible();
        let depth = visible.get(self.cursor)?.depth;
        visible[..self.cursor].iter().rposition(|n| n.depth <= depth)
    }

    /// Real directories directly below `id`. Links to directories are left
    /// out so recursive walks cannot loop.
    pub fn child_dirs(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .map(|node| {
                node.children
                    .iter()
                    .filter(|c| c.kind().is_dir())
                    .map(|c| c.id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Collapse `id` and every directory below it.
    pub fn collapse_all(&mut self, id: NodeId) -> bool {
        fn collapse(node: &mut TreeNode) {
            node.expanded = false;
            for child in &mut node.children {
                collapse(child);
            }
        }

        match self.node_mut(id) {
            Some(node) if node.is_dir() => {
                collapse(node);
                self.clamp_cursor();
                true
            }
            _ => false,
        }
    }

    /// Keep the cursor inside the visible range.
    pub fn clamp_cursor(&mut self) {
        let len = self.visible().len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Entry, NodeKind};

    fn sample() -> ViewTree {
        let mut tree = ViewTree::new("/r", SortOrder::default(), false);
        let mut level = tree.level_mut(DirRef::Root).unwrap();
        let dir_id = level.ids.next_id();
        let mut dir = TreeNode::new(dir_id, Entry::new("/r/dir", NodeKind::Directory, None), 0);
        let child_id = level.ids.next_id();
        dir.children.push(TreeNode::new(
            child_id,
            Entry::new("/r/dir/a", NodeKind::File { executable: false }, None),
            1,
        ));
        level.children.push(dir);
        let other = level.ids.next_id();
        level
            .children
            .push(TreeNode::new(other, Entry::new("/r/dir2", NodeKind::Directory, None), 0));
        tree
    }

    fn dir_id(tree: &ViewTree) -> NodeId {
        tree.nodes()[0].id
    }

    #[test]
    fn test_visible_respects_expansion() {
        let mut tree = sample();
        assert_eq!(tree.visible().len(), 2);

        assert!(tree.set_expanded(dir_id(&tree), true));
        let names: Vec<_> = tree.visible().iter().map(|n| n.name().to_string()).collect();
        assert_eq!(names, vec!["dir", "a", "dir2"]);
        assert_eq!(tree.all_nodes().len(), 3);
    }

    #[test]
    fn test_cursor_clamps_on_collapse() {
        let mut tree = sample();
        let dir = dir_id(&tree);
        tree.set_expanded(dir, true);
        tree.set_cursor(10);
        assert_eq!(tree.cursor(), 2);

        tree.set_expanded(dir, false);
        assert_eq!(tree.cursor(), 1);
        assert_eq!(tree.current().map(|n| n.name()), Some("dir2"));
    }

    #[test]
    fn test_sibling_navigation() {
        let mut tree = sample();
        tree.set_expanded(dir_id(&tree), true);

        assert_eq!(tree.next_sibling(), Some(2));
        assert_eq!(tree.prev_sibling(), None);

        tree.set_cursor(1);
        assert_eq!(tree.next_sibling(), None);
        assert_eq!(tree.prev_sibling(), Some(0));

        tree.set_cursor(2);
        assert_eq!(tree.prev_sibling(), Some(0));
    }

    #[test]
    fn test_collapse_all_and_child_dirs() {
        let mut tree = sample();
        let dir = dir_id(&tree);
        assert!(tree.child_dirs(dir).is_empty());

        tree.set_expanded(dir, true);
        tree.set_cursor(2);
        assert!(tree.collapse_all(dir));
        assert_eq!(tree.visible().len(), 2);
        assert_eq!(tree.cursor(), 1);
    }

    #[test]
    fn test_ids_continue_across_trees() {
        let first = sample();
        let mut second = ViewTree::new("/r/dir", SortOrder::default(), false);
        second.continue_ids(&first);
        let mut level = second.level_mut(DirRef::Root).unwrap();
        let fresh = level.ids.next_id();
        assert!(first.all_nodes().iter().all(|n| n.id < fresh));

        let mut alone = ViewTree::new("/other", SortOrder::default(), false);
        let mut level = alone.level_mut(DirRef::Root).unwrap();
        assert_eq!(level.ids.next_id(), NodeId(1));
    }

    #[test]
    fn test_dir_ref_lookup() {
        let tree = sample();
        assert_eq!(tree.dir_ref(Path::new("/r")), Some(DirRef::Root));
        assert_eq!(
            tree.dir_ref(Path::new("/r/dir")),
            Some(DirRef::Node(dir_id(&tree)))
        );
        assert_eq!(tree.dir_ref(Path::new("/r/dir/a")), None);
        assert_eq!(tree.dir_ref(Path::new("/elsewhere")), None);
    }
}
